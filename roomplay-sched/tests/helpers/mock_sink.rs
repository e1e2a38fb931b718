//! Sinks driven by the test
//!
//! A bound track plays until the test calls [`MockSinkHost::finish`] (or
//! `fail_playback`), or the scheduler halts it. Binding while a track is
//! still bound is counted as a double bind. With `set_defer_halt`, a halt
//! is only recorded and the test reports it later with `report_halted`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roomplay_common::RoomId;
use roomplay_sched::resolver::StreamHandle;
use roomplay_sched::{OutputSink, PlaybackCompletion, PlaybackOutcome, SinkError, SinkHost};

/// What one room's sink has seen
#[derive(Default)]
pub struct SinkProbe {
    pub binds: Vec<String>,
    pub double_binds: usize,
    pub halts: usize,
    pub pauses: usize,
    pub resumes: usize,
    pub released: bool,
    pending: Option<PlaybackCompletion>,
}

#[derive(Default)]
pub struct MockSinkHost {
    probes: Mutex<HashMap<RoomId, Arc<Mutex<SinkProbe>>>>,
    fail_acquire: AtomicBool,
    fail_bind: Arc<AtomicBool>,
    fail_pause: Arc<AtomicBool>,
    defer_halt: Arc<AtomicBool>,
}

impl MockSinkHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_acquire(&self, fail: bool) {
        self.fail_acquire.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_bind(&self, fail: bool) {
        self.fail_bind.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_pause(&self, fail: bool) {
        self.fail_pause.store(fail, Ordering::SeqCst);
    }

    pub fn set_defer_halt(&self, defer: bool) {
        self.defer_halt.store(defer, Ordering::SeqCst);
    }

    fn probe(&self, room: RoomId) -> Arc<Mutex<SinkProbe>> {
        self.probes
            .lock()
            .unwrap()
            .get(&room)
            .cloned()
            .unwrap_or_else(|| panic!("no sink acquired for {}", room))
    }

    /// Run `f` against the room's probe
    pub fn inspect<T>(&self, room: RoomId, f: impl FnOnce(&SinkProbe) -> T) -> T {
        let probe = self.probe(room);
        let guard = probe.lock().unwrap();
        f(&guard)
    }

    pub fn binds(&self, room: RoomId) -> Vec<String> {
        self.inspect(room, |p| p.binds.clone())
    }

    pub fn is_bound(&self, room: RoomId) -> bool {
        self.inspect(room, |p| p.pending.is_some())
    }

    /// End the bound track naturally; false if nothing was bound
    pub fn finish(&self, room: RoomId) -> bool {
        self.complete(room, PlaybackOutcome::Finished)
    }

    /// Report a deferred halt
    pub fn report_halted(&self, room: RoomId) -> bool {
        self.complete(room, PlaybackOutcome::Halted)
    }

    /// Break off the bound track with an error
    pub fn fail_playback(&self, room: RoomId, cause: &str) -> bool {
        self.complete(room, PlaybackOutcome::Failed(cause.to_string()))
    }

    fn complete(&self, room: RoomId, outcome: PlaybackOutcome) -> bool {
        let pending = self.probe(room).lock().unwrap().pending.take();
        match pending {
            Some(completion) => {
                completion.complete(outcome);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SinkHost for MockSinkHost {
    async fn acquire(&self, room: RoomId) -> Result<Box<dyn OutputSink>, SinkError> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(SinkError::NotConnected(room));
        }
        let probe = Arc::new(Mutex::new(SinkProbe::default()));
        self.probes.lock().unwrap().insert(room, Arc::clone(&probe));
        Ok(Box::new(MockSink {
            probe,
            fail_bind: Arc::clone(&self.fail_bind),
            fail_pause: Arc::clone(&self.fail_pause),
            defer_halt: Arc::clone(&self.defer_halt),
        }))
    }
}

struct MockSink {
    probe: Arc<Mutex<SinkProbe>>,
    fail_bind: Arc<AtomicBool>,
    fail_pause: Arc<AtomicBool>,
    defer_halt: Arc<AtomicBool>,
}

impl OutputSink for MockSink {
    fn bind(&mut self, stream: StreamHandle, completion: PlaybackCompletion) -> Result<(), SinkError> {
        if self.fail_bind.load(Ordering::SeqCst) {
            drop(completion);
            return Err(SinkError::Disconnected("voice connection closed".to_string()));
        }
        let mut probe = self.probe.lock().unwrap();
        if probe.pending.is_some() {
            probe.double_binds += 1;
        }
        probe.binds.push(stream.track.title.clone());
        probe.pending = Some(completion);
        Ok(())
    }

    fn halt_output(&mut self) {
        let mut probe = self.probe.lock().unwrap();
        probe.halts += 1;
        if self.defer_halt.load(Ordering::SeqCst) {
            return;
        }
        if let Some(completion) = probe.pending.take() {
            completion.complete(PlaybackOutcome::Halted);
        }
    }

    fn pause_output(&mut self) -> Result<(), SinkError> {
        if self.fail_pause.load(Ordering::SeqCst) {
            return Err(SinkError::Disconnected("voice connection closed".to_string()));
        }
        self.probe.lock().unwrap().pauses += 1;
        Ok(())
    }

    fn resume_output(&mut self) -> Result<(), SinkError> {
        self.probe.lock().unwrap().resumes += 1;
        Ok(())
    }

    fn release(&mut self) {
        let mut probe = self.probe.lock().unwrap();
        probe.released = true;
        if let Some(completion) = probe.pending.take() {
            completion.complete(PlaybackOutcome::Halted);
        }
    }
}
