//! Per-room pending track queue

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use roomplay_common::Track;

/// Ordered tracks waiting to be played in one room
///
/// Insertion order is playback order. No synchronization of its own: only
/// the scheduler loop mutates it.
#[derive(Debug, Clone, Default)]
pub struct RoomQueue {
    tracks: VecDeque<Track>,
}

impl RoomQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tracks at the tail, returning how many were appended
    pub fn append(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let before = self.tracks.len();
        self.tracks.extend(tracks);
        self.tracks.len() - before
    }

    /// Remove and return the head
    pub fn pop_front(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Remove everything, returning how many tracks were dropped
    pub fn clear(&mut self) -> usize {
        let removed = self.tracks.len();
        self.tracks.clear();
        removed
    }

    /// Uniformly permute the pending tracks
    ///
    /// Returns false (and leaves the queue untouched) when there are fewer
    /// than two tracks.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.tracks.len() <= 1 {
            return false;
        }
        self.tracks.make_contiguous().shuffle(rng);
        true
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Clone of the first `limit` tracks
    pub fn snapshot(&self, limit: usize) -> Vec<Track> {
        self.tracks.iter().take(limit).cloned().collect()
    }
}
