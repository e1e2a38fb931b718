//! # roomplay common library
//!
//! Shared code for the roomplay workspace:
//! - Room and track models
//! - Event types (RoomEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{RoomId, Track};
