//! Core types for the session engine
//!
//! This module provides the fundamental types used throughout the crate:
//! - `SessionStatus` / `ExecutionMode` / `LoopPhase` - State of sessions and runs
//! - `ProgressEvent` - Events streamed to observers
//! - `EngineError` - Error types

pub mod error;
pub mod event;
pub mod state;

pub use error::{EngineError, EngineResult};
pub use event::ProgressEvent;
pub use state::{ExecutionMode, LoopPhase, SessionStatus};
