//! Channel type definitions for session communication
//!
//! Two channel types connect a session to the outside world:
//! - **Observer channel** (mpsc): progress events from the broadcaster to one observer
//! - **Incoming channel** (mpsc): text frames from a stream transport to the engine

use tokio::sync::mpsc;

use crate::core::ProgressEvent;

/// Default buffer size for an observer channel
pub const OBSERVER_CHANNEL_SIZE: usize = 256;

/// Default buffer size for incoming transport frames
pub const INCOMING_CHANNEL_SIZE: usize = 32;

// ============================================================================
// Channel Type Aliases
// ============================================================================

/// Sender half of an observer channel (held by the broadcaster)
pub type EventSender = mpsc::Sender<ProgressEvent>;

/// Receiver half of an observer channel (held by the observer)
pub type EventReceiver = mpsc::Receiver<ProgressEvent>;

/// Sender half of the incoming frame channel (held by the transport)
pub type IncomingSender = mpsc::Sender<String>;

/// Receiver half of the incoming frame channel
pub type IncomingReceiver = mpsc::Receiver<String>;

// ============================================================================
// Channel Creation
// ============================================================================

/// Create a new observer channel pair
pub fn create_observer_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(OBSERVER_CHANNEL_SIZE)
}

/// Create a new incoming frame channel pair
pub fn create_incoming_channel() -> (IncomingSender, IncomingReceiver) {
    mpsc::channel(INCOMING_CHANNEL_SIZE)
}
