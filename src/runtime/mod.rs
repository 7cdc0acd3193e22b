//! Session runtime and communication
//!
//! This module provides the infrastructure for running sessions:
//! - `SessionOrchestrator` - Admits, starts, resumes and tracks session runs
//! - `EventBroadcaster` - Fans progress events out to session observers
//! - Channel types for observer and transport communication
//! - `serve_stream` - Bridges a duplex text stream to one session
//!
//! Each run is a separate tokio task. Observers attach through the
//! broadcaster and receive events from the moment they subscribe.

pub mod broadcaster;
pub mod channels;
pub mod orchestrator;
pub mod transport;

pub use broadcaster::{EventBroadcaster, ObserverId, Subscription, DEFAULT_SEND_TIMEOUT};
pub use channels::{EventReceiver, EventSender, IncomingReceiver, IncomingSender};
pub use orchestrator::SessionOrchestrator;
pub use transport::{encode_event, serve_stream, IncomingFrame};
