//! Terminal front end
//!
//! `Console` does colored terminal I/O; `SessionRenderer` drives one session
//! from the terminal through the orchestrator.

pub mod console;
pub mod renderer;

pub use console::Console;
pub use renderer::{RenderAction, SessionRenderer};
