//! Session state machine, board mirror and the queue that drives them.

mod board;
mod controller;
mod runner;
mod state;

pub use board::*;
pub use controller::*;
pub use runner::*;
pub use state::*;
