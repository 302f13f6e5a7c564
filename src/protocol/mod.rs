//! Line protocol spoken with the gomoku engine over its standard streams.

mod codec;
mod command;
mod event;
mod types;

pub use codec::*;
pub use command::*;
pub use event::*;
pub use types::*;
