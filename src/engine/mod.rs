//! Engine process lifecycle and byte-level I/O.

mod process;
mod supervisor;

pub use process::*;
pub use supervisor::*;
