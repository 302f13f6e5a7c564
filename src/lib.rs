//! Gomoku bridge - process bridge and session controller for an external
//! gomoku engine speaking a line protocol over stdio.

pub mod config;
pub mod display;
pub mod engine;
pub mod protocol;
pub mod session;
pub mod stats;
