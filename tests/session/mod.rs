//! Session controller and runner tests.

#[cfg(unix)]
mod end_to_end_test;
