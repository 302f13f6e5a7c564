//! Engine process tests. These drive real child processes through `/bin/sh`.

#[cfg(unix)]
mod supervisor_test;
