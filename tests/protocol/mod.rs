//! Protocol codec tests.

mod codec_test;
