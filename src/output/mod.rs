//! Consumers of a drained run: on-screen display and re-encoding to a file.

pub mod display;
pub mod encode;
