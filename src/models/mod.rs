//! Typed records shared by the store, HTTP and watchdog layers.

pub mod digest;
pub mod entry;
pub mod severity;
