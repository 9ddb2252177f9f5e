//! Application lifecycle helpers used by the binary.

pub mod shutdown;

pub use shutdown::shutdown_gracefully;
