//! # Runtime Adapters
//!
//! Host-side implementations of the group processor's outbound ports.

pub mod oracle;
pub mod sink;

pub use oracle::LocalGroupStateOracle;
pub use sink::LoggingSink;
