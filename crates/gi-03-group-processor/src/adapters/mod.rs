//! # Adapters
//!
//! In-process implementations of the processor's outbound ports.

pub mod decoder;
pub mod environment;

pub use decoder::BincodeContextDecoder;
pub use environment::SharedEnvironment;
