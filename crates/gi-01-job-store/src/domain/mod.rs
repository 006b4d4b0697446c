//! Domain layer: job records, key encoding and errors.

pub mod entities;
pub mod errors;
pub mod keys;
