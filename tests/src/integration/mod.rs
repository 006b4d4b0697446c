//! # Integration Tests
//!
//! Properties of the whole pipeline, one file per concern.

mod backoff;
mod concurrency;
mod discard;
mod failures;
mod ordering;
mod restart;
