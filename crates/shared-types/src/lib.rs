//! # Shared Types Crate
//!
//! Domain entities shared by the job store, the discard filter and the
//! group processor.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: group ids, sender ids, revisions and the
//!   group state snapshot are defined once, here.
//! - **Opaque Plaintext**: the pipeline never re-decrypts; it only reads the
//!   group context framing (`GroupPlaintext`) to learn the asserted revision.
//! - **Read-Only State**: `GroupState` is owned by the group state oracle;
//!   every other crate treats it as a snapshot.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
