//! # Discard Filter (gi-02)
//!
//! Classifies a queued group message before delivery.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): the pure `classify` decision
//! - **Ports Layer** (`ports/`): `BlockList` (driven port)
//! - **Adapters Layer** (`adapters/`): `InMemoryBlockList`
//! - **Service Layer** (`service.rs`): `DiscardFilter`, `classify` with an
//!   injected block list
//!
//! ## Decision Table
//!
//! | Condition (first match wins) | Result |
//! |------------------------------|--------|
//! | sender or group blocked | `Discard` |
//! | membership not checked | `Admit` |
//! | local identity or group state unknown | `Discard` |
//! | local user not a full member | `Discard` |
//! | sender not a full member | `Discard` |
//! | announcements-only and sender not an administrator | `DiscardVisibleContent` |
//! | otherwise | `Admit` |
//!
//! Membership is only checked once the local group state is known to be
//! at the message's revision; the pre-check before reconciliation runs
//! with `check_membership = false`.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryBlockList;
pub use domain::{classify, DiscardContext, DiscardMode};
pub use ports::BlockList;
pub use service::DiscardFilter;
