//! Domain layer: the discard decision.

mod classify;

pub use classify::{classify, DiscardContext, DiscardMode};
