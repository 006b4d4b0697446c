//! Ports layer: the job store API and the storage SPI it depends on.

pub mod inbound;
pub mod outbound;
