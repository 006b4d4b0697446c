//! # Ports Layer
//!
//! - `inbound` - the processor API driven by the transport layer
//! - `outbound` - collaborators the processor drives (oracle, sink,
//!   environment, context decoder)

pub mod inbound;
pub mod outbound;

pub use inbound::GroupMessageProcessorApi;
pub use outbound::{
    Delivery, GroupContextDecoder, GroupStateOracle, MessageSink, MockGroupStateOracle,
    ProcessingEnvironment, RecordingSink,
};
