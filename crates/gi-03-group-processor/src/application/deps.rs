//! Constructor-injected collaborators.

use crate::ports::{GroupContextDecoder, GroupStateOracle, MessageSink, ProcessingEnvironment};
use gi_01_job_store::JobStore;
use gi_02_discard_filter::BlockList;
use shared_bus::InMemoryEventBus;
use std::sync::Arc;

/// Everything the supervisor and its workers talk to.
#[derive(Clone)]
pub struct ProcessorDeps {
    pub store: Arc<dyn JobStore>,
    pub oracle: Arc<dyn GroupStateOracle>,
    pub sink: Arc<dyn MessageSink>,
    pub environment: Arc<dyn ProcessingEnvironment>,
    pub decoder: Arc<dyn GroupContextDecoder>,
    pub block_list: Arc<dyn BlockList>,
    /// Wake signals in, queue notifications out.
    pub bus: Arc<InMemoryEventBus>,
}
