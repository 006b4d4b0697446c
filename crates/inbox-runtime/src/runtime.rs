//! # Inbox Runtime
//!
//! Wires the pipeline together and feeds it from a line-oriented input.
//!
//! ## Input Format
//!
//! One JSON object per line, tagged by `type`:
//!
//! | `type` | Payload | Effect |
//! |--------|---------|--------|
//! | `message` | `IncomingGroupMessage` fields | enqueue |
//! | `group_state` | `GroupState` fields | publish as the service's view |
//! | `block_sender` | `sender` | add to block list |
//! | `block_group` | `group_id` | add to block list |
//! | `background` | `enabled` | foreground/background switch |
//! | `suspend` | `suspended` | pause/resume processing |
//! | `wake` | - | manual wake signal |

use crate::adapters::{LocalGroupStateOracle, LoggingSink};
use crate::config::InboxConfig;
use anyhow::{Context, Result};
use gi_01_job_store::{InMemoryKVStore, JobStore, KvJobStore};
use gi_02_discard_filter::InMemoryBlockList;
use gi_03_group_processor::{
    BincodeContextDecoder, ProcessorDeps, QueueSupervisor, SharedEnvironment,
};
use serde::Deserialize;
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, InboxEvent, WakeSignal};
use shared_types::{GroupId, GroupState, IncomingGroupMessage, ServiceId};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// One input line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputLine {
    Message(IncomingGroupMessage),
    GroupState(GroupState),
    BlockSender { sender: ServiceId },
    BlockGroup { group_id: GroupId },
    Background { enabled: bool },
    Suspend { suspended: bool },
    Wake,
}

/// The running pipeline.
pub struct InboxRuntime {
    config: InboxConfig,
    supervisor: QueueSupervisor,
    bus: Arc<InMemoryEventBus>,
    environment: Arc<SharedEnvironment>,
    oracle: Arc<LocalGroupStateOracle>,
    block_list: Arc<InMemoryBlockList>,
    sink: Arc<LoggingSink>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl InboxRuntime {
    /// Build every component. The local account starts registered.
    pub fn new(config: InboxConfig) -> Result<Self> {
        info!("Creating group inbox runtime");

        let bus = Arc::new(InMemoryEventBus::with_capacity(
            config.processor.bus_capacity,
        ));
        let environment = Arc::new(
            SharedEnvironment::registered(config.local_service_id).with_bus(Arc::clone(&bus)),
        );
        let oracle = Arc::new(LocalGroupStateOracle::new());
        let block_list = Arc::new(InMemoryBlockList::new());
        let sink = Arc::new(LoggingSink::new());
        let store = open_store(&config)?;

        let deps = ProcessorDeps {
            store,
            oracle: oracle.clone(),
            sink: sink.clone(),
            environment: environment.clone(),
            decoder: Arc::new(BincodeContextDecoder),
            block_list: block_list.clone(),
            bus: Arc::clone(&bus),
        };
        let supervisor = QueueSupervisor::new(config.processor.clone(), deps)
            .context("Failed to create queue supervisor")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            supervisor,
            bus,
            environment,
            oracle,
            block_list,
            sink,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start listeners and pick up jobs left from a previous run.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Group Inbox Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(local = %self.config.local_service_id, "Local account");
        info!(data_dir = ?self.config.data_dir, "Job store");

        self.supervisor
            .spawn_signal_listener(self.bus.subscribe(EventFilter::wake()));
        self.spawn_notification_logger();

        let recovered = self.supervisor.total_pending_job_count().await?;
        let started = self.supervisor.drain_all().await?;
        info!(recovered, started, "Runtime started");
        Ok(())
    }

    fn spawn_notification_logger(&self) {
        let mut events = self
            .bus
            .event_stream(EventFilter::topics(vec![EventTopic::Queue]));
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.next() => match event {
                        Some(InboxEvent::QueueFlushed) => info!("[inbox] Queue flushed"),
                        Some(InboxEvent::WorkerFinished { group_id }) => {
                            debug!(group = %group_id, "[inbox] Worker finished");
                        }
                        Some(InboxEvent::JobEnqueued { group_id, job_id }) => {
                            debug!(group = %group_id, job_id, "[inbox] Job enqueued");
                        }
                        Some(InboxEvent::Wake(_)) => {}
                        None => break,
                    },
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    /// Apply one input line. Blank lines are ignored.
    pub async fn handle_line(&self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let input: InputLine = serde_json::from_str(line).context("Malformed input line")?;
        match input {
            InputLine::Message(message) => {
                self.supervisor.enqueue(message).await?;
            }
            InputLine::GroupState(state) => self.oracle.publish(state),
            InputLine::BlockSender { sender } => self.block_list.block_sender(sender),
            InputLine::BlockGroup { group_id } => self.block_list.block_group(group_id),
            InputLine::Background { enabled } => self.environment.set_background(enabled),
            InputLine::Suspend { suspended } => self.environment.set_suspended(suspended),
            InputLine::Wake => {
                self.bus.emit(InboxEvent::Wake(WakeSignal::Manual));
            }
        }
        Ok(())
    }

    /// Consume `reader` until EOF. Bad lines are logged and skipped.
    pub async fn run_input<R>(&self, reader: R) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut count = 0u64;
        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            count += 1;
            if let Err(e) = self.handle_line(&line).await {
                warn!(line = count, error = %e, "Skipping input line");
            }
        }
        Ok(count)
    }

    /// Wait for the queue to go idle (bounded), then stop everything.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        let flush = Duration::from_millis(self.config.flush_timeout_ms);
        if tokio::time::timeout(flush, self.supervisor.wait_for_idle())
            .await
            .is_err()
        {
            warn!(timeout_ms = self.config.flush_timeout_ms, "Queue still busy at shutdown");
        }
        match self.supervisor.total_pending_job_count().await {
            Ok(0) => info!("All jobs handled"),
            Ok(left) => info!(left, "Jobs left for the next run"),
            Err(e) => warn!(error = %e, "Could not count remaining jobs"),
        }

        self.supervisor.shutdown();
        self.shutdown_tx.send_replace(true);
        let stats = self.bus.stats();
        info!(
            delivered = self.sink.delivered(),
            wakes = stats.wakes,
            queue_events = stats.queue_events,
            "Shutdown complete"
        );
    }

    pub fn supervisor(&self) -> &QueueSupervisor {
        &self.supervisor
    }

    pub fn sink(&self) -> &LoggingSink {
        &self.sink
    }
}

fn open_store(config: &InboxConfig) -> Result<Arc<dyn JobStore>> {
    match &config.data_dir {
        #[cfg(feature = "rocksdb")]
        Some(dir) => {
            use gi_01_job_store::{RocksDbConfig, RocksDbStore};
            let kv = RocksDbStore::open(RocksDbConfig {
                path: dir.to_string_lossy().into_owned(),
                ..RocksDbConfig::default()
            })
            .with_context(|| format!("Failed to open job store at {}", dir.display()))?;
            Ok(Arc::new(KvJobStore::open(kv)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        Some(dir) => {
            warn!(
                data_dir = %dir.display(),
                "Built without the rocksdb feature, jobs stay in memory"
            );
            Ok(Arc::new(KvJobStore::open(InMemoryKVStore::new())?))
        }
        None => Ok(Arc::new(KvJobStore::open(InMemoryKVStore::new())?)),
    }
}
