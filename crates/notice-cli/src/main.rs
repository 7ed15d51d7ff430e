//! `notice` — run a single Event Producer or Push Dispatcher tick against
//! the filesystem/in-memory reference collaborators. Not a long-running
//! service (wiring real managed-storage/pub-sub clients is out of scope);
//! this exists for local testing and operational scripts.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use notice_blob::FsBlobStore;
use notice_dispatcher::{process_event, DispatchQueues, SubscriberFinder};
use notice_producer::{InMemoryEvaluator, ProducerDeps};
use notice_queue::ChannelBroker;
use notice_store::FileEventStore;
use notice_types::{
    EmailDeliveryJob, FeatureCatalog, Frequency, MovedSplitRegistry, NotificationQueueMessage,
    Reporter, SavedSearch, Subscription, WebhookDeliveryJob,
};

#[derive(Parser, Debug)]
#[command(name = "notice", version)]
#[command(about = "Run one producer or dispatcher tick for the saved-search notification pipeline")]
struct Cli {
    /// Directory holding worker-lock and event-row state.
    #[arg(long, global = true, default_value = ".notice/state")]
    state_dir: PathBuf,

    /// Directory holding content-addressed state/diff blobs.
    #[arg(long, global = true, default_value = ".notice/blobs")]
    blob_dir: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate one saved search against a catalog snapshot and publish
    /// a notification event if anything changed.
    Produce {
        /// Path to a JSON `FeatureCatalog` (feature_key -> FeatureRecord).
        #[arg(long)]
        catalog: PathBuf,
        /// Path to a JSON `SavedSearch`.
        #[arg(long)]
        search: PathBuf,
        /// Path to a JSON moved/split registry (`{"moved": {...}, "split": {...}}`).
        /// Omit for an empty registry.
        #[arg(long)]
        registry: Option<PathBuf>,
        /// User-facing notification cadence.
        #[arg(long, value_enum)]
        frequency: CliFrequency,
        /// Identifier for this worker, used for lock ownership.
        #[arg(long, default_value = "notice-cli")]
        worker_id: String,
        /// Lock TTL in seconds; must exceed this run's wall-clock budget.
        #[arg(long, default_value_t = 300)]
        lock_ttl_secs: u64,
        /// Write the published `NotificationQueueMessage` JSON here if an
        /// event was produced (for piping straight into `dispatch`).
        #[arg(long)]
        notify_out: Option<PathBuf>,
    },
    /// Fan out delivery jobs for one notification event.
    Dispatch {
        /// Path to the JSON `NotificationQueueMessage` (as written by
        /// `produce --notify-out`, or received off the real queue).
        #[arg(long)]
        event: PathBuf,
        /// Path to a JSON array of `Subscription`.
        #[arg(long)]
        subscriptions: PathBuf,
        /// Write fanned-out email jobs (one JSON object per line) here.
        #[arg(long)]
        email_out: Option<PathBuf>,
        /// Write fanned-out webhook jobs (one JSON object per line) here.
        #[arg(long)]
        webhook_out: Option<PathBuf>,
    },
    /// Load and validate `.notice.toml` plus environment overrides,
    /// printing the effective configuration.
    Config {
        /// Directory to look for `.notice.toml` in.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFrequency {
    Immediate,
    Daily,
    Weekly,
    Monthly,
}

impl From<CliFrequency> for Frequency {
    fn from(value: CliFrequency) -> Self {
        match value {
            CliFrequency::Immediate => Frequency::Immediate,
            CliFrequency::Daily => Frequency::Daily,
            CliFrequency::Weekly => Frequency::Weekly,
            CliFrequency::Monthly => Frequency::Monthly,
        }
    }
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Produce {
            catalog,
            search,
            registry,
            frequency,
            worker_id,
            lock_ttl_secs,
            notify_out,
        } => run_produce(
            &cli.state_dir,
            &cli.blob_dir,
            &catalog,
            &search,
            registry.as_deref(),
            frequency.into(),
            &worker_id,
            lock_ttl_secs,
            notify_out.as_deref(),
        ),
        Commands::Dispatch {
            event,
            subscriptions,
            email_out,
            webhook_out,
        } => run_dispatch(&event, &subscriptions, email_out.as_deref(), webhook_out.as_deref()),
        Commands::Config { dir } => run_config(&dir),
    }
}

fn run_produce(
    state_dir: &std::path::Path,
    blob_dir: &std::path::Path,
    catalog_path: &std::path::Path,
    search_path: &std::path::Path,
    registry_path: Option<&std::path::Path>,
    frequency: Frequency,
    worker_id: &str,
    lock_ttl_secs: u64,
    notify_out: Option<&std::path::Path>,
) -> Result<()> {
    let catalog: FeatureCatalog = read_json(catalog_path)?;
    let search: SavedSearch = read_json(search_path)?;
    let registry = match registry_path {
        Some(path) => read_registry(path)?,
        None => MovedSplitRegistry::default(),
    };

    let store = FileEventStore::new(state_dir);
    let blobs = FsBlobStore::new(blob_dir);
    let queue: ChannelBroker<NotificationQueueMessage> = ChannelBroker::new();
    let evaluator = InMemoryEvaluator;
    let mut reporter = CliReporter;

    let deps = ProducerDeps {
        store: &store,
        blobs: &blobs,
        notification_queue: &queue,
        registry: &registry,
        evaluator: &evaluator,
    };

    let result = notice_producer::run(
        &deps,
        &catalog,
        &search,
        frequency,
        worker_id,
        chrono::Utc::now(),
        Duration::from_secs(lock_ttl_secs),
        &mut reporter,
    )
    .context("producer run failed")?;

    match result {
        None => println!("no changes; no event published"),
        Some(event_id) => {
            println!("published event {event_id}");
            if let Some(delivery) = queue.receive() {
                let out = serde_json::to_string_pretty(&delivery.envelope.payload)
                    .context("failed to serialize notification message")?;
                match notify_out {
                    Some(path) => {
                        std::fs::write(path, &out)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                    }
                    None => println!("{out}"),
                }
            }
        }
    }
    Ok(())
}

struct StaticSubscribers(Vec<Subscription>);

impl SubscriberFinder for StaticSubscribers {
    fn find_subscribers(
        &self,
        search_id: &str,
        frequency: Frequency,
    ) -> anyhow::Result<Vec<Subscription>> {
        Ok(self
            .0
            .iter()
            .filter(|s| s.saved_search_id == search_id && s.frequency == frequency)
            .cloned()
            .collect())
    }
}

fn run_dispatch(
    event_path: &std::path::Path,
    subscriptions_path: &std::path::Path,
    email_out: Option<&std::path::Path>,
    webhook_out: Option<&std::path::Path>,
) -> Result<()> {
    let message: NotificationQueueMessage = read_json(event_path)?;
    let subscriptions: Vec<Subscription> = read_json(subscriptions_path)?;

    // `NotificationQueueMessage` carries `snapshot_type`, not the
    // user-facing `frequency` subscriptions key on; every `Frequency`
    // other than `daily` maps 1:1 onto a `SnapshotType`, and a `daily`
    // subscriber shares the immediate snapshot stream (the aliasing
    // documented on `Frequency::snapshot_type`), so recovering
    // `immediate` here matches both kinds of subscriber.
    let metadata = notice_types::DeliveryMetadata {
        event_id: message.event_id.clone(),
        search_id: message.search_id.clone(),
        query: message.query.clone(),
        frequency: snapshot_type_to_frequency(message.snapshot_type),
        generated_at: message.generated_at,
    };

    let email: ChannelBroker<EmailDeliveryJob> = ChannelBroker::new();
    let webhook: ChannelBroker<WebhookDeliveryJob> = ChannelBroker::new();
    let queues = DispatchQueues {
        email: &email,
        webhook: &webhook,
    };
    let subscribers = StaticSubscribers(subscriptions);

    let summary_raw = serde_json::to_vec(&message.summary).context("failed to encode summary")?;
    let outcome = process_event(
        &metadata,
        &message.schema_version,
        &message.summary,
        &summary_raw,
        &subscribers,
        &queues,
    );

    write_jobs(&email, email_out)?;
    write_jobs(&webhook, webhook_out)?;

    match outcome {
        Ok(()) => {
            println!(
                "dispatched {} email job(s), {} webhook job(s)",
                email.len(),
                webhook.len()
            );
            Ok(())
        }
        Err(err) => {
            println!(
                "dispatch completed with errors after {} email job(s), {} webhook job(s): {err}",
                email.len(),
                webhook.len()
            );
            Err(err.into())
        }
    }
}

fn snapshot_type_to_frequency(snapshot_type: notice_types::SnapshotType) -> Frequency {
    match snapshot_type {
        notice_types::SnapshotType::Immediate => Frequency::Immediate,
        notice_types::SnapshotType::Weekly => Frequency::Weekly,
        notice_types::SnapshotType::Monthly => Frequency::Monthly,
    }
}

fn write_jobs<T: serde::Serialize + Clone>(
    broker: &ChannelBroker<T>,
    path: Option<&std::path::Path>,
) -> Result<()> {
    let Some(path) = path else {
        // Drain silently; the job counts are still reported by the caller.
        return Ok(());
    };
    let mut lines = Vec::new();
    while let Some(delivery) = broker.receive() {
        lines.push(serde_json::to_string(&delivery.envelope.payload)?);
    }
    std::fs::write(path, lines.join("\n")).with_context(|| format!("failed to write {}", path.display()))
}

fn run_config(dir: &std::path::Path) -> Result<()> {
    let config = notice_config::load_config(dir)?;
    config.validate().context("configuration is incomplete")?;
    println!("{}", toml::to_string_pretty(&config).context("failed to render configuration")?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load a moved/split registry from JSON, re-running the constructor's
/// invariant checks (self-mapping, chain length, moved/split overlap)
/// instead of trusting the file blindly — `MovedSplitRegistry`'s derived
/// `Deserialize` would otherwise accept an unvalidated registry.
fn read_registry(path: &std::path::Path) -> Result<MovedSplitRegistry> {
    #[derive(serde::Deserialize)]
    struct Raw {
        #[serde(default)]
        moved: BTreeMap<notice_types::FeatureKey, notice_types::FeatureKey>,
        #[serde(default)]
        split: BTreeMap<notice_types::FeatureKey, std::collections::BTreeSet<notice_types::FeatureKey>>,
    }
    let raw: Raw = read_json(path)?;
    MovedSplitRegistry::new(raw.moved, raw.split).context("invalid moved/split registry")
}
