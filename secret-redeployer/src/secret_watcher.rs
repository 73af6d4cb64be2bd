use futures::{Stream, StreamExt};
use redeployer_common::errors::RedeployerError;
use redeployer_common::redeployment::complete_redeployments;
use redeployer_common::traits::{Labeled, Named, Redeployable, Versioned};
use redeployer_common::watcher::{
    SecretEvent, SecretEventSource, WatchItem, SECRET_WATCH_START_VERSION,
};
use redeployer_macros::{logger, notify, with_dollar_sign};
use tokio::sync::mpsc::Sender;

use crate::redeployer::{RedeployReport, Redeployer};
use crate::seen_registry::{Classification, SeenRegistry};

logger!("SecretWatcher");

/// Messages sent by the watcher on its notification queue, when it has one.
#[derive(Debug)]
pub enum SecretWatcherProtocol {
    SecretIgnored(String),
    SecretRejected(String),
    SecretRegistered(String),
    RedeploymentTriggered {
        secret: String,
        targets: usize,
    },
    RedeploymentFinished {
        secret: String,
        report: RedeployReport,
    },
    StreamClosed(WatchSummary),
    WatcherFinished(WatchSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Rejected,
    Registered,
    Redeployed(RedeployReport),
}

/// How a watch stream ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    /// The server closed the stream, usually once its timeout expired
    #[default]
    Closed,
    /// The resource version is too old to resume from
    Expired,
    /// Error event from the server or transport failure
    Failed,
}

/// Counters for one or more watch streams.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub events: usize,
    pub rejected: usize,
    pub registered: usize,
    pub redeployments: usize,
    pub failed_dispatches: usize,
    pub end: WatchEnd,
}

impl WatchSummary {
    fn record(&mut self, outcome: &EventOutcome) {
        self.events += 1;
        match outcome {
            EventOutcome::Ignored => {}
            EventOutcome::Rejected => self.rejected += 1,
            EventOutcome::Registered => self.registered += 1,
            EventOutcome::Redeployed(report) => {
                self.redeployments += 1;
                self.failed_dispatches += report.failed;
            }
        }
    }

    fn absorb(&mut self, other: &WatchSummary) {
        self.events += other.events;
        self.rejected += other.rejected;
        self.registered += other.registered;
        self.redeployments += other.redeployments;
        self.failed_dispatches += other.failed_dispatches;
        self.end = other.end;
    }
}

/// Turns Secret events into redeployments. Events are handled one at a time,
/// the next one is only read once every target of the current one has been
/// dispatched.
///
/// The registry and the last resource version seen outlive each watch
/// stream, so a reopened watch resumes where the previous one stopped.
pub struct SecretWatcher {
    registry: SeenRegistry,
    redeployer: Redeployer,
    resource_version: String,
}

impl SecretWatcher {
    pub fn new(registry: SeenRegistry, redeployer: Redeployer) -> Self {
        SecretWatcher {
            registry,
            redeployer,
            resource_version: SECRET_WATCH_START_VERSION.to_string(),
        }
    }

    pub fn registry(&self) -> &SeenRegistry {
        &self.registry
    }

    /// Resource version the next watch stream starts from.
    pub fn resource_version(&self) -> &str {
        &self.resource_version
    }

    /// Opens watch streams from `source` one after the other. When
    /// `keep_watching` is set, a stream closed by the server is reopened from
    /// the last resource version seen, and an expired one from scratch. A
    /// failed stream always ends the watch.
    pub async fn watch<E>(
        &mut self,
        source: &E,
        keep_watching: bool,
        queue_tx: Option<&Sender<SecretWatcherProtocol>>,
    ) -> Result<WatchSummary, RedeployerError>
    where
        E: SecretEventSource + ?Sized,
    {
        let mut total = WatchSummary::default();
        loop {
            let resource_version = self.resource_version.clone();
            info!(
                "Watching for secret changes from resource version {}",
                resource_version
            );
            let events = source.open(&resource_version).await?;
            let summary = self.run(events, queue_tx).await;
            total.absorb(&summary);
            if !keep_watching || summary.end == WatchEnd::Failed {
                break;
            }
        }
        notify!(info, SecretWatcherProtocol::WatcherFinished(total) => queue_tx;
            "Finished watching for secret changes: {:?}", total);
        Ok(total)
    }

    /// Consumes one stream until it ends. Errors in single events are logged
    /// and skipped; a failing stream ends the run like a closed one.
    pub async fn run<S>(
        &mut self,
        mut events: S,
        queue_tx: Option<&Sender<SecretWatcherProtocol>>,
    ) -> WatchSummary
    where
        S: Stream<Item = WatchItem> + Unpin,
    {
        let mut summary = WatchSummary::default();
        while let Some(item) = events.next().await {
            match item {
                WatchItem::Event(event) => {
                    if let Some(version) = event.secret.resource_version() {
                        self.resource_version = version;
                    }
                    let outcome = self.handle_event(event, queue_tx).await;
                    summary.record(&outcome);
                }
                WatchItem::Bookmark(version) => {
                    debug!("Watch bookmark at resource version {}", version);
                    self.resource_version = version;
                }
                WatchItem::Skip => {}
                WatchItem::Expired => {
                    warn!(
                        "Resource version {} expired, secrets will be listed again",
                        self.resource_version
                    );
                    self.resource_version = SECRET_WATCH_START_VERSION.to_string();
                    summary.end = WatchEnd::Expired;
                    break;
                }
                WatchItem::End(reason) => {
                    error!("{}", reason);
                    summary.end = WatchEnd::Failed;
                    break;
                }
            }
        }
        notify!(debug, SecretWatcherProtocol::StreamClosed(summary) => queue_tx;
            "Secret watch stream closed: {:?}", summary);
        summary
    }

    pub async fn handle_event(
        &mut self,
        event: SecretEvent,
        queue_tx: Option<&Sender<SecretWatcherProtocol>>,
    ) -> EventOutcome {
        let name = Named::name(&event.secret);
        debug!("New event: '{}', for object: '{}'", event.event_type, name);
        if !event.secret.has_labels() {
            notify!(debug, SecretWatcherProtocol::SecretIgnored(name.clone()) => queue_tx;
                "Secret '{}' has no labels, skipping it", name);
            return EventOutcome::Ignored;
        }
        let redeployments = match event.secret.redeployments() {
            Ok(redeployments) => complete_redeployments(redeployments),
            Err(e) => {
                notify!(error, SecretWatcherProtocol::SecretRejected(name.clone()) => queue_tx;
                    "Secret '{}' has invalid redeployment labels: {}. Skipping it", name, e);
                return EventOutcome::Rejected;
            }
        };
        let version = event.secret.resource_version();
        match self.registry.classify(
            &event.event_type,
            &name,
            version.as_deref(),
            redeployments.len(),
        ) {
            Classification::Ignore => {
                notify!(debug, SecretWatcherProtocol::SecretIgnored(name.clone()) => queue_tx;
                    "Ignoring '{}' event for secret '{}'", event.event_type, name);
                EventOutcome::Ignored
            }
            Classification::Register => {
                notify!(debug, SecretWatcherProtocol::SecretRegistered(name.clone()) => queue_tx;
                    "Not firing event on first creation of secret '{}', adding it to the registry", name);
                EventOutcome::Registered
            }
            Classification::Redeploy => {
                notify!(info, SecretWatcherProtocol::RedeploymentTriggered {
                        secret: name.clone(),
                        targets: redeployments.len(),
                    } => queue_tx;
                    "Secret '{}' has changed and is redeployable. Triggering redeployment of {} targets",
                    name, redeployments.len());
                let report = self.redeployer.redeploy(&redeployments).await;
                notify!(info, SecretWatcherProtocol::RedeploymentFinished {
                        secret: name.clone(),
                        report,
                    } => queue_tx;
                    "Finished redeployment for secret '{}': {} succeeded, {} failed",
                    name, report.succeeded, report.failed);
                EventOutcome::Redeployed(report)
            }
        }
    }
}
