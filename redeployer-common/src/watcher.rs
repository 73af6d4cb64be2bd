use std::fmt::Display;
use std::pin::Pin;

use futures::stream::BoxStream;
use futures::{Future, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{WatchEvent, WatchParams};
use kube::{Api, Client, Error as KError};
use redeployer_macros::{logger, with_dollar_sign};

logger!("Watcher");

pub const SECRET_WATCH_START_VERSION: &str = "0";
/// Status code sent when the requested resource version is no longer known
const RESOURCE_VERSION_EXPIRED: u16 = 410;

/// Type of a watch notification, as sent by the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretEventType {
    Added,
    Modified,
    Deleted,
}

impl Display for SecretEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretEventType::Added => f.write_str("ADDED"),
            SecretEventType::Modified => f.write_str("MODIFIED"),
            SecretEventType::Deleted => f.write_str("DELETED"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecretEvent {
    pub event_type: SecretEventType,
    pub secret: Secret,
}

/// What a single item of the watch stream means for the watch loop.
#[derive(Debug)]
pub enum WatchItem {
    Event(SecretEvent),
    /// Progress notification carrying the resource version reached
    Bookmark(String),
    /// Nothing to act on, the stream goes on
    Skip,
    /// The resource version the watch started from is too old, the Secrets
    /// have to be listed again
    Expired,
    /// The server or the transport ended the watch
    End(String),
}

impl From<Result<WatchEvent<Secret>, KError>> for WatchItem {
    fn from(item: Result<WatchEvent<Secret>, KError>) -> Self {
        match item {
            Ok(WatchEvent::Added(secret)) => WatchItem::Event(SecretEvent {
                event_type: SecretEventType::Added,
                secret,
            }),
            Ok(WatchEvent::Modified(secret)) => WatchItem::Event(SecretEvent {
                event_type: SecretEventType::Modified,
                secret,
            }),
            Ok(WatchEvent::Deleted(secret)) => WatchItem::Event(SecretEvent {
                event_type: SecretEventType::Deleted,
                secret,
            }),
            Ok(WatchEvent::Bookmark(bookmark)) => {
                WatchItem::Bookmark(bookmark.metadata.resource_version)
            }
            Ok(WatchEvent::Error(e)) if e.code == RESOURCE_VERSION_EXPIRED => WatchItem::Expired,
            Err(KError::Api(e)) if e.code == RESOURCE_VERSION_EXPIRED => WatchItem::Expired,
            Ok(WatchEvent::Error(e)) => {
                WatchItem::End(format!("Watch error from API server: {} ({})", e.message, e.code))
            }
            Err(KError::SerdeError(e)) => {
                warn!("Skipping watch event that could not be decoded: {}", e);
                WatchItem::Skip
            }
            Err(e) => WatchItem::End(format!("Watch stream failed: {}", e)),
        }
    }
}

/// Parameters for the Secret watch. The API server closes the stream after
/// `timeout_seconds`.
pub fn secret_watch_params(timeout_seconds: u32) -> WatchParams {
    WatchParams::default().timeout(timeout_seconds)
}

/// Opens a watch on Secrets. From resource version "0" the API server sends
/// the existing Secrets first, as `ADDED` events. From any other version it
/// only sends what changed after it.
pub async fn watch_secrets<'a>(
    api: &'a Api<Secret>,
    params: &'a WatchParams,
    resource_version: &'a str,
) -> Result<BoxStream<'a, WatchItem>, KError> {
    Ok(api
        .watch(params, resource_version)
        .await?
        .map(WatchItem::from)
        .boxed())
}

/// Opens watch streams of Secrets. Each stream ends when the server closes
/// it, the watch loop opens the next one.
pub trait SecretEventSource {
    fn open<'a>(
        &'a self,
        resource_version: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BoxStream<'a, WatchItem>, KError>> + Send + 'a>>;
}

pub struct KubeSecretEventSource {
    api: Api<Secret>,
    params: WatchParams,
}

impl KubeSecretEventSource {
    pub fn new(client: Client, timeout_seconds: u32) -> Self {
        KubeSecretEventSource {
            api: Api::all(client),
            params: secret_watch_params(timeout_seconds),
        }
    }
}

impl SecretEventSource for KubeSecretEventSource {
    fn open<'a>(
        &'a self,
        resource_version: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BoxStream<'a, WatchItem>, KError>> + Send + 'a>> {
        Box::pin(watch_secrets(&self.api, &self.params, resource_version))
    }
}
