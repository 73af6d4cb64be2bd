use std::collections::HashMap;

use redeployer_common::watcher::SecretEventType;
use redeployer_macros::{logger, with_dollar_sign};

logger!("SeenRegistry");

/// Storage for the Secrets already seen, with the last resource version
/// observed for each. Names are only ever added.
pub trait SecretStore {
    fn contains(&self, secret: &str) -> bool;
    fn version(&self, secret: &str) -> Option<&str>;
    /// Stores or refreshes a name. Returns false if it was already stored.
    fn insert(&mut self, secret: String, version: Option<String>) -> bool;
    fn len(&self) -> usize;
}

#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: HashMap<String, Option<String>>,
}

impl SecretStore for InMemorySecretStore {
    fn contains(&self, secret: &str) -> bool {
        self.secrets.contains_key(secret)
    }

    fn version(&self, secret: &str) -> Option<&str> {
        self.secrets.get(secret).and_then(|v| v.as_deref())
    }

    fn insert(&mut self, secret: String, version: Option<String>) -> bool {
        self.secrets.insert(secret, version).is_none()
    }

    fn len(&self) -> usize {
        self.secrets.len()
    }
}

/// What to do with an event for a Secret with redeployment labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Nothing to do
    Ignore,
    /// First sighting of the Secret, remember it but do not restart anything
    Register,
    /// The Secret changed, restart its targets
    Redeploy,
}

/// Decides when a Secret change should trigger a redeployment.
///
/// When a watch starts from scratch the API server replays every existing
/// Secret as an `ADDED` event. Those must not restart anything, so the first
/// `ADDED` for a name only registers it. Later events for the same name, and
/// any `MODIFIED` event, trigger the redeployment, unless they carry the
/// resource version already recorded for that name (a replay after the watch
/// was listed again).
pub struct SeenRegistry {
    store: Box<dyn SecretStore + Send + Sync>,
}

impl SeenRegistry {
    pub fn new(store: Box<dyn SecretStore + Send + Sync>) -> Self {
        SeenRegistry { store }
    }

    pub fn in_memory() -> Self {
        SeenRegistry::new(Box::new(InMemorySecretStore::default()))
    }

    pub fn is_seen(&self, secret: &str) -> bool {
        self.store.contains(secret)
    }

    pub fn seen(&self) -> usize {
        self.store.len()
    }

    fn is_replay(&self, secret: &str, version: Option<&str>) -> bool {
        matches!((self.store.version(secret), version), (Some(known), Some(v)) if known == v)
    }

    /// `targets` is the number of complete redeployment targets found in the
    /// event, `version` its resource version. Registers the Secret when needed.
    pub fn classify(
        &mut self,
        event_type: &SecretEventType,
        secret: &str,
        version: Option<&str>,
        targets: usize,
    ) -> Classification {
        if targets == 0 {
            return Classification::Ignore;
        }
        match event_type {
            SecretEventType::Added if !self.store.contains(secret) => {
                debug!("Secret {} seen for the first time, registering it", secret);
                self.store
                    .insert(secret.to_string(), version.map(String::from));
                Classification::Register
            }
            SecretEventType::Added | SecretEventType::Modified
                if self.is_replay(secret, version) =>
            {
                debug!(
                    "Secret {} already seen at resource version {}",
                    secret,
                    version.unwrap_or_default()
                );
                Classification::Ignore
            }
            SecretEventType::Added | SecretEventType::Modified => {
                if self.store.contains(secret) {
                    self.store
                        .insert(secret.to_string(), version.map(String::from));
                }
                Classification::Redeploy
            }
            SecretEventType::Deleted => Classification::Ignore,
        }
    }
}
