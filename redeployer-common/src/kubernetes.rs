use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use kube::config::KubeConfigOptions;
use kube::{Client, Config, ResourceExt};
use redeployer_macros::{logger, with_dollar_sign};

use crate::constants::REDEPLOYER_K8S_NO_VERIFY_ENV;
use crate::errors::RedeployerError;
use crate::traits::{Labeled, Named, Redeployable, Versioned};

logger!("Kubernetes");

/// How the controller authenticates against the API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsMode {
    /// Service account token mounted in the pod
    InCluster,
    /// Current context of the local kubeconfig
    Kubeconfig,
}

pub async fn get_k8s_client(
    mode: CredentialsMode,
    read_timeout: Option<Duration>,
) -> Result<Client, RedeployerError> {
    let mut k8s_config = match mode {
        CredentialsMode::InCluster => Config::incluster()
            .map_err(RedeployerError::from_error("Unable to load in-cluster configuration"))?,
        CredentialsMode::Kubeconfig => Config::from_kubeconfig(&KubeConfigOptions::default())
            .await
            .map_err(RedeployerError::from_error("Unable to load kubeconfig"))?,
    };
    if read_timeout.is_some() {
        k8s_config.read_timeout = read_timeout;
    }
    k8s_config.accept_invalid_certs = std::env::var(REDEPLOYER_K8S_NO_VERIFY_ENV)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);
    info!(
        "Using Kubernetes API at {} ({:?} credentials)",
        k8s_config.cluster_url, mode
    );
    Client::try_from(k8s_config).map_err(RedeployerError::from_error("Unable to create k8s client"))
}

// Implement required traits for Secret

impl Named for Secret {
    fn name(&self) -> String {
        self.name_any()
    }
}

impl Labeled for Secret {
    fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.labels.as_ref()
    }
}

impl Versioned for Secret {
    fn resource_version(&self) -> Option<String> {
        self.metadata.resource_version.clone()
    }
}

impl Redeployable for Secret {}
