use std::fmt::Display;

use kube::Error as KError;
use redeployer_common::redeployment::{Redeployment, WorkloadKind};

/// Failure restarting one target. Never fatal: the redeployer logs it and
/// moves on to the next target.
#[derive(Debug)]
pub enum DispatchError {
    Api {
        kind: WorkloadKind,
        namespace: String,
        name: String,
        error: KError,
    },
    MissingLastAppliedConfiguration {
        namespace: String,
        name: String,
    },
    InvalidLastAppliedConfiguration {
        namespace: String,
        name: String,
        error: String,
    },
    NameCollision {
        namespace: String,
        name: String,
        generated_name: String,
    },
}

impl DispatchError {
    pub fn api(redeployment: &Redeployment) -> impl FnOnce(KError) -> Self + '_ {
        move |error| DispatchError::Api {
            kind: redeployment.resource,
            namespace: redeployment.namespace.clone(),
            name: redeployment.name.clone(),
            error,
        }
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Api {
                kind,
                namespace,
                name,
                error,
            } => write!(
                f,
                "Unable to redeploy {} {}/{}: {}",
                kind, namespace, name, error
            ),
            DispatchError::MissingLastAppliedConfiguration { namespace, name } => write!(
                f,
                "Job {}/{} has no last applied configuration, unable to recreate it",
                namespace, name
            ),
            DispatchError::InvalidLastAppliedConfiguration {
                namespace,
                name,
                error,
            } => write!(
                f,
                "Job {}/{} has an invalid last applied configuration: {}",
                namespace, name, error
            ),
            DispatchError::NameCollision {
                namespace,
                name,
                generated_name,
            } => write!(
                f,
                "Unable to recreate job {}/{}: job {} already exists",
                namespace, name, generated_name
            ),
        }
    }
}

impl std::error::Error for DispatchError {}
