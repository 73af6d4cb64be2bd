use std::pin::Pin;

use chrono::Utc;
use futures::Future;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Error as KError};
use redeployer_common::annotations::{restarted_at, RESTARTED_AT_ANNOTATION};
use redeployer_common::redeployment::{Redeployment, WorkloadKind};
use redeployer_macros::{logger, with_dollar_sign};
use serde_json::{json, Value};

use crate::errors::DispatchError;
use crate::job::recreated_job;

logger!("Redeployer");

/// Calls to the cluster API needed to restart workloads.
pub trait WorkloadAPI {
    fn patch_deployment<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
        patch: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), KError>> + Send + '_>>;

    fn patch_stateful_set<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
        patch: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), KError>> + Send + '_>>;

    fn get_job<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Job, KError>> + Send + '_>>;

    fn create_job<'a>(
        &'a self,
        namespace: &'a str,
        job: &'a Job,
    ) -> Pin<Box<dyn Future<Output = Result<Job, KError>> + Send + '_>>;
}

pub struct KubeWorkloadAPI {
    client: Client,
}

impl KubeWorkloadAPI {
    pub fn new(client: Client) -> Self {
        KubeWorkloadAPI { client }
    }
}

impl WorkloadAPI for KubeWorkloadAPI {
    fn patch_deployment<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
        patch: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), KError>> + Send + '_>> {
        let fut = async move {
            let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
            api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
                .await
                .map(|_| ())
        };
        Box::pin(fut)
    }

    fn patch_stateful_set<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
        patch: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), KError>> + Send + '_>> {
        let fut = async move {
            let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
            api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
                .await
                .map(|_| ())
        };
        Box::pin(fut)
    }

    fn get_job<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Job, KError>> + Send + '_>> {
        let fut = async move {
            let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
            api.get(name).await
        };
        Box::pin(fut)
    }

    fn create_job<'a>(
        &'a self,
        namespace: &'a str,
        job: &'a Job,
    ) -> Pin<Box<dyn Future<Output = Result<Job, KError>> + Send + '_>> {
        let fut = async move {
            let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
            api.create(&PostParams::default(), job).await
        };
        Box::pin(fut)
    }
}

/// Merge patch setting the restart marker on a pod template.
pub fn restart_patch(timestamp: &str) -> Value {
    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        RESTARTED_AT_ANNOTATION: timestamp
                    }
                }
            }
        }
    })
}

fn is_already_exists(error: &KError) -> bool {
    matches!(error, KError::Api(e) if e.code == 409)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RedeployReport {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Redeployer {
    api: Box<dyn WorkloadAPI + Send + Sync>,
}

impl Redeployer {
    pub fn new(api: Box<dyn WorkloadAPI + Send + Sync>) -> Self {
        Redeployer { api }
    }

    pub fn kube_redeployer(client: Client) -> Self {
        Redeployer::new(Box::new(KubeWorkloadAPI::new(client)))
    }

    /// Restarts one workload. Deployments and stateful sets get their pod
    /// template patched, jobs are recreated under a new name.
    pub async fn dispatch(&self, redeployment: &Redeployment) -> Result<(), DispatchError> {
        match redeployment.resource {
            WorkloadKind::Deployment => {
                let patch = restart_patch(&restarted_at(&Utc::now()));
                self.api
                    .patch_deployment(&redeployment.namespace, &redeployment.name, &patch)
                    .await
                    .map_err(DispatchError::api(redeployment))
            }
            WorkloadKind::StatefulSet => {
                let patch = restart_patch(&restarted_at(&Utc::now()));
                self.api
                    .patch_stateful_set(&redeployment.namespace, &redeployment.name, &patch)
                    .await
                    .map_err(DispatchError::api(redeployment))
            }
            WorkloadKind::Job => self.recreate_job(redeployment).await,
        }
    }

    async fn recreate_job(&self, redeployment: &Redeployment) -> Result<(), DispatchError> {
        let job = self
            .api
            .get_job(&redeployment.namespace, &redeployment.name)
            .await
            .map_err(DispatchError::api(redeployment))?;
        let new_job = recreated_job(
            &job,
            &redeployment.namespace,
            &redeployment.name,
            &Utc::now(),
        )?;
        let generated_name = new_job.metadata.name.clone().unwrap_or_default();
        match self.api.create_job(&redeployment.namespace, &new_job).await {
            Ok(_) => {
                info!(
                    "Job {}/{} recreated as {}",
                    redeployment.namespace, redeployment.name, generated_name
                );
                Ok(())
            }
            Err(e) if is_already_exists(&e) => Err(DispatchError::NameCollision {
                namespace: redeployment.namespace.clone(),
                name: redeployment.name.clone(),
                generated_name,
            }),
            Err(e) => Err(DispatchError::api(redeployment)(e)),
        }
    }

    /// Restarts every target in order. A failing target is logged and does not
    /// stop the remaining ones.
    pub async fn redeploy(&self, redeployments: &[Redeployment]) -> RedeployReport {
        let mut report = RedeployReport::default();
        for redeployment in redeployments {
            info!("Redeploying {}", redeployment);
            match self.dispatch(redeployment).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!("Did not succeed in redeploying {}: {}", redeployment, e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}
