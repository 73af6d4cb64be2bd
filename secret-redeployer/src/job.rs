use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use redeployer_common::annotations::{
    restarted_at, LAST_APPLIED_CONFIGURATION_ANNOTATION, RESTARTED_AT_ANNOTATION,
};
use redeployer_common::constants::{JOB_NAME_SUFFIX_LENGTH, MAX_JOB_NAME_LENGTH};
use serde_json::{json, Value};

use crate::errors::DispatchError;

/// Random lowercase suffix for the name of a recreated job, seeded from the
/// current time. Collisions are unlikely but possible.
pub fn job_name_suffix(now: &DateTime<Utc>) -> String {
    let seed = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros());
    let mut rng = StdRng::seed_from_u64(seed as u64);
    (0..JOB_NAME_SUFFIX_LENGTH)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

/// `<name>-<suffix>`, shortening `name` so the result stays a valid job name.
pub fn recreated_job_name(name: &str, suffix: &str) -> String {
    let max_base = MAX_JOB_NAME_LENGTH - suffix.len() - 1;
    let base: String = name.chars().take(max_base).collect();
    format!("{}-{}", base.trim_end_matches('-'), suffix)
}

/// Builds the job to create in place of `job`, from the manifest stored in
/// its last applied configuration. Jobs can not be patched once running so
/// the only way to rerun one is to create a copy under a new name.
pub fn recreated_job(
    job: &Job,
    namespace: &str,
    name: &str,
    now: &DateTime<Utc>,
) -> Result<Job, DispatchError> {
    let config = job
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(LAST_APPLIED_CONFIGURATION_ANNOTATION))
        .ok_or_else(|| DispatchError::MissingLastAppliedConfiguration {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
    let invalid = |e: serde_json::Error| DispatchError::InvalidLastAppliedConfiguration {
        namespace: namespace.to_string(),
        name: name.to_string(),
        error: e.to_string(),
    };
    let mut manifest: Value = serde_json::from_str(config).map_err(invalid)?;
    if !manifest.is_object() {
        return Err(DispatchError::InvalidLastAppliedConfiguration {
            namespace: namespace.to_string(),
            name: name.to_string(),
            error: "manifest is not an object".to_string(),
        });
    }
    let new_name = recreated_job_name(name, &job_name_suffix(now));
    json_patch::merge(
        &mut manifest,
        &json!({
            "metadata": {
                "name": new_name,
                "generateName": format!("{}-", new_name),
                "namespace": namespace,
            },
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            RESTARTED_AT_ANNOTATION: restarted_at(now),
                        }
                    }
                }
            }
        }),
    );
    serde_json::from_value::<Job>(manifest).map_err(invalid)
}
