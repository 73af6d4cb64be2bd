use std::collections::BTreeMap;

use crate::errors::LabelError;
use crate::labels::decode_optional_labels;
use crate::redeployment::RedeploymentSet;

pub trait Named {
    fn name(&self) -> String;
}

/// Entities carrying the `metadata.resourceVersion` set by the API server.
pub trait Versioned {
    fn resource_version(&self) -> Option<String>;
}

pub trait Labeled {
    fn labels(&self) -> Option<&BTreeMap<String, String>>;

    fn has_labels(&self) -> bool {
        self.labels().map(|ls| !ls.is_empty()).unwrap_or(false)
    }
}

/// Entities whose labels describe workloads to restart when they change.
pub trait Redeployable: Named + Labeled {
    fn redeployments(&self) -> Result<RedeploymentSet, LabelError> {
        decode_optional_labels(self.labels())
    }
}
