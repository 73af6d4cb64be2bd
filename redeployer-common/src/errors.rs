use std::fmt::Display;

use crate::redeployment::TargetField;

/// Errors raised while decoding the `redeployable-*` labels of a Secret.
/// Any of them discards the whole label set of that Secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    MalformedLabel {
        label: String,
    },
    InvalidOrdinal {
        label: String,
        ordinal: String,
    },
    InvalidField {
        label: String,
        field: String,
    },
    DuplicateField {
        label: String,
        ordinal: u32,
        field: TargetField,
    },
    InvalidResource {
        label: String,
        resource: String,
    },
}

impl Display for LabelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelError::MalformedLabel { label } => write!(
                f,
                "Invalid redeployment label '{}'. Must be in the format 'redeployable-<number>-<namespace/name/resource>'",
                label
            ),
            LabelError::InvalidOrdinal { label, ordinal } => write!(
                f,
                "Invalid number '{}' for redeployment label '{}'. Must be a non-negative integer",
                ordinal, label
            ),
            LabelError::InvalidField { label, field } => write!(
                f,
                "Invalid redeployment key '{}' in label '{}'. Must be one of namespace, name, resource",
                field, label
            ),
            LabelError::DuplicateField {
                label,
                ordinal,
                field,
            } => write!(
                f,
                "Duplicate redeployment key '{}' for target {} in label '{}'",
                field, ordinal, label
            ),
            LabelError::InvalidResource { label, resource } => write!(
                f,
                "Invalid resource '{}' in label '{}'. Must be one of deployment, stateful-set, job",
                resource, label
            ),
        }
    }
}

impl std::error::Error for LabelError {}

/// Failure setting up or running the watch. These end the process.
#[derive(Debug)]
pub struct RedeployerError {
    pub error: String,
}

impl RedeployerError {
    pub fn from_string(error: String) -> Self {
        RedeployerError { error }
    }

    pub fn from_error<E: Display>(prefix: &str) -> impl Fn(E) -> Self + '_ {
        move |e: E| RedeployerError::from_string(format!("{}: {}", prefix, e))
    }
}

impl Display for RedeployerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Redeployer error: {}", self.error)
    }
}

impl std::error::Error for RedeployerError {}

impl From<kube::Error> for RedeployerError {
    fn from(error: kube::Error) -> Self {
        RedeployerError::from_string(format!("Kubernetes API error: {}", error))
    }
}
