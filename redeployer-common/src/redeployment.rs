use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use redeployer_macros::{logger, with_dollar_sign};

logger!("Redeployment");

/// Kind of workload a redeployment target points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    Job,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "stateful-set",
            WorkloadKind::Job => "job",
        }
    }
}

impl FromStr for WorkloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown workload kind {}", s))
    }
}

impl Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last segment of a `redeployable-<ordinal>-<field>` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetField {
    Namespace,
    Name,
    Resource,
}

impl TargetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Namespace => "namespace",
            TargetField::Name => "name",
            TargetField::Resource => "resource",
        }
    }
}

impl FromStr for TargetField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "namespace" => Ok(TargetField::Namespace),
            "name" => Ok(TargetField::Name),
            "resource" => Ok(TargetField::Resource),
            _ => Err(format!("Unknown redeployment field {}", s)),
        }
    }
}

impl Display for TargetField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target being accumulated from labels. Fields stay unset until the
/// corresponding label is decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedeploymentTarget {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub resource: Option<WorkloadKind>,
}

impl RedeploymentTarget {
    pub fn has_field(&self, field: TargetField) -> bool {
        match field {
            TargetField::Namespace => self.namespace.is_some(),
            TargetField::Name => self.name.is_some(),
            TargetField::Resource => self.resource.is_some(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.namespace.is_some() && self.name.is_some() && self.resource.is_some()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        [TargetField::Namespace, TargetField::Name, TargetField::Resource]
            .into_iter()
            .filter(|f| !self.has_field(*f))
            .map(|f| f.as_str())
            .collect()
    }
}

/// Targets found in the labels of one Secret, keyed by ordinal.
pub type RedeploymentSet = BTreeMap<u32, RedeploymentTarget>;

/// A complete target, ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeployment {
    pub ordinal: u32,
    pub namespace: String,
    pub name: String,
    pub resource: WorkloadKind,
}

impl Display for Redeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.resource, self.namespace, self.name)
    }
}

impl TryFrom<(u32, RedeploymentTarget)> for Redeployment {
    type Error = RedeploymentTarget;

    fn try_from((ordinal, target): (u32, RedeploymentTarget)) -> Result<Self, Self::Error> {
        match target {
            RedeploymentTarget {
                namespace: Some(namespace),
                name: Some(name),
                resource: Some(resource),
            } => Ok(Redeployment {
                ordinal,
                namespace,
                name,
                resource,
            }),
            incomplete => Err(incomplete),
        }
    }
}

/// Keeps only the complete targets of a set. Incomplete ones are dropped one
/// by one with a warning, the rest still go through.
pub fn complete_redeployments(redeployments: RedeploymentSet) -> Vec<Redeployment> {
    redeployments
        .into_iter()
        .filter_map(|(ordinal, target)| match Redeployment::try_from((ordinal, target)) {
            Ok(redeployment) => Some(redeployment),
            Err(target) => {
                warn!(
                    "Redeployment target {} ({:?}) not ready, missing {}. Skipping it",
                    ordinal,
                    target,
                    target.missing_fields().join(", ")
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{
        complete_redeployments, Redeployment, RedeploymentSet, RedeploymentTarget, TargetField,
        WorkloadKind,
    };

    fn target(
        namespace: Option<&str>,
        name: Option<&str>,
        resource: Option<WorkloadKind>,
    ) -> RedeploymentTarget {
        RedeploymentTarget {
            namespace: namespace.map(String::from),
            name: name.map(String::from),
            resource,
        }
    }

    #[test]
    fn test_workload_kind_from_str() {
        assert_eq!(WorkloadKind::from_str("deployment"), Ok(WorkloadKind::Deployment));
        assert_eq!(WorkloadKind::from_str("stateful-set"), Ok(WorkloadKind::StatefulSet));
        assert_eq!(WorkloadKind::from_str("job"), Ok(WorkloadKind::Job));
        assert!(WorkloadKind::from_str("pod").is_err());
        assert!(WorkloadKind::from_str("Deployment").is_err());
        assert!(WorkloadKind::from_str("statefulset").is_err());
    }

    #[test]
    fn test_target_field_from_str() {
        assert_eq!(TargetField::from_str("namespace"), Ok(TargetField::Namespace));
        assert_eq!(TargetField::from_str("name"), Ok(TargetField::Name));
        assert_eq!(TargetField::from_str("resource"), Ok(TargetField::Resource));
        assert!(TargetField::from_str("foo").is_err());
    }

    #[test]
    fn test_complete_redeployments_keeps_complete_targets() {
        let set = RedeploymentSet::from([
            (1, target(Some("ns"), Some("app"), Some(WorkloadKind::Deployment))),
            (2, target(Some("ns2"), Some("db"), Some(WorkloadKind::StatefulSet))),
        ]);
        assert_eq!(
            complete_redeployments(set),
            vec![
                Redeployment {
                    ordinal: 1,
                    namespace: "ns".to_string(),
                    name: "app".to_string(),
                    resource: WorkloadKind::Deployment,
                },
                Redeployment {
                    ordinal: 2,
                    namespace: "ns2".to_string(),
                    name: "db".to_string(),
                    resource: WorkloadKind::StatefulSet,
                },
            ]
        );
    }

    #[test]
    fn test_complete_redeployments_drops_incomplete_targets() {
        let set = RedeploymentSet::from([
            (1, target(Some("ns"), None, None)),
            (2, target(Some("ns"), Some("migrate"), Some(WorkloadKind::Job))),
            (3, target(None, Some("app"), Some(WorkloadKind::Deployment))),
        ]);
        let xs = complete_redeployments(set);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].ordinal, 2);
        assert_eq!(xs[0].to_string(), "job ns/migrate");

        let set = RedeploymentSet::from([(1, target(Some("ns"), None, None))]);
        assert!(complete_redeployments(set).is_empty());
        assert!(complete_redeployments(RedeploymentSet::new()).is_empty());
    }

    #[test]
    fn test_redeployment_target_missing_fields() {
        let t = target(Some("ns"), None, None);
        assert!(!t.is_complete());
        assert!(t.has_field(TargetField::Namespace));
        assert_eq!(t.missing_fields(), vec!["name", "resource"]);
        let t = target(Some("ns"), Some("app"), Some(WorkloadKind::Job));
        assert!(t.is_complete());
        assert!(t.missing_fields().is_empty());
    }
}
