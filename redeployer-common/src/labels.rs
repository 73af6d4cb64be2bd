use std::collections::BTreeMap;
use std::str::FromStr;

use redeployer_macros::{logger, with_dollar_sign};

use crate::errors::LabelError;
use crate::redeployment::{RedeploymentSet, TargetField, WorkloadKind};

logger!("Labels");

pub const REDEPLOYABLE_LABEL_PREFIX: &str = "redeployable";
pub const REDEPLOYABLE_LABEL_SEPARATOR: char = '-';

/// Applies one label to the accumulated set of targets.
///
/// Labels that do not start with `redeployable` are ignored and the set is
/// returned untouched. Otherwise the label must read
/// `redeployable-<ordinal>-<namespace|name|resource>` and must not set a
/// field twice for the same ordinal.
pub fn decode_label(
    label_name: &str,
    label_value: &str,
    mut redeployments: RedeploymentSet,
) -> Result<RedeploymentSet, LabelError> {
    if !label_name.starts_with(REDEPLOYABLE_LABEL_PREFIX) {
        return Ok(redeployments);
    }
    let (ordinal, field) = match label_name
        .split(REDEPLOYABLE_LABEL_SEPARATOR)
        .collect::<Vec<&str>>()[..]
    {
        [REDEPLOYABLE_LABEL_PREFIX, ordinal, field] => (ordinal, field),
        _ => {
            return Err(LabelError::MalformedLabel {
                label: label_name.to_string(),
            })
        }
    };
    let ordinal = ordinal
        .parse::<u32>()
        .map_err(|_| LabelError::InvalidOrdinal {
            label: label_name.to_string(),
            ordinal: ordinal.to_string(),
        })?;
    let field = TargetField::from_str(field).map_err(|_| LabelError::InvalidField {
        label: label_name.to_string(),
        field: field.to_string(),
    })?;
    let target = redeployments.entry(ordinal).or_default();
    if target.has_field(field) {
        return Err(LabelError::DuplicateField {
            label: label_name.to_string(),
            ordinal,
            field,
        });
    }
    match field {
        TargetField::Namespace => target.namespace = Some(label_value.to_string()),
        TargetField::Name => target.name = Some(label_value.to_string()),
        TargetField::Resource => {
            let resource =
                WorkloadKind::from_str(label_value).map_err(|_| LabelError::InvalidResource {
                    label: label_name.to_string(),
                    resource: label_value.to_string(),
                })?;
            target.resource = Some(resource);
        }
    }
    debug!("Decoded label {}={}", label_name, label_value);
    Ok(redeployments)
}

/// Folds all the labels of a Secret into a set of targets. The first invalid
/// label aborts the whole set.
pub fn decode_labels<'a, I>(labels: I) -> Result<RedeploymentSet, LabelError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    labels
        .into_iter()
        .try_fold(RedeploymentSet::new(), |redeployments, (name, value)| {
            decode_label(name, value, redeployments)
        })
}

/// Same as `decode_labels` for an optional label map, as found in object
/// metadata.
pub fn decode_optional_labels(
    labels: Option<&BTreeMap<String, String>>,
) -> Result<RedeploymentSet, LabelError> {
    labels.map_or_else(|| Ok(RedeploymentSet::new()), |ls| decode_labels(ls))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use redeployer_test_macros::target_labels;

    use super::{decode_label, decode_labels};
    use crate::errors::LabelError;
    use crate::redeployment::{RedeploymentSet, RedeploymentTarget, TargetField, WorkloadKind};

    fn labels(xs: Vec<(&str, &str)>) -> BTreeMap<String, String> {
        xs.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn namespace_only(ns: &str) -> RedeploymentTarget {
        RedeploymentTarget {
            namespace: Some(ns.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_labels_empty() {
        assert_eq!(
            decode_labels(&BTreeMap::<String, String>::new()),
            Ok(RedeploymentSet::new())
        );
    }

    #[test]
    fn test_decode_labels_no_redeployable_labels() {
        let ls = labels(vec![
            ("app", "web"),
            ("redeploy-1-namespace", "test-namespace"),
            ("app.kubernetes.io/redeployable-1-name", "web"),
        ]);
        assert_eq!(decode_labels(&ls), Ok(RedeploymentSet::new()));
    }

    #[test]
    fn test_decode_label_single_field() {
        let set = decode_label("redeployable-1-namespace", "ns", RedeploymentSet::new());
        assert_eq!(set, Ok(RedeploymentSet::from([(1, namespace_only("ns"))])));
    }

    #[test]
    fn test_decode_label_extends_existing_set() {
        let existing = RedeploymentSet::from([(1, namespace_only("test-namespace"))]);
        let set = decode_label("redeployable-2-name", "test-name", existing).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[&1], namespace_only("test-namespace"));
        assert_eq!(set[&2].name.as_deref(), Some("test-name"));
    }

    #[test]
    fn test_decode_labels_complete_target() {
        let ls = labels(vec![
            ("redeployable-1-namespace", "ns"),
            ("redeployable-1-name", "app"),
            ("redeployable-1-resource", "deployment"),
        ]);
        assert_eq!(
            decode_labels(&ls),
            Ok(RedeploymentSet::from([(
                1,
                RedeploymentTarget {
                    namespace: Some("ns".to_string()),
                    name: Some("app".to_string()),
                    resource: Some(WorkloadKind::Deployment),
                }
            )]))
        );
    }

    #[test]
    fn test_decode_labels_several_targets() {
        let mut xs = target_labels!(1, "ns1", "web", "deployment");
        xs.extend(target_labels!(2, "ns2", "db", "stateful-set"));
        xs.extend(target_labels!(10, "ns1", "migrate", "job"));
        let ls: BTreeMap<String, String> = xs.into_iter().collect();
        let set = decode_labels(&ls).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set[&2].resource, Some(WorkloadKind::StatefulSet));
        assert_eq!(set[&10].name.as_deref(), Some("migrate"));
        assert!(set.values().all(|t| t.is_complete()));
    }

    #[test]
    fn test_decode_label_order_independent() {
        let a = decode_label("redeployable-3-namespace", "ns", RedeploymentSet::new())
            .and_then(|s| decode_label("redeployable-3-resource", "job", s));
        let b = decode_label("redeployable-3-resource", "job", RedeploymentSet::new())
            .and_then(|s| decode_label("redeployable-3-namespace", "ns", s));
        assert!(a.is_ok());
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_label_malformed() {
        for label in [
            "redeployable-1",
            "redeployable",
            "redeployable-1-name-extra",
            "redeployablex-1-name",
            "redeployable--name",
        ] {
            let set = decode_label(label, "value", RedeploymentSet::new());
            match label {
                // empty ordinal still has three segments
                "redeployable--name" => assert!(
                    matches!(set, Err(LabelError::InvalidOrdinal { .. })),
                    "Unexpected result for {}: {:?}",
                    label,
                    set
                ),
                _ => assert_eq!(
                    set,
                    Err(LabelError::MalformedLabel {
                        label: label.to_string()
                    })
                ),
            }
        }
    }

    #[test]
    fn test_decode_label_invalid_ordinal() {
        assert_eq!(
            decode_label("redeployable-x-namespace", "ns", RedeploymentSet::new()),
            Err(LabelError::InvalidOrdinal {
                label: "redeployable-x-namespace".to_string(),
                ordinal: "x".to_string(),
            })
        );
        assert!(matches!(
            decode_label("redeployable-1.5-name", "ns", RedeploymentSet::new()),
            Err(LabelError::InvalidOrdinal { .. })
        ));
    }

    #[test]
    fn test_decode_label_invalid_field() {
        assert_eq!(
            decode_label("redeployable-1-foo", "ns", RedeploymentSet::new()),
            Err(LabelError::InvalidField {
                label: "redeployable-1-foo".to_string(),
                field: "foo".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_label_invalid_resource() {
        assert_eq!(
            decode_label("redeployable-1-resource", "pod", RedeploymentSet::new()),
            Err(LabelError::InvalidResource {
                label: "redeployable-1-resource".to_string(),
                resource: "pod".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_label_duplicate_field() {
        let existing = RedeploymentSet::from([(1, namespace_only("test-namespace"))]);
        // Same value or a different one, a second namespace for 1 is rejected
        for value in ["test-namespace", "other"] {
            assert_eq!(
                decode_label("redeployable-1-namespace", value, existing.clone()),
                Err(LabelError::DuplicateField {
                    label: "redeployable-1-namespace".to_string(),
                    ordinal: 1,
                    field: TargetField::Namespace,
                })
            );
        }
        // Other ordinals are not affected
        assert!(decode_label("redeployable-2-namespace", "test-namespace", existing).is_ok());
    }

    #[test]
    fn test_decode_label_duplicate_checked_before_resource() {
        let set = decode_label("redeployable-1-resource", "job", RedeploymentSet::new()).unwrap();
        assert!(matches!(
            decode_label("redeployable-1-resource", "pod", set),
            Err(LabelError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_decode_labels_first_error_aborts() {
        let ls = labels(vec![
            ("redeployable-1-namespace", "ns"),
            ("redeployable-1-name", "app"),
            ("redeployable-1-resource", "deployment"),
            ("redeployable-2-resource", "pod"),
        ]);
        assert!(matches!(
            decode_labels(&ls),
            Err(LabelError::InvalidResource { .. })
        ));
    }
}
