use chrono::{DateTime, SecondsFormat, Utc};
use const_format::formatcp;

const KUBECTL_ANNOTATION_DOMAIN: &str = "kubectl.kubernetes.io";

macro_rules! kubectl_annotate {
    ($annotation:literal) => {{
        formatcp!("{}/{}", KUBECTL_ANNOTATION_DOMAIN, $annotation)
    }};
}

/// Written on pod templates to make the workload controller roll its pods.
pub const RESTARTED_AT_ANNOTATION: &str = kubectl_annotate!("restartedAt");
/// Manifest stored by `kubectl apply`, used to recreate jobs.
pub const LAST_APPLIED_CONFIGURATION_ANNOTATION: &str =
    kubectl_annotate!("last-applied-configuration");

/// Restart marker value: RFC 3339 in UTC with a `Z` suffix.
pub fn restarted_at(now: &DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{restarted_at, LAST_APPLIED_CONFIGURATION_ANNOTATION, RESTARTED_AT_ANNOTATION};

    #[test]
    fn test_annotation_names() {
        assert_eq!(RESTARTED_AT_ANNOTATION, "kubectl.kubernetes.io/restartedAt");
        assert_eq!(
            LAST_APPLIED_CONFIGURATION_ANNOTATION,
            "kubectl.kubernetes.io/last-applied-configuration"
        );
    }

    #[test]
    fn test_restarted_at_is_utc() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap();
        assert_eq!(restarted_at(&now), "2024-03-01T10:20:30.000000Z");
    }
}
