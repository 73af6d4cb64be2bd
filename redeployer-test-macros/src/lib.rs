/// Waits for the next message on `$queue` and checks it matches `$pattern`,
/// then runs `$e` with the message bound to `$var`. Needs `timeout` and
/// `Duration` from `tokio::time` in scope.
#[macro_export]
macro_rules! assert_message {
    (($var:ident :: $pattern:pat_param in $queue:ident) => $e:expr) => {
        let $var = match timeout(Duration::from_millis(1000), $queue.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => panic!(
                "Queue {} closed while waiting for {}",
                stringify!($queue),
                stringify!($pattern)
            ),
            Err(_) => panic!(
                "No {} received on {} within 1000ms",
                stringify!($pattern),
                stringify!($queue)
            ),
        };
        assert!(
            matches!($var, $pattern),
            "Expected {} on {}, got {:?}",
            stringify!($pattern),
            stringify!($queue),
            $var
        );
        $e
    };

    ($var:ident :: $pattern:pat_param in $queue:ident) => {
        $crate::assert_message! {
            ($var :: $pattern in $queue) => {}
        }
    };
}

/// Checks that nothing arrives on `$queue` for `$millis` milliseconds
/// (100 by default) and that the queue is still open.
#[macro_export]
macro_rules! assert_no_message {
    ($queue:ident | $millis:literal) => {
        match timeout(Duration::from_millis($millis), $queue.recv()).await {
            Ok(Some(message)) => panic!(
                "Expected {} to stay empty, got {:?}",
                stringify!($queue),
                message
            ),
            Ok(None) => panic!("Queue {} was closed", stringify!($queue)),
            Err(_) => {}
        }
    };

    ($queue:ident) => {
        $crate::assert_no_message!($queue | 100)
    };
}

/// The three labels describing a complete redeployment target.
#[macro_export]
macro_rules! target_labels {
    ($ordinal:literal, $namespace:literal, $name:literal, $resource:literal) => {
        vec![
            (format!("redeployable-{}-namespace", $ordinal), $namespace.to_string()),
            (format!("redeployable-{}-name", $ordinal), $name.to_string()),
            (format!("redeployable-{}-resource", $ordinal), $resource.to_string()),
        ]
    };
}

#[macro_export]
macro_rules! secret {
    ($name:literal) => {{
        let mut secret = k8s_openapi::api::core::v1::Secret::default();
        secret.metadata.name = Some($name.to_string());
        secret.metadata.namespace = Some("default".to_string());
        secret
    }};

    ($name:literal, labels => $labels:expr) => {{
        let mut secret = $crate::secret!($name);
        let labels: std::collections::BTreeMap<String, String> = $labels
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        secret.metadata.labels = Some(labels);
        secret
    }};
}

#[macro_export]
macro_rules! job {
    ($name:literal, $namespace:literal) => {{
        let mut job = k8s_openapi::api::batch::v1::Job::default();
        job.metadata.name = Some($name.to_string());
        job.metadata.namespace = Some($namespace.to_string());
        job
    }};

    ($name:literal, $namespace:literal, last_applied => $config:expr) => {{
        let mut job = $crate::job!($name, $namespace);
        job.metadata.annotations = Some(std::collections::BTreeMap::from([(
            "kubectl.kubernetes.io/last-applied-configuration".to_string(),
            $config.to_string(),
        )]));
        job
    }};
}
