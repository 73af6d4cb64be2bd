/// Hands a literal `$` to the macro body so that macros defined inside other
/// macros can declare their own metavariables.
#[macro_export]
macro_rules! with_dollar_sign {
    ($($body:tt)*) => {
        macro_rules! __with_dollar_sign { $($body)* }
        __with_dollar_sign!($);
    }
}

/// Defines `debug!`, `info!`, `warn!` and `error!` for the calling module.
/// Every record is emitted with the given component name as log target so
/// log4rs can filter per component.
///
/// Callers need `with_dollar_sign` in scope and a dependency on `log`.
#[macro_export]
macro_rules! logger {
    ($target:literal) => {
        with_dollar_sign! {
            ($d:tt) => {
                #[allow(unused_macros)]
                macro_rules! debug {
                    ($d($d arg:tt)+) => {
                        log::debug!(target: $target, $d($d arg)+)
                    };
                }

                #[allow(unused_macros)]
                macro_rules! info {
                    ($d($d arg:tt)+) => {
                        log::info!(target: $target, $d($d arg)+)
                    };
                }

                #[allow(unused_macros)]
                macro_rules! warn {
                    ($d($d arg:tt)+) => {
                        log::warn!(target: $target, $d($d arg)+)
                    };
                }

                #[allow(unused_macros)]
                macro_rules! error {
                    ($d($d arg:tt)+) => {
                        log::error!(target: $target, $d($d arg)+)
                    };
                }
            }
        }
    };
}

/// Logs a message with the component logger and, when a queue is given,
/// sends it as a debug message. Used to observe the watcher from tests.
///
/// `notify!(info, SecretWatcherProtocol::SecretRegistered(name.clone()) => queue_tx; "Registered {}", name)`
#[macro_export]
macro_rules! notify {
    ($level:ident, $msg:expr => $queue:expr ; $($arg:tt)+) => {
        $level!($($arg)+);
        if let Some(queue) = $queue {
            if let Err(err) = queue.send($msg).await {
                log::warn!("Unable to send notification message: {}", err);
            }
        }
    };
}
