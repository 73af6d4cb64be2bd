use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use redeployer_common::constants::{
    DEFAULT_SERVER_TIMEOUT_SECONDS, MAX_SERVER_TIMEOUT_SECONDS, REDEPLOYER_IN_CLUSTER_ENV,
    REDEPLOYER_LOG_CONFIG_FILE_ENV, REDEPLOYER_VERBOSITY_ENV,
};
use redeployer_common::errors::RedeployerError;
use redeployer_common::kubernetes::{get_k8s_client, CredentialsMode};
use redeployer_common::watcher::KubeSecretEventSource;
use redeployer_macros::{logger, with_dollar_sign};

use crate::redeployer::Redeployer;
use crate::secret_watcher::{SecretWatcher, WatchSummary};
use crate::seen_registry::SeenRegistry;

mod errors;
mod job;
mod redeployer;
mod secret_watcher;
mod seen_registry;

logger!("Main");

const LOG_PATTERN: &str = "{d(%m/%d/%Y %I:%M:%S %p)} - {l:>8} [{t}]: {m}{n}";
const BANNER: &str = r"
 ____  _____ ____  _____ ____  _     _____   ___   _______ ____
|  _ \| ____|  _ \| ____|  _ \| |   / _ \ \ / / ____|  _ \
| |_) |  _| | | | |  _| | |_) | |  | | | \ V /|  _| | |_) |
|  _ <| |___| |_| | |___|  __/| |__| |_| || | | |___|  _ <
|_| \_\_____|____/|_____|_|   |_____\___/ |_| |_____|_| \_\
";
const NOISY_LOG_TARGETS: [&str; 4] = ["kube", "hyper", "tower", "rustls"];

fn parse_verbosity(level: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(level).map_err(|_| format!("Unknown log level {}", level))
}

#[derive(Debug, Args)]
struct WatchOptions {
    /// Use the service account of the pod instead of the local kubeconfig
    #[arg(long, env = REDEPLOYER_IN_CLUSTER_ENV)]
    in_cluster: bool,
    /// Seconds after which the API server closes the watch
    #[arg(
        long,
        default_value_t = DEFAULT_SERVER_TIMEOUT_SECONDS,
        value_parser = clap::value_parser!(u32).range(1..=(MAX_SERVER_TIMEOUT_SECONDS as i64))
    )]
    server_timeout: u32,
    /// Read timeout of the client socket, in seconds
    #[arg(long)]
    client_timeout: Option<u64>,
    /// Stop once the server closes the watch instead of reopening it
    #[arg(long)]
    once: bool,
}

#[derive(Debug, Subcommand)]
enum RedeployerCommands {
    /// Watches Secrets and restarts the workloads listed in their labels
    Watch(WatchOptions),
}

#[derive(Debug, Parser)]
#[command(name = "secret-redeployer")]
struct SecretRedeployer {
    #[arg(
        long,
        global = true,
        env = REDEPLOYER_VERBOSITY_ENV,
        default_value = "INFO",
        value_parser = parse_verbosity
    )]
    verbosity: LevelFilter,
    #[command(subcommand)]
    command: RedeployerCommands,
}

fn init_logging(verbosity: LevelFilter) -> Result<(), Box<dyn Error>> {
    if let Ok(path) = std::env::var(REDEPLOYER_LOG_CONFIG_FILE_ENV) {
        log4rs::init_file(&path, Default::default())?;
        debug!("Logger configured from {}", path);
        return Ok(());
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let config = NOISY_LOG_TARGETS
        .into_iter()
        .fold(
            LogConfig::builder().appender(Appender::builder().build("stdout", Box::new(stdout))),
            |builder, target| {
                builder.logger(Logger::builder().build(target, verbosity.min(LevelFilter::Warn)))
            },
        )
        .build(Root::builder().appender("stdout").build(verbosity))?;
    log4rs::init_config(config)?;
    Ok(())
}

async fn watch(options: WatchOptions) -> Result<WatchSummary, RedeployerError> {
    let mode = if options.in_cluster {
        CredentialsMode::InCluster
    } else {
        CredentialsMode::Kubeconfig
    };
    if let Some(t) = options.client_timeout {
        if t <= options.server_timeout as u64 {
            warn!(
                "Client timeout ({}s) is not longer than the server timeout ({}s), the watch may be cut by the client",
                t, options.server_timeout
            );
        }
    }
    let client = get_k8s_client(mode, options.client_timeout.map(Duration::from_secs)).await?;
    let source = KubeSecretEventSource::new(client.clone(), options.server_timeout);
    let mut watcher = SecretWatcher::new(
        SeenRegistry::in_memory(),
        Redeployer::kube_redeployer(client),
    );
    watcher.watch(&source, !options.once, None).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = SecretRedeployer::parse();
    init_logging(args.verbosity)?;
    info!("{}", BANNER);
    match args.command {
        RedeployerCommands::Watch(options) => {
            let summary = watch(options).await?;
            info!(
                "Processed {} events: {} secrets registered, {} redeployments triggered, {} failed dispatches",
                summary.events, summary.registered, summary.redeployments, summary.failed_dispatches
            );
        }
    }
    Ok(())
}
