/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Event stream output, REST call results, credential checks
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ripple_prime_adapter::{Credentials, FailurePolicy, PrimeClient, TungsteniteConnector};
use ripple_prime_cli::config::ProfileConfig;
use ripple_prime_cli::request::{execute_batch, load_batch, parse_query_pair};
use ripple_prime_cli::{EnvelopePrinter, RequestSpec, RunnerConfig, run_listener};

#[derive(Parser, Debug)]
#[command(name = "ripple-prime", version, about = "Ripple Prime REST and event stream runner")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    /// Validate configuration and exit
    #[arg(long = "dry-run")]
    dry_run: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream events as JSON lines until interrupted
    Listen {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Perform one signed REST call
    Request {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long, default_value = "GET")]
        method: String,
        path: String,
        /// Query parameter as key=value, repeatable
        #[arg(long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Page size; enables the paginated form
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Run a YAML list of requests in order
    Batch {
        #[arg(long)]
        profile: Option<String>,
        file: PathBuf,
        #[arg(long = "continue-on-fail")]
        continue_on_fail: bool,
    },
    /// Signed request against the health endpoint
    Check {
        #[arg(long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    info!(
        config_path = %args.config_path.display(),
        dry_run = args.dry_run,
        "starting ripple-prime"
    );

    let config = load_config(&args.config_path)?;
    info!(profile_count = config.profiles.len(), "configuration loaded");

    for topic in config.trigger.unknown_topics() {
        warn!(%topic, "topic does not match any published event type");
    }

    if args.dry_run {
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let store = config.credential_store();

    match args.command {
        Command::Listen { profile } => {
            let profile_name = profile.or_else(|| config.trigger.profile.clone());
            let (profile, credentials) = config.resolve(&store, profile_name.as_deref())?;

            let shutdown = shutdown_on_signal();

            let mut printer = EnvelopePrinter::new(std::io::stdout());
            let state = run_listener(
                &credentials,
                config.trigger.stream_config(),
                Arc::new(TungsteniteConnector),
                profile.ws_url.as_deref(),
                shutdown,
                &mut printer,
            )
            .await
            .context("listen")?;
            info!(?state, "listener exited");
        }
        Command::Request {
            profile,
            method,
            path,
            query,
            body,
            limit,
        } => {
            let (profile, credentials) = config.resolve(&store, profile.as_deref())?;
            let client = build_client(&config, profile, credentials)?;
            let query = query
                .iter()
                .map(|raw| parse_query_pair(raw).map(|(key, value)| (key, Value::String(value))))
                .collect::<Result<Vec<_>>>()?;
            let body = body
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .context("request body must be JSON")?;
            let spec = RequestSpec {
                method,
                path,
                query,
                body,
                limit,
                ..RequestSpec::default()
            };
            let response = spec.execute(&client).await.context("request")?;
            print_json(&response)?;
        }
        Command::Batch {
            profile,
            file,
            continue_on_fail,
        } => {
            let (profile, credentials) = config.resolve(&store, profile.as_deref())?;
            let client = build_client(&config, profile, credentials)?;
            let file = file.to_str().context("batch path must be valid utf-8")?;
            let specs = load_batch(file)?;
            let policy = if continue_on_fail {
                FailurePolicy::ContinueOnFail
            } else {
                FailurePolicy::Abort
            };
            info!(count = specs.len(), ?policy, "running batch");
            let results = execute_batch(&client, &specs, policy).await.context("batch")?;
            for result in &results {
                println!("{}", serde_json::to_string(result)?);
            }
        }
        Command::Check { profile } => {
            let (profile, credentials) = config.resolve(&store, profile.as_deref())?;
            let client = build_client(&config, profile, credentials)?;
            match client.check_credentials().await {
                Ok(_) => {
                    info!(profile = %profile.name, "credentials accepted");
                    print_json(&json!({"profile": profile.name, "ok": true}))?;
                }
                Err(err) => {
                    print_json(&json!({
                        "profile": profile.name,
                        "ok": false,
                        "error": err.to_string(),
                        "description": err.description(),
                    }))?;
                    return Err(anyhow!(err)).context("credential test failed");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: &PathBuf) -> Result<RunnerConfig> {
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    let mut config = RunnerConfig::from_file(path_str).context("load config")?;
    config.apply_env_fallback();
    config.validate().context("validate config")?;
    Ok(config)
}

fn build_client(
    config: &RunnerConfig,
    profile: &ProfileConfig,
    credentials: Credentials,
) -> Result<PrimeClient> {
    let client = match &profile.base_url {
        Some(base_url) => {
            PrimeClient::with_config_and_base_url(config.client_config(), credentials, base_url)
        }
        None => PrimeClient::with_config(config.client_config(), credentials),
    };
    client.with_context(|| format!("build client for profile {}", profile.name))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Token cancelled on the first SIGINT or SIGTERM
fn shutdown_on_signal() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        let signal = next_signal().await;
        info!(signal, "shutdown signal received");
        trigger.cancel();
    });
    shutdown
}

async fn interrupted() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(err) => {
            warn!(error = %err, "SIGINT handler unavailable");
            std::future::pending().await
        }
    }
}

#[cfg(unix)]
async fn next_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            name = interrupted() => name,
            _ = terminate.recv() => "SIGTERM",
        },
        Err(err) => {
            warn!(error = %err, "SIGTERM handler unavailable");
            interrupted().await
        }
    }
}

#[cfg(not(unix))]
async fn next_signal() -> &'static str {
    interrupted().await
}
