#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::{
    env,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use promdash::{
    config::{self, Config, Telemetry},
    display, exposition,
    poller::{self, Event, Poller},
};
use tokio::{
    runtime::Builder,
    signal,
    sync::mpsc,
    time::Duration,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

/// Clears the terminal and homes the cursor.
const CLEAR: &str = "\x1b[2J\x1b[H";

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::Error),
    #[error("Poller returned an error: {0}")]
    Poller(#[from] poller::Error),
    #[error("Failed to parse payload: {0}")]
    Exposition(#[from] exposition::Error),
    #[error("Failed to install prometheus exporter: {0}")]
    Telemetry(#[from] metrics_exporter_prometheus::BuildError),
    #[error("Could not join the poller task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the endpoint and redraw the metrics table on every scrape
    Run(RunCommand),
    /// Parse an exposition file once and print the metrics table
    Parse(ParseCommand),
    /// Validate configuration and exit
    ConfigCheck(ConfigCheckCommand),
}

#[derive(Args)]
struct ConfigArgs {
    /// path on disk to the configuration file, defaults apply when unset
    #[clap(long)]
    config_path: Option<PathBuf>,
}

#[derive(Args)]
struct RunCommand {
    #[command(flatten)]
    config: ConfigArgs,
    /// the endpoint to scrape, overrides the configuration file
    #[clap(long)]
    uri: Option<String>,
    /// seconds between scrapes, overrides the configuration file
    #[clap(long)]
    poll_interval_seconds: Option<u64>,
    /// the maximum time to wait, in seconds, for controlled shutdown
    #[clap(long, default_value_t = 5)]
    max_shutdown_delay: u16,
}

#[derive(Args)]
struct ParseCommand {
    #[command(flatten)]
    config: ConfigArgs,
    /// path on disk to a Prometheus text exposition payload
    #[clap(long)]
    path: PathBuf,
}

#[derive(Args)]
struct ConfigCheckCommand {
    #[command(flatten)]
    config: ConfigArgs,
}

/// Configuration YAML from `PROMDASH_CONFIG` or the file at `config_path`,
/// `None` when neither is given.
fn load_config_contents(config_path: Option<&Path>) -> Result<Option<String>, Error> {
    if let Ok(env_var_value) = env::var("PROMDASH_CONFIG") {
        debug!("Using config from env var 'PROMDASH_CONFIG'");
        return Ok(Some(env_var_value));
    }
    let Some(config_path) = config_path else {
        debug!("No configuration given, using defaults");
        return Ok(None);
    };

    debug!("Attempting to open configuration file at: {}", config_path.display());
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .open(config_path)
        .map_err(|err| {
            error!(
                "Could not read config file '{}': {}",
                config_path.display(),
                err
            );
            err
        })?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(Some(contents))
}

fn get_config(args: &ConfigArgs) -> Result<Config, Error> {
    let config = match load_config_contents(args.config_path.as_deref())? {
        Some(contents) => config::load_config_from_str(&contents).map_err(|err| {
            error!("Configuration validation failed: {}", err);
            err
        })?,
        None => Config::default(),
    };
    Ok(config)
}

fn apply_overrides(mut config: Config, cmd: &RunCommand) -> Config {
    if let Some(uri) = &cmd.uri {
        config.uri.clone_from(uri);
    }
    if let Some(poll_interval_seconds) = cmd.poll_interval_seconds {
        config.poll_interval_seconds = poll_interval_seconds;
    }
    config
}

fn validate_config(args: &ConfigArgs) -> Result<Config, Error> {
    let config = get_config(args)?;
    config.validate()?;
    info!("Configuration is valid");
    Ok(config)
}

fn parse_file(path: &Path, filter: Option<&[String]>) -> Result<String, Error> {
    let contents = std::fs::read_to_string(path)?;
    let metrics = exposition::parse(&contents)?;
    info!("parsed {} metrics from {}", metrics.len(), path.display());
    Ok(display::render(&metrics, filter))
}

fn install_telemetry(telemetry: Telemetry) -> Result<(), Error> {
    let Telemetry::Prometheus {
        addr,
        global_labels,
    } = telemetry;
    let mut builder = PrometheusBuilder::new().with_http_listener(addr);
    for (k, v) in global_labels {
        builder = builder.add_global_label(k, v);
    }
    builder.install()?;
    info!("serving promdash telemetry on {addr}");
    Ok(())
}

fn redraw(out: &mut impl Write, table: &str) -> io::Result<()> {
    write!(out, "{CLEAR}{table}")?;
    out.flush()
}

async fn inner_main(config: Config) -> Result<(), Error> {
    if let Some(telemetry) = config.telemetry.clone() {
        install_telemetry(telemetry)?;
    }

    let (stop_watcher, stop_broadcast) = promdash_signal::signal();
    let (events_snd, mut events_rcv) = mpsc::channel(16);
    let poller = Poller::new(&config, stop_watcher, events_snd)?;
    let mut poller_handle = tokio::spawn(poller.run());

    let filter = config.metrics.as_deref();
    let mut stdout = io::stdout();

    let res = loop {
        tokio::select! {
            Some(event) = events_rcv.recv() => match event {
                Event::MetricsChanged(metrics) => {
                    redraw(&mut stdout, &display::render(&metrics, filter))?;
                }
                Event::ErrorOccurred(err) => {
                    warn!("scrape failed: {err}");
                    write!(stdout, "{}", display::render_error(&err))?;
                    stdout.flush()?;
                }
            },
            _ = signal::ctrl_c() => {
                info!("received ctrl-c");
                break Ok(());
            },
            res = &mut poller_handle => {
                break match res {
                    Ok(poller_result) => poller_result.map_err(Error::from),
                    Err(err) => Err(Error::Join(err)),
                };
            }
        }
    };

    // The poller may be parked on a full channel; dropping the receiver
    // releases it so it can observe the stop signal.
    drop(events_rcv);
    stop_broadcast.signal_and_wait().await;
    res
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(io::stderr)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting promdash {version}.");

    let cli = Cli::parse();
    match cli.command {
        Commands::ConfigCheck(cmd) => match validate_config(&cmd.config) {
            Ok(_) => std::process::exit(0),
            Err(err) => {
                eprint!("{}", display::render_error(&err));
                std::process::exit(1)
            }
        },
        Commands::Parse(cmd) => {
            let config = get_config(&cmd.config)?;
            match parse_file(&cmd.path, config.metrics.as_deref()) {
                Ok(table) => {
                    print!("{table}");
                    Ok(())
                }
                Err(err) => {
                    eprint!("{}", display::render_error(&err));
                    std::process::exit(1)
                }
            }
        }
        Commands::Run(cmd) => {
            let config = apply_overrides(get_config(&cmd.config)?, &cmd);
            config.validate()?;
            let max_shutdown_delay = Duration::from_secs(cmd.max_shutdown_delay.into());

            let runtime = Builder::new_multi_thread()
                .enable_io()
                .enable_time()
                .build()?;
            let res = runtime.block_on(inner_main(config));
            info!(
                "Shutting down runtime with a {} second delay.",
                max_shutdown_delay.as_secs(),
            );
            runtime.shutdown_timeout(max_shutdown_delay);
            info!("Bye. :)");
            res
        }
    }
}
