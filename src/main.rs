//! watttime - query marginal carbon emissions from the command line.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use watttime::config::{self, TOKEN_ENV_VAR};
use watttime::{Config, Market, Series, TimePoint, WattTimeClient, export};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API token
    #[arg(long, global = true, env = "WATTTIME_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Also write logs to the log directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Marginal emissions at a single instant
    At {
        /// RFC 3339 timestamp, e.g. 2014-09-02T23:00:00Z
        ts: TimePoint,
        #[command(flatten)]
        target: Target,
    },
    /// Marginal emissions on a fixed grid between two instants
    Between {
        start: TimePoint,
        end: TimePoint,
        /// Grid spacing in minutes
        #[arg(long, default_value_t = 5)]
        interval: i64,
        /// Leave gaps empty instead of carrying the last value forward
        #[arg(long)]
        no_fill: bool,
        /// Print the series as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        target: Target,
    },
    /// Raw readings reported between two instants
    Fetch {
        start: TimePoint,
        end: TimePoint,
        #[command(flatten)]
        target: Target,
    },
    /// Write readings between two instants to a CSV file
    Export {
        start: TimePoint,
        end: TimePoint,
        /// Output directory (defaults to the data directory)
        #[arg(long)]
        dir: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Balancing authority, e.g. PJM or CAISO
    #[arg(long)]
    ba: String,
    /// Market code (defaults to the configured market)
    #[arg(long)]
    market: Option<Market>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file)?;

    let mut config = Config::load(cli.config.clone()).context("loading configuration")?;
    if let Some(base_url) = cli.base_url.clone() {
        config.api.base_url = base_url;
    }

    let mut builder = WattTimeClient::builder().config(config.api);
    if let Some(token) = cli.token.clone() {
        builder = builder.token(token);
    }
    let client = builder
        .build()
        .with_context(|| format!("set {TOKEN_ENV_VAR} or pass --token"))?;

    run(&client, cli.command).await
}

async fn run(client: &WattTimeClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::At { ts, target } => {
            let market = target.market(client);
            match client.impact_at(ts, &target.ba, Some(&market)).await? {
                Some(value) => println!("{value}"),
                None => println!("no data for {} {} at {ts}", target.ba, market),
            }
        }
        Command::Between {
            start,
            end,
            interval,
            no_fill,
            json,
            target,
        } => {
            let market = target.market(client);
            let series = client
                .impact_between(start, end, interval, &target.ba, Some(&market), !no_fill)
                .await?;
            print_series(&series, json)?;
        }
        Command::Fetch { start, end, target } => {
            let market = target.market(client);
            for reading in client.fetch(start, end, &target.ba, &market).await? {
                println!("{}\t{}", reading.timestamp.to_rfc3339(), reading.value);
            }
        }
        Command::Export {
            start,
            end,
            dir,
            target,
        } => {
            let market = target.market(client);
            let dir = match dir {
                Some(dir) => dir,
                None => config::data_dir()?,
            };
            let path = export::export_csv(client, start, end, &target.ba, &market, &dir).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

impl Target {
    fn market(&self, client: &WattTimeClient) -> Market {
        self.market
            .clone()
            .unwrap_or_else(|| client.default_market())
    }
}

fn print_series(series: &Series, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(series)?);
        return Ok(());
    }

    for (ts, value) in series.iter() {
        match value {
            Some(v) => println!("{}\t{v}", ts.to_rfc3339()),
            None => println!("{}\t-", ts.to_rfc3339()),
        }
    }
    Ok(())
}

fn init_logging(log_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "watttime=info".into());
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    if !log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    }

    let dir = config::log_dir()?;
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "watttime.log"));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    Ok(Some(guard))
}
