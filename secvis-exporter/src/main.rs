//! Security visibility exporter
//!
//! Pulls security events and their threat context from the API and writes
//! them to stdout as JSON lines, one row per event/detection/alert.
//!
//! Usage:
//!   secvis-exporter sync --checkpoint /var/lib/secvis/events_end_cursor.txt
//!   secvis-exporter alerts
//!
//! Credentials come from flags or `SECUREX_*` environment variables. Logs go
//! to stderr so stdout stays a clean row stream.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use secvis_sync::{
    ApiClient, ApiConfig, BulkJoinEngine, CollectionQuery, DEFAULT_SORT_KEY, FileCheckpointStore,
    JsonLinesSink, RowSink, SyncConfig,
};
use std::path::PathBuf;
use std::pin::pin;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "secvis-exporter")]
#[command(about = "Export enriched security events as JSON lines")]
struct Args {
    #[command(flatten)]
    api: ApiArgs,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct ApiArgs {
    /// API client id
    #[arg(long, env = "SECUREX_CLIENT_ID")]
    client_id: String,

    /// API client secret
    #[arg(long, env = "SECUREX_CLIENT_PASSWORD", hide_env_values = true)]
    client_secret: String,

    /// Customer id used in collection paths
    #[arg(long, env = "SECUREX_CUSTOMER_ID")]
    customer_id: String,

    /// Base URL of the collection API
    #[arg(long, env = "SECUREX_API_HOST")]
    api_base_url: Option<String>,

    /// Base URL of the token endpoint
    #[arg(long, env = "SECUREX_VISIBILITY_HOST_NAME")]
    token_base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout: u64,
}

impl ApiArgs {
    fn into_config(self) -> ApiConfig {
        let defaults = ApiConfig::default();
        ApiConfig {
            client_id: self.client_id,
            client_secret: self.client_secret,
            customer_id: self.customer_id,
            api_base_url: self.api_base_url.unwrap_or(defaults.api_base_url),
            token_base_url: self.token_base_url.unwrap_or(defaults.token_base_url),
            request_timeout_secs: self.timeout,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export events changed since the last successful run
    Sync {
        /// File holding the cursor of the last exported event
        #[arg(long, env = "SECVIS_CHECKPOINT_FILE", default_value = "events_end_cursor.txt")]
        checkpoint: PathBuf,

        /// Events requested per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Sort key of the event query
        #[arg(long, default_value = DEFAULT_SORT_KEY)]
        sort: String,

        /// Run bulk loads one after another
        #[arg(long)]
        sequential: bool,
    },
    /// Dump every alert
    Alerts,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let api = ApiClient::new(&args.api.into_config()).context("invalid API configuration")?;

    match args.command {
        Command::Sync {
            checkpoint,
            page_size,
            sort,
            sequential,
        } => {
            let config = SyncConfig {
                sort_key: sort,
                page_size,
                parallel_bulk_loads: !sequential,
            };
            let engine = BulkJoinEngine::new(api, config);
            let store = FileCheckpointStore::new(&checkpoint);
            let mut sink = JsonLinesSink::new(tokio::io::stdout());

            let summary = engine.run(&store, &mut sink).await?;
            info!(
                "Sync complete: {} events, {} rows, checkpoint {}",
                summary.events,
                summary.rows,
                summary.checkpoint.as_deref().unwrap_or("<none>")
            );
        }
        Command::Alerts => {
            let query = CollectionQuery::get(api.routes().alerts());
            let mut alerts = pin!(api.collection(query)?.into_stream());
            let mut sink = JsonLinesSink::new(tokio::io::stdout());

            while let Some(alert) = alerts.try_next().await? {
                sink.write_line(&alert).await?;
            }
            sink.flush().await?;
            info!("Exported {} alerts", sink.lines());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDS: [&str; 7] = [
        "secvis-exporter",
        "--client-id",
        "id",
        "--client-secret",
        "secret",
        "--customer-id",
        "cust",
    ];

    #[test]
    fn sync_defaults() {
        let args = Args::try_parse_from(CREDS.iter().copied().chain(["sync"])).unwrap();
        let Command::Sync {
            checkpoint,
            page_size,
            sort,
            sequential,
        } = args.command
        else {
            panic!("expected sync");
        };
        assert_eq!(checkpoint, PathBuf::from("events_end_cursor.txt"));
        assert_eq!(page_size, None);
        assert_eq!(sort, DEFAULT_SORT_KEY);
        assert!(!sequential);
    }

    #[test]
    fn api_args_fall_back_to_default_hosts() {
        let args = Args::try_parse_from(CREDS.iter().copied().chain(["alerts"])).unwrap();
        let config = args.api.into_config();
        assert_eq!(config.customer_id, "cust");
        assert_eq!(config.api_base_url, ApiConfig::default().api_base_url);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn verbose_is_accepted_after_subcommand() {
        let args =
            Args::try_parse_from(CREDS.iter().copied().chain(["sync", "--verbose"])).unwrap();
        assert!(args.verbose);
    }
}
