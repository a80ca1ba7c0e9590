//! Medshare CLI
//!
//! List records shared with you, grant and revoke time-bounded access,
//! inspect access history and watch live countdowns.
//!
//! Usage:
//!   medshare shared [--watch] [--refresh-secs <n>]
//!   medshare grant <record> <grantee> (--hours <n> | --seconds <n>)
//!   medshare revoke <record> <grantee>
//!   medshare expiry <record> [--grantee <address>]
//!   medshare history <record> | --all
//!   medshare open --gateway <url> --passphrase <p> --out <dir>

mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use medshare_core::{
    fetch_access_history, fetch_global_history, format_remaining_time, AccessCommands,
    AccessMonitor, Address, Clock, LedgerError, RecordId, SharedRecordsView, SystemClock,
    TrackerConfig,
};
use medshare_crypto::{open_shared_documents, DocumentKey, GatewayBlobStore, DOCUMENT_KEY_SALT};
use medshare_rpc::config::{ACCESS_CONTRACT_VAR, CATALOG_CONTRACT_VAR, RPC_URL_VAR};
use medshare_rpc::{EthLedger, LedgerConfig};
use output::Format;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "medshare")]
#[command(author = "Medshare")]
#[command(version)]
#[command(about = "Time-bounded sharing of medical records over an access ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ledger config file (JSON); overrides the ledger flags below
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the ledger
    #[arg(long, env = "MEDSHARE_RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Address of the access contract
    #[arg(long, env = "MEDSHARE_ACCESS_CONTRACT", global = true)]
    access_contract: Option<String>,

    /// Address of the record catalog contract
    #[arg(long, env = "MEDSHARE_CATALOG_CONTRACT", global = true)]
    catalog_contract: Option<String>,

    /// Your ledger account
    #[arg(long, env = "MEDSHARE_IDENTITY", global = true)]
    identity: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// List records shared with you and their remaining access time
    Shared {
        /// Keep running with live countdowns until Ctrl-C
        #[arg(long)]
        watch: bool,

        /// Seconds between ledger refreshes while watching
        #[arg(long, default_value = "30")]
        refresh_secs: u64,
    },

    /// Grant time-bounded access to one of your records
    Grant {
        record: String,

        /// Account receiving access
        grantee: String,

        /// Access duration in hours
        #[arg(long, conflicts_with = "seconds", required_unless_present = "seconds")]
        hours: Option<u64>,

        /// Access duration in seconds
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Revoke access before it expires
    Revoke { record: String, grantee: String },

    /// Show when access to a record expires
    Expiry {
        record: String,

        /// Account to check (defaults to your identity)
        #[arg(long)]
        grantee: Option<String>,
    },

    /// Show the access history of a record, or of all your records
    History {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        record: Option<String>,

        /// History across every record you own, most recent expiry first
        #[arg(long)]
        all: bool,
    },

    /// Download and decrypt every document shared with you
    Open {
        /// Blob store gateway
        #[arg(long, env = "MEDSHARE_GATEWAY")]
        gateway: String,

        /// Document passphrase
        #[arg(long, env = "MEDSHARE_PASSPHRASE", hide_env_values = true)]
        passphrase: String,

        /// Directory the decrypted documents are written to
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let identity = parse_identity(cli.identity.as_deref())?;
    let format = cli.format;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if identity.is_none() && needs_identity(&cli.command) {
        println!("Not authenticated: set --identity or MEDSHARE_IDENTITY to your ledger account.");
        return Ok(());
    }

    let config = load_config(&cli)?;
    let ledger = Arc::new(EthLedger::from_config(&config).context("cannot reach ledger endpoint")?);

    match cli.command {
        Commands::Shared { watch: false, .. } => {
            let mut view = SharedRecordsView::new(ledger.clone(), ledger, clock, identity);
            let records = view.refresh().await?;
            output::print_shared_records(records, format)?;
        }
        Commands::Shared { watch: true, refresh_secs } => {
            if refresh_secs == 0 {
                bail!("--refresh-secs must be at least 1");
            }
            let mut monitor = AccessMonitor::new(
                ledger.clone(),
                ledger,
                clock,
                identity,
                TrackerConfig::default(),
                Duration::from_secs(refresh_secs),
            );
            let mut snapshots = monitor.subscribe();
            let printer = tokio::spawn(async move {
                while snapshots.changed().await.is_ok() {
                    let records = snapshots.borrow_and_update().clone();
                    if let Err(e) = output::print_shared_records(&records, format) {
                        warn!(error = %e, "cannot print snapshot");
                    }
                }
            });

            monitor
                .run_until(wait_for_interrupt(tokio::signal::ctrl_c()))
                .await?;
            printer.abort();
        }
        Commands::Grant {
            record,
            grantee,
            hours,
            seconds,
        } => {
            let commands = AccessCommands::new(ledger, identity);
            let record = RecordId::from(record);
            let grantee = parse_address("grantee", &grantee)?;
            let receipt = match (hours, seconds) {
                (Some(hours), _) => commands.grant_for_hours(&record, &grantee, hours).await?,
                (None, Some(seconds)) => {
                    commands
                        .grant(&record, &grantee, Duration::from_secs(seconds))
                        .await?
                }
                (None, None) => bail!("either --hours or --seconds is required"),
            };
            output::print_receipt("grant", &receipt, format)?;
        }
        Commands::Revoke { record, grantee } => {
            let commands = AccessCommands::new(ledger, identity);
            let grantee = parse_address("grantee", &grantee)?;
            let receipt = commands.revoke(&RecordId::from(record), &grantee).await?;
            output::print_receipt("revoke", &receipt, format)?;
        }
        Commands::Expiry { record, grantee } => {
            use medshare_core::AccessLedger;

            let grantee = match grantee {
                Some(raw) => parse_address("grantee", &raw)?,
                None => identity.ok_or(LedgerError::NotAuthenticated)?,
            };
            let record = RecordId::from(record);
            let expiry = ledger.check_access_expiry(&record, &grantee).await?;
            let now = clock.now();
            match format {
                Format::Json => output::print_json(&serde_json::json!({
                    "record": record,
                    "grantee": grantee,
                    "expiry_time": expiry,
                    "remaining_time": format_remaining_time(expiry - now),
                }))?,
                Format::Table => println!(
                    "{} for {}: expires {} ({})",
                    record,
                    grantee,
                    output::timestamp(expiry),
                    format_remaining_time(expiry - now)
                ),
            }
        }
        Commands::History { record: Some(record), all: false } => {
            let history = fetch_access_history(ledger.as_ref(), &RecordId::from(record)).await?;
            output::print_record_history(&history, clock.now(), format)?;
        }
        Commands::History { .. } => {
            let owner = identity.ok_or(LedgerError::NotAuthenticated)?;
            let history = fetch_global_history(ledger.as_ref(), ledger.as_ref(), &owner).await?;
            output::print_global_history(&history, clock.now(), format)?;
        }
        Commands::Open {
            gateway,
            passphrase,
            out,
        } => {
            let mut view = SharedRecordsView::new(ledger.clone(), ledger, clock.clone(), identity);
            let now = clock.now();
            let live: Vec<_> = view
                .refresh()
                .await?
                .iter()
                .filter(|r| !r.is_expired(now))
                .cloned()
                .collect();

            let store = GatewayBlobStore::new(&gateway, config.request_timeout())?;
            let key = DocumentKey::derive(&passphrase, DOCUMENT_KEY_SALT);
            let documents = open_shared_documents(&store, &key, &live).await;

            std::fs::create_dir_all(&out).with_context(|| format!("cannot create {}", out.display()))?;
            for doc in &documents {
                let path = out.join(format!("{}.bin", sanitize_file_name(doc.record_id.as_str())));
                std::fs::write(&path, &doc.plaintext)
                    .with_context(|| format!("cannot write {}", path.display()))?;
            }
            eprintln!("Decrypted {} of {} shared documents into {}", documents.len(), live.len(), out.display());
        }
    }

    Ok(())
}

fn needs_identity(command: &Commands) -> bool {
    match command {
        Commands::Shared { .. } | Commands::Grant { .. } | Commands::Revoke { .. } | Commands::Open { .. } => true,
        Commands::Expiry { grantee, .. } => grantee.is_none(),
        Commands::History { all, .. } => *all,
    }
}

/// Config file if given, otherwise flags with `MEDSHARE_*` environment fallback
fn load_config(cli: &Cli) -> anyhow::Result<LedgerConfig> {
    if let Some(path) = &cli.config {
        return LedgerConfig::from_json_file(path)
            .with_context(|| format!("loading ledger config from {}", path.display()));
    }
    let config = LedgerConfig::from_lookup(|key| match key {
        RPC_URL_VAR => cli.rpc_url.clone(),
        ACCESS_CONTRACT_VAR => cli.access_contract.clone(),
        CATALOG_CONTRACT_VAR => cli.catalog_contract.clone(),
        other => std::env::var(other).ok(),
    })?;
    Ok(config)
}

fn parse_identity(raw: Option<&str>) -> anyhow::Result<Option<Address>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_address("identity", s))
        .transpose()
}

fn parse_address(what: &str, raw: &str) -> anyhow::Result<Address> {
    raw.parse()
        .with_context(|| format!("{} must be a 0x-prefixed 20-byte address", what))
}

/// Resolve once `signal` reports an interrupt
///
/// If the handler cannot be installed the error is logged and this never
/// resolves, so watch mode keeps running until the process is killed.
async fn wait_for_interrupt<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("interrupt received; stopping"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C; watch runs until killed");
            std::future::pending::<()>().await;
        }
    }
}

fn sanitize_file_name(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
