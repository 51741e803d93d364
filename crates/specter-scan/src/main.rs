//! CLI entry point for the specter-scan network scanner.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use specter_scan::config::ScanConfig;
use specter_scan::enrich::ThreatChecker;
use specter_scan::probe::ArpScanner;
use specter_scan::publish::ScanPublisher;
use specter_scan::scheduler::{run_cycle, ScanScheduler};
use specter_scan::vendor::VendorDb;
use specter_store::{InventoryStore, MemoryStore};

#[derive(Parser)]
#[command(name = "specter-scan")]
#[command(about = "LAN discovery scanner for the Specter device inventory")]
struct Cli {
    /// Target to scan (CIDR notation, e.g., 192.168.1.0/24). Defaults to
    /// the inferred local /24.
    #[arg(short, long)]
    target: Option<String>,

    /// Run a single one-shot scan and exit.
    #[arg(long)]
    once: bool,

    /// Run as daemon with scheduled scans.
    #[arg(long)]
    daemon: bool,

    /// One-off IP reputation lookup and exit.
    #[arg(long)]
    check_ip: Option<IpAddr>,

    /// Config file prefix (default: specter).
    #[arg(short, long, default_value = "specter")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = load_scan_config(&cli.config)?;
    if let Some(target) = cli.target.clone() {
        config.subnet = Some(target);
    }
    if config.vt_api_key.is_none() {
        config.vt_api_key = std::env::var("VT_API_KEY").ok();
    }

    if let Some(ip) = cli.check_ip {
        let checker = ThreatChecker::new(config.vt_api_key.clone());
        let verdict = checker.check(ip).await;
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    let vendor_db = VendorDb::load();
    let scanner = ArpScanner::new(Duration::from_millis(config.probe_timeout_ms));
    let store: Arc<dyn InventoryStore> = Arc::new(MemoryStore::new());
    let publisher = ScanPublisher::new(config.event_capacity);

    if cli.once {
        let outcome = run_cycle(
            &scanner,
            &vendor_db,
            store.as_ref(),
            &publisher,
            &config,
        )
        .await?;
        println!(
            "Scan complete. Found {} devices. Anomaly: {}",
            outcome.count, outcome.is_anomaly
        );
    } else if cli.daemon {
        let scheduler = ScanScheduler::new(config, scanner, vendor_db, store, publisher);
        scheduler.run().await?;
    } else {
        anyhow::bail!("Specify --once (one-shot scan), --daemon (scheduled scanning), or --check-ip");
    }

    Ok(())
}

fn load_scan_config(file_prefix: &str) -> anyhow::Result<ScanConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("SPECTER_SCAN")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<ScanConfig>("scan") {
        Ok(c) => Ok(c),
        Err(_) => Ok(ScanConfig::default()),
    }
}
