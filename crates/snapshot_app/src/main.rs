mod cli;
mod config;
mod logging;

use anyhow::Context;
use clap::Parser;
use monitor_logging::monitor_error;
use snapshot_engine::{
    MonitorSettings, ReqwestFetcher, RunOutcome, SnapshotMonitor, SnapshotStore,
};

use crate::cli::{Cli, Command};
use crate::config::MonitorConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let config = MonitorConfig::load(&cli.config)?.apply(cli.overrides())?;
    let store = SnapshotStore::new(config.store_layout());

    match cli.command {
        None => {
            let outcome = run_cycle(&config, store)?;
            println!("{}", outcome.status_message());
            println!("{}", outcome.diff_reference());
        }
        Some(Command::History) => {
            for date in store.archived_dates()? {
                println!("{date}");
            }
        }
        Some(Command::Show { date, raw }) => {
            let snapshot = store
                .load_dated(date)?
                .with_context(|| format!("no snapshot archived for {date}"))?;
            if raw {
                print!("{}", snapshot.content);
            } else {
                println!("{}", snapshot.diff.unwrap_or_default());
            }
        }
        Some(Command::Config) => {
            println!("{}", config.to_ron()?);
        }
    }
    Ok(())
}

fn run_cycle(config: &MonitorConfig, store: SnapshotStore) -> anyhow::Result<RunOutcome> {
    let fetcher = ReqwestFetcher::new(config.fetch_settings());
    let settings = MonitorSettings {
        url: config.url.clone(),
    };
    SnapshotMonitor::new(fetcher, store, settings)
        .run_blocking()
        .inspect_err(|err| monitor_error!("Monitoring run failed: {}", err))
        .with_context(|| format!("monitoring {} failed", config.url))
}
