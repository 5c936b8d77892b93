///
/// This module implements the CLI interface for tidepool-sync: command parsing,
/// config loading, client construction and the user-visible summary.
///
/// All sync logic (models, builders, pipelines) lives in the [`tidepool-sync-core`] crate.
/// This module is strictly CLI glue.
///
/// ## How To Use
/// - From the shell: `tidepool-sync sync --config sync.yaml [--since ..] [--till ..] [--only ..]`.
/// - Programmatically/in tests: call [`run`] with a constructed [`Cli`].
///
/// [`tidepool-sync-core`]: ../../tidepool-sync-core/
use crate::load_config::load_config;
use crate::nightscout_client::NightscoutClient;
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tidepool_sync_core::synchronise::{sync_profiles, sync_treatments, synchronise};
use tidepool_sync_core::tidepool_client::TidepoolClient;

/// CLI for tidepool-sync: copy Tidepool pump settings and treatments to Nightscout.
#[derive(Parser)]
#[clap(
    name = "tidepool-sync",
    version,
    about = "Sync Tidepool pump settings, boluses, food and activity into Nightscout"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize the configured window from Tidepool to Nightscout
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Start of the window (RFC 3339), overrides the config file
        #[clap(long)]
        since: Option<DateTime<Utc>>,
        /// End of the window (RFC 3339), overrides the config file
        #[clap(long)]
        till: Option<DateTime<Utc>>,
        /// Run only one of the two pipelines
        #[clap(long, value_enum)]
        only: Option<Pipeline>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pipeline {
    Profiles,
    Treatments,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            config,
            since,
            till,
            only,
        } => {
            let mut config = load_config(config)?;
            if since.is_some() {
                config.sync.since = since;
            }
            if till.is_some() {
                config.sync.till = till;
            }
            tracing::info!(command = "sync", ?only, "Starting synchronisation process");

            let tidepool = TidepoolClient::login(
                &config.tidepool.base_url,
                &config.tidepool.username,
                &config.tidepool.password,
            )
            .await
            .map_err(|e| anyhow::Error::msg(format!("Tidepool login failed: {e}")))?;
            let nightscout =
                NightscoutClient::new(&config.nightscout.base_url, &config.nightscout.api_secret);

            let outcome = match only {
                Some(Pipeline::Profiles) => sync_profiles(&config.sync, &tidepool, &nightscout)
                    .await
                    .map(|profile| summary(profile.is_some(), None)),
                Some(Pipeline::Treatments) => {
                    sync_treatments(&config.sync, &tidepool, &nightscout)
                        .await
                        .map(|treatments| summary(false, Some(treatments.len())))
                }
                None => synchronise(&config.sync, &tidepool, &nightscout)
                    .await
                    .map(|report| {
                        summary(report.profile.is_some(), Some(report.treatments.len()))
                    }),
            };

            match outcome {
                Ok(summary) => {
                    tracing::info!(command = "sync", %summary, "Synchronisation complete");
                    println!("Synchronise complete: {summary}");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}

fn summary(profile_stored: bool, treatments: Option<usize>) -> String {
    let profile = if profile_stored {
        "profile stored"
    } else {
        "no profile stored"
    };
    match treatments {
        Some(count) => format!("{profile}, {count} treatments stored"),
        None => profile.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_mentions_what_ran() {
        assert_eq!(summary(true, Some(3)), "profile stored, 3 treatments stored");
        assert_eq!(summary(false, None), "no profile stored");
    }

    #[test]
    fn parses_sync_arguments() {
        let cli = Cli::parse_from([
            "tidepool-sync",
            "sync",
            "--config",
            "sync.yaml",
            "--since",
            "2021-03-01T00:00:00Z",
            "--only",
            "treatments",
        ]);
        let Commands::Sync {
            config,
            since,
            till,
            only,
        } = cli.command;
        assert_eq!(config, PathBuf::from("sync.yaml"));
        assert_eq!(since.map(|s| s.to_rfc3339()).as_deref(), Some("2021-03-01T00:00:00+00:00"));
        assert_eq!(till, None);
        assert_eq!(only, Some(Pipeline::Treatments));
    }
}
