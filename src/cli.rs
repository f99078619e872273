use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::models::{DashboardReport, Payload};
use crate::services::define_services;

#[derive(Parser)]
#[command(name = "flash")]
#[command(author, version, about = "CI build status dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file, used when FLASH_CONFIG is not set
    #[arg(short, long, global = true, env = "FLASH_CONFIG_FILE", default_value = "config.json")]
    config: PathBuf,

    /// Inline JSON configuration
    #[arg(long, global = true, env = "FLASH_CONFIG", hide_env_values = true)]
    config_json: Option<String>,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update services once and print the dashboard data
    Poll {
        /// Only update this service
        #[arg(short, long)]
        service: Option<String>,
    },
    /// Keep updating services on an interval
    Watch {
        /// Seconds between updates
        #[arg(short, long, default_value_t = 60)]
        interval: u64,

        /// Stop after this many updates
        #[arg(short, long)]
        rounds: Option<u64>,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = DashboardConfig::load(self.config_json.as_deref(), &self.config)?;
        info!(
            "Loaded project '{}' with {} services",
            config.project_name,
            config.services.len()
        );
        let mut dashboard = Dashboard::new(define_services(&config.services)?);

        match &self.command {
            Commands::Poll { service } => {
                let services = run_round(&mut dashboard, service.as_deref()).await;
                self.emit(&config, services)
            }
            Commands::Watch { interval, rounds } => {
                let mut ticker = tokio::time::interval(Duration::from_secs((*interval).max(1)));
                let mut round = 0;

                loop {
                    ticker.tick().await;
                    round += 1;
                    info!("Updating services (round {round})");

                    let services = run_round(&mut dashboard, None).await;
                    if dashboard.cache().is_empty() {
                        warn!("No service has produced data yet");
                    } else {
                        debug!("{} services cached", dashboard.cache().len());
                    }
                    self.emit(&config, services)?;

                    if rounds.is_some_and(|limit| round >= limit) {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn emit(&self, config: &DashboardConfig, services: IndexMap<String, Payload>) -> Result<()> {
        let json_output = render(config, services, self.pretty)?;

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Dashboard written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}

/// Update one named service, or all of them, and collect their payloads.
async fn run_round(dashboard: &mut Dashboard, service: Option<&str>) -> IndexMap<String, Payload> {
    match service {
        Some(name) => {
            let payload = dashboard.update_service(name).await;
            IndexMap::from([(name.to_string(), payload)])
        }
        None => dashboard.update_all().await,
    }
}

fn render(
    config: &DashboardConfig,
    services: IndexMap<String, Payload>,
    pretty: bool,
) -> Result<String> {
    let report = DashboardReport {
        project_name: config.project_name.clone(),
        style: config.style.clone(),
        services,
    };

    let json_output = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    Ok(json_output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn output_path(test: &str) -> PathBuf {
        std::env::temp_dir().join(format!("flash-{test}-{}.json", std::process::id()))
    }

    fn read_output(path: &PathBuf) -> Value {
        let text = std::fs::read_to_string(path).unwrap();
        std::fs::remove_file(path).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_parse_poll_with_service() {
        let cli = Cli::try_parse_from(["flash", "--pretty", "poll", "--service", "ci"]).unwrap();

        assert!(cli.pretty);
        assert!(matches!(
            cli.command,
            Commands::Poll { service: Some(ref name) } if name == "ci"
        ));
    }

    #[test]
    fn test_parse_watch_with_rounds() {
        let cli = Cli::try_parse_from(["flash", "watch", "--interval", "5", "--rounds", "3"]).unwrap();

        assert!(matches!(
            cli.command,
            Commands::Watch {
                interval: 5,
                rounds: Some(3)
            }
        ));
    }

    #[test]
    fn test_render_report_shape() {
        let config = DashboardConfig::from_json(r#"{"project_name": "Flash", "style": "night"}"#).unwrap();
        let services = IndexMap::from([("ci".to_string(), Payload::new())]);

        let output = render(&config, services, false).unwrap();

        assert_eq!(
            serde_json::from_str::<Value>(&output).unwrap(),
            json!({ "project_name": "Flash", "style": "night", "services": { "ci": {} } })
        );
    }

    #[tokio::test]
    async fn test_run_round_unknown_service_is_reported_empty() {
        let mut dashboard = Dashboard::new(define_services(&[]).unwrap());

        let services = run_round(&mut dashboard, Some("ci")).await;

        assert_eq!(services.len(), 1);
        assert!(services["ci"].is_empty());
    }

    #[tokio::test]
    async fn test_execute_poll_service_writes_report() {
        let path = output_path("poll");
        let cli = Cli::try_parse_from([
            "flash",
            "--config-json",
            r#"{"project_name": "Flash"}"#,
            "--output",
            path.to_str().unwrap(),
            "poll",
            "--service",
            "ci",
        ])
        .unwrap();

        cli.execute().await.unwrap();

        assert_eq!(
            read_output(&path),
            json!({ "project_name": "Flash", "style": "default", "services": { "ci": {} } })
        );
    }

    #[tokio::test]
    async fn test_execute_watch_stops_after_rounds() {
        let path = output_path("watch");
        let cli = Cli::try_parse_from([
            "flash",
            "--config-json",
            r#"{"project_name": "Flash"}"#,
            "--output",
            path.to_str().unwrap(),
            "watch",
            "--interval",
            "1",
            "--rounds",
            "2",
        ])
        .unwrap();

        cli.execute().await.unwrap();

        assert_eq!(
            read_output(&path),
            json!({ "project_name": "Flash", "style": "default", "services": {} })
        );
    }
}
