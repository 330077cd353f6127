mod client;

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use fleet_core::duration::format_duration;
use fleet_core::registry::read_device_ids;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::client::FleetClient;

#[derive(Parser, Debug)]
#[command(name = "fleet", about = "Fleet metrics server CLI and device simulator")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Metrics server URL
    #[arg(short, long, env = "FLEET_URL", default_value = "http://localhost:6733", global = true)]
    url: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show server health
    Health,
    /// Send one heartbeat for a device
    Heartbeat {
        device_id: String,
        /// RFC 3339 timestamp (defaults to now)
        #[arg(long)]
        sent_at: Option<DateTime<Utc>>,
    },
    /// Report one upload duration for a device
    Upload {
        device_id: String,
        /// Upload duration in nanoseconds
        #[arg(long)]
        upload_time: i64,
        /// RFC 3339 timestamp (defaults to now)
        #[arg(long)]
        sent_at: Option<DateTime<Utc>>,
    },
    /// Show uptime and average upload time for a device
    Stats { device_id: String },
    /// Drive every device in a CSV list through several reporting rounds
    Simulate {
        /// Device list in the same format the server loads
        #[arg(long, default_value = fleet_core::DEFAULT_DEVICES_CSV)]
        csv: PathBuf,
        /// Number of reporting rounds
        #[arg(short, long, default_value = "5")]
        rounds: u32,
        /// Seconds between the `sent_at` of consecutive rounds
        #[arg(long, default_value = "60")]
        step_secs: i64,
        /// Real delay between rounds in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,
        /// Upload duration reported each round, in nanoseconds
        #[arg(long, default_value = "5000000000")]
        upload_time: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let client = FleetClient::new(&args.url)?;

    match args.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("Fleet Server");
            println!("══════════════════════════════");
            println!("  Status:   {}", health.status);
            println!("  Devices:  {}", health.devices);
            println!("  Uptime:   {}s", health.uptime_seconds);
        }
        Commands::Heartbeat { device_id, sent_at } => {
            let sent_at = sent_at.unwrap_or_else(Utc::now);
            client.heartbeat(&device_id, sent_at).await?;
            println!("Heartbeat recorded for {} at {}", device_id, sent_at.to_rfc3339());
        }
        Commands::Upload {
            device_id,
            upload_time,
            sent_at,
        } => {
            let sent_at = sent_at.unwrap_or_else(Utc::now);
            client.upload(&device_id, sent_at, upload_time).await?;
            println!(
                "Upload of {} recorded for {}",
                format_duration(upload_time),
                device_id
            );
        }
        Commands::Stats { device_id } => {
            println!("Device {}", device_id);
            println!("══════════════════════════════");
            print_stats(&client, &device_id).await?;
        }
        Commands::Simulate {
            csv,
            rounds,
            step_secs,
            interval_ms,
            upload_time,
        } => {
            let file = File::open(&csv)
                .with_context(|| format!("Failed to open device list {}", csv.display()))?;
            let devices = read_device_ids(file)?;
            info!(devices = devices.len(), rounds, "Starting simulation");

            simulate(&client, &devices, rounds, step_secs, interval_ms, upload_time).await?;

            println!("Simulation Results");
            println!("══════════════════════════════");
            for device_id in &devices {
                println!("  {}", device_id);
                print_stats(&client, device_id).await?;
            }
        }
    }

    Ok(())
}

async fn print_stats(client: &FleetClient, device_id: &str) -> anyhow::Result<()> {
    match client.stats(device_id).await? {
        Some(stats) => {
            println!("  Uptime:          {}%", stats.uptime);
            println!("  Avg upload time: {}", stats.avg_upload_time);
        }
        None => println!("  No data reported yet"),
    }
    Ok(())
}

/// Every round posts one heartbeat and one upload per device, all devices
/// in parallel. Timestamps advance by `step_secs` per round so uptime can
/// be exercised without waiting in real time.
async fn simulate(
    client: &FleetClient,
    devices: &[String],
    rounds: u32,
    step_secs: i64,
    interval_ms: u64,
    upload_time: i64,
) -> anyhow::Result<()> {
    let start = Utc::now();

    for round in 0..rounds {
        let sent_at = start + TimeDelta::seconds(step_secs * round as i64);
        let mut tasks = JoinSet::new();

        for device_id in devices {
            let client = client.clone();
            let device_id = device_id.clone();
            tasks.spawn(async move {
                client.heartbeat(&device_id, sent_at).await?;
                client.upload(&device_id, sent_at, upload_time).await?;
                anyhow::Ok(())
            });
        }

        let mut failures = 0;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined? {
                warn!(round, error = %e, "Device report failed");
                failures += 1;
            }
        }
        info!(round, devices = devices.len(), failures, "Round complete");

        if interval_ms > 0 && round + 1 < rounds {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }

    Ok(())
}
