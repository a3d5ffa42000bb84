use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::time::{interval, Duration};

use imu_stream_rs::catalog;
use imu_stream_rs::device::{DEFAULT_HOST, DEFAULT_PORT};
use imu_stream_rs::{DeviceAddress, RateTracker, RecordingAggregator, StreamClient};

#[derive(Parser, Debug)]
#[command(name = "imu_stream")]
#[command(about = "Records IMU telemetry from a wearable rig over TCP", long_about = None)]
struct Args {
    /// Recording duration in seconds (0 = until Ctrl-C)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Rig IPv4 address
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Rig port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Output directory for exports
    #[arg(long, default_value = "recordings")]
    output_dir: String,

    /// Workout category index used to label the recording
    #[arg(long)]
    category: Option<usize>,

    /// Exercise index within the category
    #[arg(long)]
    exercise: Option<usize>,

    /// Catalog JSON file (defaults to the built-in catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let address = DeviceAddress::parse(&args.host, args.port)?;
    let catalog = match &args.catalog {
        Some(path) => catalog::load_catalog(path)?,
        None => catalog::builtin_catalog(),
    };
    let label = match (args.category, args.exercise) {
        (Some(category), Some(exercise)) => catalog::find_exercise(&catalog, category, exercise)
            .map(|ex| ex.name.clone())
            .unwrap_or_else(|| "freeform".to_string()),
        _ => "freeform".to_string(),
    };

    println!("[{}] IMU Stream starting", ts_now());
    println!("  Rig: {}", address);
    println!("  Exercise: {}", label);
    println!("  Duration: {} seconds (0=until Ctrl-C)", args.duration);
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let client = StreamClient::new(address);
    let tracker = RateTracker::new();
    let recorder = RecordingAggregator::new();
    client.add_listener(Arc::new(tracker.clone()));
    client.add_listener(Arc::new(recorder.clone()));

    recorder.start_recording()?;
    client.connect();

    let started = Utc::now();
    let mut ticker = interval(Duration::from_secs(1));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let elapsed = Utc::now().signed_duration_since(started).num_seconds().max(0) as u64;
                print_status(&client, &tracker, elapsed);
                if args.duration > 0 && elapsed >= args.duration {
                    println!("[{}] Duration reached, stopping...", ts_now());
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n[{}] Interrupted, stopping...", ts_now());
                break;
            }
        }
    }

    client.disconnect();
    recorder.stop_recording()?;

    let stamp = ts_now_clean();
    let file_label = label.to_lowercase().replace(' ', "_");
    let csv_path = PathBuf::from(&args.output_dir).join(format!("workout_{}_{}.csv", file_label, stamp));
    recorder.write_csv(&csv_path)?;

    let summary = recorder.summary(&label);
    let summary_path =
        PathBuf::from(&args.output_dir).join(format!("workout_{}_{}.json", file_label, stamp));
    std::fs::write(&summary_path, summary.to_json()?)?;

    println!("\n=== Final Stats ===");
    println!("Batches: {}", recorder.batch_count());
    println!("Samples: {}", recorder.sample_count());
    let totals = tracker.cumulative_totals();
    let mut ids: Vec<u8> = totals.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        println!("  IMU {}: {} samples", id, totals[&id]);
    }
    println!("Export: {}", csv_path.display());
    println!("Summary: {}", summary_path.display());

    Ok(())
}

fn print_status(client: &StreamClient, tracker: &RateTracker, elapsed: u64) {
    let link = if client.is_connected() { "up" } else { "down" };
    let rates = tracker.current_rates();
    let totals = tracker.cumulative_totals();

    let mut ids: Vec<u8> = totals.keys().copied().collect();
    ids.sort_unstable();
    if ids.is_empty() {
        println!("[{}] {:>4}s link {} | no samples yet", ts_now(), elapsed, link);
        return;
    }

    let per_imu: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                "IMU {}: {} Hz ({} total)",
                id,
                rates.get(id).copied().unwrap_or(0),
                totals.get(id).copied().unwrap_or(0),
            )
        })
        .collect();
    println!(
        "[{}] {:>4}s link {} | {}",
        ts_now(),
        elapsed,
        link,
        per_imu.join(" | ")
    );
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
