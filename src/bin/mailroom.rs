//! mailroom CLI: push mail items through the pipeline and watch them go.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use mailroom::config::{Config, PipelineConfig};
use mailroom::monitor::{Display, Instrumented, ProgressMonitor, StateBoard};
use mailroom::pipeline::{Pipeline, check_counts};
use mailroom::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "mailroom", version, about = "Task-based mail item pipeline")]
struct Cli {
    /// Number of mail items to process
    items: usize,
    /// Number of working threads, the main thread included
    workers: usize,
    /// Pipeline TOML config (overrides MAILROOM_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Multiplier applied to every simulated duration
    #[arg(long)]
    time_scale: Option<f64>,
    /// Refresh period of the live display in milliseconds
    #[arg(long)]
    display_interval_ms: Option<u64>,
    /// Do not run the live display thread
    #[arg(long)]
    no_display: bool,
    /// Log every item transition through the event journal
    #[arg(long)]
    journal: bool,
    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = check_counts(cli.items, cli.workers) {
        eprintln!("Invalid input parameter(s) value(s): {e}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let env = Config::from_env()?;
    let mut pipeline_config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => env.pipeline()?,
    };
    if let Some(scale) = cli.time_scale {
        pipeline_config.time_scale = scale;
    }
    if let Some(ms) = cli.display_interval_ms {
        pipeline_config.display_interval_ms = ms;
    }
    pipeline_config.validate()?;

    // The OTLP exporters run on tokio; the workers are plain threads.
    let runtime = match env.otel_endpoint {
        Some(_) => Some(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("mailroom-otel")
                .enable_all()
                .build()?,
        ),
        None => None,
    };
    let _runtime = runtime.as_ref().map(|rt| rt.enter());

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: env.otel_endpoint.clone(),
        service_name: "mailroom".to_string(),
        log_level: env.log_level.clone(),
    })?;

    println!(
        "Starting with {} items and {} threads",
        cli.items, cli.workers
    );

    let board = Arc::new(StateBoard::new(cli.workers));
    let monitor: Arc<dyn ProgressMonitor> = Arc::new(Instrumented::new(Arc::clone(&board)));
    let display = if cli.no_display {
        None
    } else {
        Some(Display::spawn(
            Arc::clone(&board),
            pipeline_config.display_interval(),
        )?)
    };

    let pipeline = Pipeline::new(pipeline_config, monitor).with_journal(cli.journal);
    let result = pipeline.run(cli.items, cli.workers);

    // Workers are joined by now (or never started); stop the display either way.
    if let Some(display) = display {
        display.stop()?;
    }
    let report = result?;

    if cli.json {
        let summary = serde_json::json!({
            "run_id": report.run_id,
            "items": report.items,
            "workers": report.workers,
            "delivered": report.delivered.len(),
            "elapsed_ms": report.elapsed.as_millis() as u64,
            "handled": report.handled,
            "action_queue": report.action_queue,
            "board": board.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", board.render());
        for (worker, handled) in &report.handled {
            println!("{worker:>4}  {handled:>6} tasks");
        }
        println!(
            "{} items mailed in {:.2}s",
            report.delivered.len(),
            report.elapsed.as_secs_f64()
        );
    }

    println!("Work finished, threads joined");
    Ok(())
}
