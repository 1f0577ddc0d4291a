//! Campaign adaptation worker binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};

use adapt_media::{probe_asset, ExecutionBackend, FfmpegBackend};
use adapt_models::format::parse_custom_spec;
use adapt_models::{AdaptMode, BatchRequest, BatchStatus, CompositionOptions, QualityPreset, RoiGuidance};
use adapt_roi::{DisabledRoiProvider, FixedRoiProvider, GeminiConfig, GeminiRoiProvider, RoiProvider};
use adapt_worker::logging::init_tracing;
use adapt_worker::{package_archive, BatchOrchestrator, LoggingObserver, WorkerConfig};

#[derive(Debug, Parser)]
#[command(name = "adapt-worker", version, about = "Adapt campaign videos to LED, billboard and social formats")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Adapt one source video to one or more target formats
    Adapt(AdaptArgs),
    /// List the available target formats
    Formats(FormatsArgs),
}

#[derive(Debug, Args)]
struct FormatsArgs {
    /// Only list profiles close to this aspect ratio, e.g. `16:9`
    #[arg(long)]
    aspect: Option<String>,
}

#[derive(Debug, Args)]
struct AdaptArgs {
    /// Source video
    input: PathBuf,

    /// Target formats, comma separated (see `formats`)
    #[arg(short, long, value_delimiter = ',')]
    formats: Vec<String>,

    /// Custom target `[NAME=]WxH[@FPS]`, may be repeated
    #[arg(long = "custom")]
    custom: Vec<String>,

    /// Override every profile's default mode
    #[arg(short, long)]
    mode: Option<AdaptMode>,

    /// Fill pad bars with a blurred extension of the scene (fit only)
    #[arg(long)]
    blur_background: bool,

    /// Sharpen and boost contrast on the final frame
    #[arg(long)]
    legibility_boost: bool,

    /// ROI guidance: off, optional or required
    #[arg(long, default_value = "optional")]
    roi: RoiGuidance,

    /// Load ROI boxes from a JSON file instead of calling the vision API
    #[arg(long)]
    roi_file: Option<PathBuf>,

    /// Output directory (overrides ADAPT_OUTPUT_DIR)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Package succeeded outputs into `{batch_id}.zip`
    #[arg(long)]
    archive: bool,

    /// Maximum concurrent jobs (overrides ADAPT_MAX_JOBS)
    #[arg(long)]
    max_jobs: Option<usize>,

    /// Encoding quality (overrides ADAPT_QUALITY)
    #[arg(long)]
    quality: Option<QualityPreset>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let mut config = WorkerConfig::from_env();

    if let Some(addr) = &config.metrics_addr {
        adapt_worker::metrics::init_metrics(addr)?;
        info!("Metrics exporter listening on {}", addr);
    }

    match cli.command {
        Command::Formats(args) => {
            list_formats(&config, args.aspect.as_deref())?;
            Ok(())
        }
        Command::Adapt(args) => {
            if let Some(output) = &args.output {
                config.output_dir = output.clone();
            }
            if let Some(max_jobs) = args.max_jobs {
                config.max_concurrent_jobs = max_jobs.max(1);
            }
            if let Some(quality) = args.quality {
                config.quality = quality;
            }

            let status = adapt(config, args).await?;
            if status == BatchStatus::Failure {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn list_formats(config: &WorkerConfig, aspect: Option<&str>) -> anyhow::Result<()> {
    let registry = config.registry()?;
    if let Some(label) = aspect {
        for profile in registry.matching_aspect(label)? {
            println!("{:<18} {:>10} {}", profile.name, profile.dimensions(), profile.category.label());
        }
        return Ok(());
    }

    for (category, profiles) in registry.by_category() {
        println!("{}:", category.label());
        for profile in profiles {
            println!(
                "  {:<18} {:>10} @{:<3} {}",
                profile.name,
                profile.dimensions(),
                profile.fps,
                profile.description
            );
        }
    }
    Ok(())
}

async fn adapt(config: WorkerConfig, args: AdaptArgs) -> anyhow::Result<BatchStatus> {
    let mut formats = args.formats.clone();
    let mut extra = Vec::new();
    for spec in &args.custom {
        let profile = parse_custom_spec(spec).with_context(|| format!("invalid --custom {}", spec))?;
        formats.push(profile.name.clone());
        extra.push(profile);
    }
    if formats.is_empty() {
        anyhow::bail!("no target formats given, use --formats or --custom");
    }

    let registry = Arc::new(config.registry_with(extra)?);

    let asset = probe_asset(&args.input)
        .await
        .with_context(|| format!("failed to probe {}", args.input.display()))?;
    info!(
        source = %asset.display_name(),
        width = asset.width,
        height = asset.height,
        duration = asset.duration,
        "Probed source"
    );

    let roi_provider: Arc<dyn RoiProvider> = match (&args.roi, &args.roi_file) {
        (RoiGuidance::Disabled, _) => Arc::new(DisabledRoiProvider::with_reason("ROI guidance disabled")),
        (_, Some(path)) => Arc::new(
            FixedRoiProvider::from_json_file(path)
                .await
                .with_context(|| format!("failed to load ROI file {}", path.display()))?,
        ),
        (_, None) => {
            let gemini = GeminiConfig::from_env().with_work_dir(config.work_dir.clone());
            if gemini.api_key.is_none() {
                warn!("GOOGLE_API_KEY not set, ROI detection unavailable");
            }
            Arc::new(GeminiRoiProvider::new(gemini)?)
        }
    };

    let backend: Arc<dyn ExecutionBackend> = Arc::new(
        FfmpegBackend::new()
            .with_timeout(config.render_timeout.as_secs())
            .with_verify_output(config.verify_output),
    );

    let request = BatchRequest::new(asset, formats)
        .with_composition(CompositionOptions::new(args.blur_background, args.legibility_boost))
        .with_roi(args.roi)
        .with_sampling(config.sampling_rate, config.max_ai_frames);
    let request = match args.mode {
        Some(mode) => request.with_mode(mode),
        None => request,
    };

    let output_dir = config.output_dir.clone();
    let orchestrator = BatchOrchestrator::new(config, registry, roi_provider, backend);

    // Ctrl-C cancels the batch; finished jobs keep their outputs
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cancelling batch");
            let _ = cancel_tx.send(true);
        }
    });

    let result = orchestrator
        .run_with_cancel(request, Arc::new(LoggingObserver), cancel_rx)
        .await;

    for job in result.failed() {
        if let Some(failure) = &job.failure {
            error!(format = %job.format_name, kind = %failure.kind, "{}", failure.message);
        }
    }

    if args.archive {
        match result.archive_manifest() {
            Some(manifest) => {
                let archive_path = output_dir.join(format!("{}.zip", result.batch_id));
                package_archive(&manifest, &archive_path).await?;
                info!(archive = %archive_path.display(), "Archive written");
            }
            None => info!("Fewer than two formats succeeded, skipping archive"),
        }
    }

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(result.status)
}
