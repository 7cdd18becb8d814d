use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hardsub::{
    load_config, EngineConfig, JobConfig, JobManager, JobPhase, JobStatus, LogFormat,
    PageSegMode,
};
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Parser)]
#[command(
    name = "hardsub",
    version,
    about = "Extract burned-in subtitles from a region of a video"
)]
struct Cli {
    /// Engine configuration file (.yaml, .yml or .json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the job data directory.
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Show debug logging.
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload a video and list its preview thumbnails.
    Thumbnails {
        /// Input video path.
        video: PathBuf,
    },

    /// Run a full extraction and write the transcript.
    Extract {
        /// Input video path.
        video: PathBuf,

        /// Subtitle region as x,y,width,height in frame pixels.
        #[arg(long, value_parser = parse_roi)]
        roi: RoiArg,

        /// Preview frame timestamp in seconds.
        #[arg(long)]
        frame: Option<f64>,

        /// Page segmentation mode: 6 (block) or 7 (single line).
        #[arg(long, default_value_t = 6)]
        psm: i32,

        /// Keep only lines that are predominantly Hangul.
        #[arg(long)]
        korean_only: bool,

        /// Allow Latin text and recognize with Korean+English.
        #[arg(long)]
        include_english: bool,

        /// Sample the whole video instead of the configured first seconds.
        #[arg(long)]
        no_limit: bool,

        /// Keep the pre- and post-filter masks in the job directory.
        #[arg(long)]
        debug: bool,

        /// Write the transcript here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the final job snapshot as JSON on stderr.
        #[arg(long)]
        status_json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoiArg {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

fn parse_roi(value: &str) -> Result<RoiArg, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected x,y,width,height, got '{}'", value));
    }

    let mut numbers = [0i64; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("'{}' is not an integer", part))?;
    }

    let [x, y, width, height] = numbers;
    if width <= 0 || height <= 0 {
        return Err(format!(
            "width and height must be positive, got {}x{}",
            width, height
        ));
    }
    Ok(RoiArg {
        x,
        y,
        width,
        height,
    })
}

fn engine_config(cli: &Cli) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

fn run_thumbnails(manager: &JobManager, video: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let job_id = manager.upload(video)?;
    let job = manager.get_status(&job_id)?;

    println!("job       {}", job.id);
    println!("duration  {:.2}s", job.duration);
    for thumb in &job.thumbnails {
        println!("{:>6}s  {}", thumb.timestamp, thumb.path.display());
    }
    if job.thumbnails.is_empty() {
        eprintln!("no thumbnails could be decoded");
    }
    Ok(())
}

fn run_extract(
    manager: &Arc<JobManager>,
    video: &Path,
    roi: RoiArg,
    frame: Option<f64>,
    job_config: JobConfig,
    output: Option<&Path>,
    status_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = manager.subscribe();

    let job_id = manager.upload(video)?;
    log::info!("Created job {}", job_id);

    if let Some(secs) = frame {
        manager.select_frame(&job_id, secs)?;
    }
    manager.set_roi(&job_id, roi.x, roi.y, roi.width, roi.height)?;
    manager.start(&job_id, job_config)?;

    // Ctrl-C cancels the run; the loop below then sees the cancelled event
    {
        let manager = Arc::clone(manager);
        let job_id = job_id.clone();
        ctrlc::set_handler(move || {
            if let Err(e) = manager.cancel(&job_id) {
                log::warn!("Failed to cancel job {}: {}", job_id, e);
            }
        })?;
    }

    let mut stderr = std::io::stderr();
    loop {
        match events.blocking_recv() {
            Ok(event) if event.job_id == job_id => {
                if event.phase == JobPhase::Sampling && event.total > 0 {
                    let _ = write!(stderr, "\rsample {}/{}", event.current, event.total);
                    let _ = stderr.flush();
                }
                if event.is_terminal() {
                    let _ = writeln!(stderr);
                    break;
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                log::debug!("Progress stream lagged by {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    let job = manager.get_status(&job_id)?;
    if status_json {
        eprintln!("{}", serde_json::to_string_pretty(&job)?);
    }

    match job.status {
        JobStatus::Done => {
            let transcript = manager.download_result(&job_id)?;
            match output {
                Some(path) => {
                    std::fs::write(path, &transcript)?;
                    eprintln!(
                        "{} lines ({} raw) written to {}",
                        job.cleaned_line_count,
                        job.raw_line_count,
                        path.display()
                    );
                }
                None => {
                    let mut stdout = std::io::stdout();
                    stdout.write_all(&transcript)?;
                    if !transcript.is_empty() {
                        writeln!(stdout)?;
                    }
                }
            }
            Ok(())
        }
        JobStatus::Cancelled => Err("extraction was cancelled".into()),
        _ => Err(job
            .error
            .unwrap_or_else(|| format!("job ended in state {}", job.status))
            .into()),
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let default_filter = if cli.verbose { "debug" } else { "info" };
    hardsub::init_tracing(default_filter, format)?;

    let mut config = engine_config(&cli)?;

    match cli.command {
        Commands::Thumbnails { ref video } => {
            let manager = JobManager::new(config);
            let result = run_thumbnails(&manager, video);
            manager.shutdown();
            result
        }
        Commands::Extract {
            ref video,
            roi,
            frame,
            psm,
            korean_only,
            include_english,
            no_limit,
            debug,
            ref output,
            status_json,
        } => {
            if debug {
                config.debug_artifacts = true;
            }
            let job_config = JobConfig {
                psm: PageSegMode::from_i32(psm),
                korean_only,
                include_english,
                limit_duration: !no_limit,
            };

            let manager = Arc::new(JobManager::new(config));
            let result = run_extract(
                &manager,
                video,
                roi,
                frame,
                job_config,
                output.as_deref(),
                status_json,
            );
            manager.shutdown();
            result
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
