use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mastering_toolkit::model::file_identity;
use mastering_toolkit::orchestrator::{ChannelObserver, LoggingObserver};
use mastering_toolkit::render::RenderConfig;
use mastering_toolkit::{
    AnalysisConfig, AnalysisEvent, AnalysisOrchestrator, AnalysisParams, AnalysisResult,
    SymphoniaEngine,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// File extensions picked up when walking a directory
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac"];

#[derive(Parser, Debug)]
#[command(name = "mastering-toolkit")]
#[command(about = "Analyze tempo, amplitude and energy of audio files", long_about = None)]
struct Args {
    /// Audio files or directories to analyze
    inputs: Vec<String>,

    /// Text file listing audio paths, one per line (# and ; start comments)
    #[arg(long)]
    list: Option<String>,

    /// Rolling RMS window length in seconds
    #[arg(short = 'w', long, default_value = "10")]
    window: u32,

    /// Rolling RMS hop length in seconds
    #[arg(long, default_value = "2")]
    hop: u32,

    /// Minimum BPM for tempo folding (default: 70)
    #[arg(long, default_value = "70")]
    min_bpm: f32,

    /// Maximum BPM for tempo folding (default: 170)
    #[arg(long, default_value = "170")]
    max_bpm: f32,

    /// Seconds of audio used for tempo detection
    #[arg(long, default_value = "120")]
    tempo_seconds: u32,

    /// Seconds to wait for each file before giving up
    #[arg(long, default_value = "600")]
    timeout: u64,

    /// Save a power plot PNG per analyzed file into this directory
    #[arg(long)]
    plot_dir: Option<PathBuf>,

    /// Plot width in pixels
    #[arg(long, default_value = "1000")]
    plot_width: u32,

    /// Plot height in pixels
    #[arg(long, default_value = "400")]
    plot_height: u32,

    /// Print results as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Logging verbosity
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Verbose logging (same as --log-level debug)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let files = collect_inputs(&args)?;
    if files.is_empty() {
        anyhow::bail!("No audio files to analyze");
    }
    log::info!("Analyzing {} file(s)", files.len());

    let render = RenderConfig {
        width: args.plot_width,
        height: args.plot_height,
        ..RenderConfig::default()
    };
    let config = AnalysisConfig::new()
        .with_params(AnalysisParams::new(args.window, args.hop))
        .with_bpm_range(args.min_bpm, args.max_bpm)
        .with_tempo_seconds(args.tempo_seconds)
        .with_render(render);

    log::info!("Energy profile: {}", config.params);
    log::info!("BPM detection range: {}-{} BPM", config.min_bpm, config.max_bpm);

    let engine = SymphoniaEngine::from_config(&config);
    let mut orchestrator = AnalysisOrchestrator::from_config(engine, &config);

    let (tx, rx) = crossbeam_channel::unbounded();
    orchestrator.subscribe(LoggingObserver);
    orchestrator.subscribe(ChannelObserver::new(tx));

    let timeout = Duration::from_secs(args.timeout);
    let mut results = Vec::with_capacity(files.len());

    for (i, path) in files.iter().enumerate() {
        log::info!("[{}/{}] {}", i + 1, files.len(), path.display());

        // Missing files come back as a Failed event on the channel
        if orchestrator.analyze(path).is_ok() && !orchestrator.wait_for_idle(timeout) {
            log::error!("Timed out after {}s analyzing {:?}", args.timeout, path);
            orchestrator.cancel();
            results.push(AnalysisResult::failed(
                file_identity(path),
                format!("Timed out after {}s", args.timeout),
            ));
        }

        for event in rx.try_iter() {
            match event {
                AnalysisEvent::Completed { result, .. } => results.push(result),
                AnalysisEvent::Failed { path, error, .. } => {
                    results.push(AnalysisResult::failed(file_identity(&path), error))
                }
                _ => {}
            }
        }
    }

    if let Some(plot_dir) = &args.plot_dir {
        save_plots(&orchestrator, &results, plot_dir)?;
    }

    if args.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        print_results(&results);
    }

    let succeeded = results.iter().filter(|r| r.succeeded).count();
    log::info!("{} of {} file(s) analyzed successfully", succeeded, results.len());

    if succeeded == 0 {
        anyhow::bail!("All {} file(s) failed analysis", results.len());
    }

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.verbose {
        args.log_level.max(LogLevel::Debug)
    } else {
        args.log_level
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_filter()));

    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file: {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    log::debug!("Logging initialized at {} level", level.as_filter());
    Ok(())
}

/// Expand inputs and the optional list file into audio file paths
fn collect_inputs(args: &Args) -> Result<Vec<PathBuf>> {
    let mut inputs = args.inputs.clone();

    if let Some(list) = &args.list {
        let list_path = expand(list);
        let content = std::fs::read_to_string(&list_path)
            .with_context(|| format!("Failed to read list file: {:?}", list_path))?;
        inputs.extend(parse_list(&content));
    }

    let mut files = Vec::new();
    for input in inputs {
        let path = expand(&input);
        if path.is_dir() {
            for entry in WalkDir::new(&path).follow_links(true).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_audio_file(entry.path()) => {
                        files.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("Skipping unreadable entry in {:?}: {}", path, e),
                }
            }
        } else {
            files.push(path);
        }
    }

    Ok(files)
}

fn expand(input: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(input).as_ref())
}

/// Non-empty lines that are not `#` or `;` comments
fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with(';'))
        .map(str::to_string)
        .collect()
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn save_plots<E>(
    orchestrator: &AnalysisOrchestrator<E>,
    results: &[AnalysisResult],
    plot_dir: &Path,
) -> Result<()>
where
    E: mastering_toolkit::AnalysisEngine + 'static,
{
    let mut plotted: HashSet<&str> = HashSet::new();
    let mut used_names: HashSet<String> = HashSet::new();

    for result in results.iter().filter(|r| r.succeeded) {
        // The same file listed twice has a single cached result
        if !plotted.insert(result.file_identity.as_str()) {
            continue;
        }
        let Some(artifact) = orchestrator.get_display_artifact(&result.file_identity) else {
            continue;
        };

        let png_path = plot_dir.join(plot_file_name(&result.file_identity, &mut used_names));
        artifact.save_png(&png_path)?;
        log::info!("Plot saved: {:?} (scale 0-{})", png_path, artifact.scale.max());
    }
    Ok(())
}

/// `<stem>.png`, suffixed with `-2`, `-3`, ... when the stem is already taken
fn plot_file_name(identity: &str, used: &mut HashSet<String>) -> String {
    let stem = Path::new(identity)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plot".to_string());

    let mut name = format!("{}.png", stem);
    let mut index = 1;
    while used.contains(&name) {
        index += 1;
        name = format!("{}-{}.png", stem, index);
    }
    used.insert(name.clone());
    name
}

fn print_results(results: &[AnalysisResult]) {
    for result in results {
        println!("== {}", result.file_identity);
        match &result.error {
            Some(error) => println!("{}", error),
            None => println!("{}", result.display_text()),
        }
        println!();
    }
}
