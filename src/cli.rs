use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::engine::CommandEngine;
use crate::export;
use crate::session::Session;
use crate::share;
use crate::storage::{FileStorage, MemoryStorage};
use crate::theme::ThemeId;

#[derive(Parser, Debug)]
#[command(
    name = "mmlive",
    version,
    about = "Live Mermaid render pipeline: debounced re-render, error recovery, export"
)]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a diagram file once through the pipeline
    Render(RenderArgs),
    /// Watch a diagram file and re-render on every change
    Watch(WatchArgs),
    /// Encode source text into a share fragment, or decode one
    Share(ShareArgs),
}

#[derive(clap::Args, Debug)]
struct PipelineArgs {
    /// Renderer binary, mermaid-cli compatible (-i in -o out [-c config])
    #[arg(long = "engine", default_value = "mmdc")]
    engine: PathBuf,

    /// Extra argument passed through to the renderer (repeatable)
    #[arg(long = "engine-arg")]
    engine_args: Vec<String>,

    /// Theme from the fixed catalog (notion, sketch)
    #[arg(short = 't', long = "theme", default_value = "notion")]
    theme: String,

    /// Orchestration config file (relaxed JSON)
    #[arg(short = 'c', long = "configFile")]
    config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Input file (.mmd) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    output_format: OutputFormat,

    /// PNG raster scale (defaults to the configured export scale)
    #[arg(long = "scale")]
    scale: Option<f32>,
}

#[derive(clap::Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Diagram file to watch
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// SVG file kept up to date with the last successful render
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Session state file (last source + history)
    #[arg(long = "state-file", default_value = ".mmlive/state.json")]
    state_file: PathBuf,

    /// File poll interval in milliseconds
    #[arg(long = "poll-ms", default_value_t = 100)]
    poll_ms: u64,
}

#[derive(clap::Args, Debug)]
struct ShareArgs {
    /// Decode the given fragment instead of encoding
    #[arg(long = "decode")]
    decode: Option<String>,

    /// Input file or '-' for stdin (encode mode)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let args = Args::parse();
    match args.command {
        Command::Render(args) => render_once(args),
        Command::Watch(args) => watch(args),
        Command::Share(args) => share_tool(args),
    }
}

fn build_session(
    pipeline: &PipelineArgs,
    storage: Box<dyn crate::storage::Storage>,
    now: Instant,
) -> Result<Session<CommandEngine>> {
    let config = load_config(pipeline.config.as_deref())?;
    let theme = ThemeId::parse(&pipeline.theme)
        .with_context(|| format!("unknown theme '{}'", pipeline.theme))?;
    let engine =
        CommandEngine::new(&pipeline.engine).with_args(pipeline.engine_args.iter().cloned());
    let mut session = Session::new(engine, storage, config, now, unix_millis());
    if theme != session.active_theme() {
        session.switch_theme(theme, now);
    }
    Ok(session)
}

fn render_once(args: RenderArgs) -> Result<()> {
    let now = Instant::now();
    let mut session = build_session(&args.pipeline, Box::new(MemoryStorage::default()), now)?;

    let source = read_input(args.input.as_deref())?;
    session.update_source(&source, now);
    if !session.flush(now) {
        anyhow::bail!("nothing to render: input is empty or whitespace-only");
    }
    if let Some(message) = session.error() {
        anyhow::bail!("render failed: {message}");
    }

    // Parity with interactive hosts: mount, measure, re-center.
    if let Some(dims) = measured(&session) {
        session.complete_layout(dims, dims);
    }

    match args.output_format {
        OutputFormat::Svg => {
            export::write_output_svg(session.export_svg()?, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            #[cfg(feature = "png")]
            {
                let output = args
                    .output
                    .as_deref()
                    .context("output path required for png output")?;
                let bytes = session.export_png(args.scale)?;
                std::fs::write(output, bytes)?;
            }
            #[cfg(not(feature = "png"))]
            {
                anyhow::bail!("built without the 'png' feature");
            }
        }
    }
    Ok(())
}

fn watch(args: WatchArgs) -> Result<()> {
    let now = Instant::now();
    let mut session = build_session(
        &args.pipeline,
        Box::new(FileStorage::new(&args.state_file)),
        now,
    )?;

    let fragment = None;
    session.load_initial(fragment, now);

    let mut last_seen: Option<String> = None;
    tracing::info!(input = %args.input.display(), output = %args.output.display(), "watching");

    loop {
        let now = Instant::now();

        match std::fs::read_to_string(&args.input) {
            Ok(contents) => {
                if last_seen.as_deref() != Some(contents.as_str()) {
                    session.update_source(&contents, now);
                    last_seen = Some(contents);
                }
            }
            Err(err) => {
                tracing::warn!(%err, path = %args.input.display(), "input unreadable, keeping last state");
            }
        }

        if session.run_due(now) {
            if let Some(message) = session.error() {
                eprintln!("render error: {message}");
            } else {
                let mut dims = None;
                if let Some(markup) = session.markup() {
                    export::write_output_svg(markup, Some(&args.output))?;
                    dims = Some(export::resolve_dimensions(markup, session.export_fallback()));
                }
                if let Some(dims) = dims {
                    session.complete_layout(dims, dims);
                    tracing::info!(width = dims.0 as f64, height = dims.1 as f64, "diagram updated");
                }
            }
        }

        std::thread::sleep(Duration::from_millis(args.poll_ms.max(10)));
    }
}

fn share_tool(args: ShareArgs) -> Result<()> {
    if let Some(fragment) = args.decode {
        let text = share::decode(&fragment).context("malformed share fragment")?;
        print!("{text}");
        return Ok(());
    }
    let source = read_input(args.input.as_deref())?;
    println!("{}", share::encode(&source));
    Ok(())
}

fn measured<E: crate::engine::DiagramEngine>(session: &Session<E>) -> Option<(f32, f32)> {
    session
        .markup()
        .map(|markup| export::resolve_dimensions(markup, session.export_fallback()))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
