use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use framescrub::{
    DisplayFrame, FitMode, FsFetcher, PaintDecision, ScrubSession, StreamConfig, Viewport,
    paint_frame,
};

#[derive(Parser, Debug)]
#[command(name = "framescrub", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every frame with the staggered bulk loader and report progress.
    Preload(PreloadArgs),
    /// Scroll to a progress value and paint the resulting frame as a PNG.
    Scrub(ScrubArgs),
}

#[derive(Parser, Debug)]
struct PreloadArgs {
    /// Stream config JSON.
    #[arg(long)]
    config: PathBuf,

    /// Directory frame locators are resolved against (defaults to the config's directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Give up after this many milliseconds.
    #[arg(long, default_value_t = 120_000)]
    timeout_ms: u64,
}

#[derive(Parser, Debug)]
struct ScrubArgs {
    /// Stream config JSON.
    #[arg(long)]
    config: PathBuf,

    /// Directory frame locators are resolved against (defaults to the config's directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Scroll progress in [0, 1].
    #[arg(long)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// How the frame is fitted into the viewport.
    #[arg(long, value_enum, default_value_t = FitArg::Contain)]
    fit: FitArg,

    /// How long to wait for the exact frame before painting the nearest one.
    #[arg(long, default_value_t = 5_000)]
    wait_ms: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FitArg {
    Contain,
    Cover,
}

impl From<FitArg> for FitMode {
    fn from(v: FitArg) -> Self {
        match v {
            FitArg::Contain => FitMode::Contain,
            FitArg::Cover => FitMode::Cover,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Preload(args) => cmd_preload(args),
        Command::Scrub(args) => cmd_scrub(args),
    }
}

fn open_session(config: &Path, root: Option<PathBuf>) -> anyhow::Result<ScrubSession> {
    let cfg = StreamConfig::from_path(config)?;
    let root = root.unwrap_or_else(|| {
        config
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });
    Ok(ScrubSession::new(cfg, Arc::new(FsFetcher::new(root)))?)
}

fn cmd_preload(args: PreloadArgs) -> anyhow::Result<()> {
    let mut sess = open_session(&args.config, args.root)?;
    let deadline = Instant::now() + Duration::from_millis(args.timeout_ms);

    sess.start_bulk_load();
    let mut last_percent = None;
    loop {
        sess.poll_bulk_load();
        let wait = sess
            .bulk_load()
            .and_then(|b| b.next_due_at())
            .map(|due| due.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(50))
            .clamp(Duration::from_millis(1), Duration::from_millis(50));
        sess.pump_wait(wait);

        let p = sess.progress();
        if last_percent != Some(p.percent()) {
            eprintln!("loaded {}/{} ({}%)", p.loaded, p.total, p.percent());
            last_percent = Some(p.percent());
        }

        if sess.bulk_load_released() && !sess.has_pending() {
            break;
        }
        if Instant::now() >= deadline {
            anyhow::bail!(
                "preload timed out after {} ms ({}/{} frames loaded)",
                args.timeout_ms,
                p.loaded,
                p.total
            );
        }
    }

    let stats = sess.stats();
    let p = sess.progress();
    sess.teardown();
    if !p.is_complete() {
        anyhow::bail!(
            "{} of {} frames failed to load ({} failure reports)",
            p.total - p.loaded,
            p.total,
            stats.frames_failed
        );
    }
    eprintln!("all {} frames loaded", p.total);
    Ok(())
}

fn cmd_scrub(args: ScrubArgs) -> anyhow::Result<()> {
    let viewport = Viewport::new(args.width, args.height)?;
    let mut sess = open_session(&args.config, args.root)?;
    let deadline = Instant::now() + Duration::from_millis(args.wait_ms);

    let mut best: Option<DisplayFrame> = None;
    let mut decision = sess.scroll_to(args.progress);
    loop {
        if let PaintDecision::Paint(f) = decision {
            best = Some(f);
        }
        if best.as_ref().is_some_and(DisplayFrame::is_exact) || !sess.has_pending() {
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sess.pump_wait(deadline - now);
        decision = sess.refresh();
    }

    let frame = best.with_context(|| {
        format!(
            "no frame available within {} ms for progress {}",
            args.wait_ms, args.progress
        )
    })?;
    let canvas = paint_frame(&frame.image, viewport, args.fit.into());

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &canvas.data,
        canvas.width,
        canvas.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    sess.teardown();
    eprintln!(
        "wrote {} (frame {} for requested {})",
        args.out.display(),
        frame.shown,
        frame.requested
    );
    Ok(())
}
