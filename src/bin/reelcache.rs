use std::{
    collections::BTreeSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use reelcache::{
    AllocatorStats, AnimationDriver, AnimationMetadata, Bitmap, Bounds, BufferAllocator,
    DefaultFramePreparer, Dimension, DriverOpts, DriverStats, DropFramesScheduler,
    FixedNumberStrategy, FrameCache, FramePreparerOpts, FrameRenderer, HeapAllocatorOpts,
    HeapBitmapAllocator, KeepLastFrameCache, LoopCount, LruFrameCache, LruFrameCacheOpts,
    LruFrameCacheStats, NoOpFrameCache, PixelFormat, PreparerStats, RecordingCanvas, ReelResult,
};

#[derive(Parser, Debug)]
#[command(name = "reelcache", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a synthetic animation through the frame cache and print draw statistics as JSON.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Simulation config JSON. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame cache policy.
    #[arg(long, value_enum)]
    cache: Option<CachePolicy>,

    /// Frames to prepare ahead of each draw (0 disables the preparer).
    #[arg(long)]
    look_ahead: Option<usize>,

    /// Number of display ticks to simulate.
    #[arg(long)]
    ticks: Option<usize>,

    /// Frames the synthetic renderer refuses to render (repeatable).
    #[arg(long = "fail-frame")]
    fail_frames: Vec<usize>,

    /// Write the last drawn frame as a PNG.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum CachePolicy {
    NoOp,
    KeepLast,
    Lru,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct SimulationConfig {
    frame_count: usize,
    frame_duration_ms: u32,
    loop_count: LoopCount,
    width: u32,
    height: u32,
    ticks: usize,
    tick_ms: u64,
    cache: CachePolicy,
    lru: LruFrameCacheOpts,
    look_ahead: usize,
    preparer: FramePreparerOpts,
    allocator: HeapAllocatorOpts,
    driver: DriverOpts,
    fail_frames: BTreeSet<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_count: 12,
            frame_duration_ms: 100,
            loop_count: LoopCount::Infinite,
            width: 64,
            height: 64,
            ticks: 48,
            tick_ms: 100,
            cache: CachePolicy::Lru,
            lru: LruFrameCacheOpts::default(),
            look_ahead: 2,
            preparer: FramePreparerOpts::default(),
            allocator: HeapAllocatorOpts::default(),
            driver: DriverOpts::default(),
            fail_frames: BTreeSet::new(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct SimulationReport {
    ticks_played: usize,
    driver: DriverStats,
    lru: Option<LruFrameCacheStats>,
    preparer: Option<PreparerStats>,
    allocator_before_close: AllocatorStats,
    allocator_after_close: AllocatorStats,
    cache_bytes: usize,
}

/// Renders a frame-tinted gradient; frames in `fail_frames` report failure.
struct GradientRenderer {
    width: u32,
    height: u32,
    frame_count: usize,
    fail_frames: BTreeSet<usize>,
}

impl FrameRenderer for GradientRenderer {
    fn render_frame(&self, frame: usize, target: &mut Bitmap) -> ReelResult<bool> {
        if self.fail_frames.contains(&frame) {
            return Ok(false);
        }
        let (w, h) = (target.width(), target.height());
        let format = target.format();
        let blue = (frame * 255 / self.frame_count.max(1)) as u8;
        let bpp = format.bytes_per_pixel();
        for (i, px) in target.pixels_mut().chunks_exact_mut(bpp).enumerate() {
            let x = (i as u32) % w;
            let y = (i as u32) / w;
            match format {
                PixelFormat::Alpha8 => px[0] = 255,
                PixelFormat::Rgba8 | PixelFormat::Rgba8Premul => {
                    px.copy_from_slice(&[(x * 255 / w) as u8, (y * 255 / h) as u8, blue, 255]);
                }
            }
        }
        Ok(true)
    }

    fn intrinsic_width(&self) -> Dimension {
        Dimension::from_px(self.width)
    }

    fn intrinsic_height(&self) -> Dimension {
        Dimension::from_px(self.height)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn read_config_json(path: &Path) -> anyhow::Result<SimulationConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let cfg: SimulationConfig =
        serde_json::from_reader(r).with_context(|| "parse simulation config JSON")?;
    Ok(cfg)
}

fn resolve_config(args: &SimulateArgs) -> anyhow::Result<SimulationConfig> {
    let mut cfg = match &args.config {
        Some(path) => read_config_json(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(cache) = args.cache {
        cfg.cache = cache;
    }
    if let Some(look_ahead) = args.look_ahead {
        cfg.look_ahead = look_ahead;
    }
    if let Some(ticks) = args.ticks {
        cfg.ticks = ticks;
    }
    cfg.fail_frames.extend(args.fail_frames.iter().copied());
    if cfg.frame_count == 0 {
        anyhow::bail!("simulation needs at least one frame");
    }
    Ok(cfg)
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let cfg = resolve_config(&args)?;

    let metadata = AnimationMetadata::uniform(
        cfg.frame_count,
        cfg.frame_duration_ms,
        cfg.loop_count,
        Dimension::from_px(cfg.width),
        Dimension::from_px(cfg.height),
    );
    metadata.validate()?;
    let renderer = Arc::new(GradientRenderer {
        width: cfg.width,
        height: cfg.height,
        frame_count: cfg.frame_count,
        fail_frames: cfg.fail_frames.clone(),
    });
    let allocator = HeapBitmapAllocator::new(cfg.allocator);
    let lru = (cfg.cache == CachePolicy::Lru).then(|| Arc::new(LruFrameCache::new(cfg.lru)));
    let cache: Arc<dyn FrameCache> = match (&lru, cfg.cache) {
        (Some(lru), _) => Arc::clone(lru) as Arc<dyn FrameCache>,
        (None, CachePolicy::KeepLast) => Arc::new(KeepLastFrameCache::new()),
        (None, _) => Arc::new(NoOpFrameCache),
    };
    let scheduler = DropFramesScheduler::new(&metadata);

    let mut driver = AnimationDriver::new(
        Arc::new(metadata),
        renderer,
        cache,
        Arc::new(allocator.clone()) as Arc<dyn BufferAllocator>,
        cfg.driver,
    );
    driver.set_bounds(Some(Bounds::from_size(cfg.width, cfg.height)));

    let preparer = if cfg.look_ahead > 0 {
        let preparer = Arc::new(DefaultFramePreparer::new(cfg.preparer)?);
        driver = driver.with_preparation(
            Arc::new(FixedNumberStrategy::new(cfg.look_ahead)),
            preparer.clone(),
        );
        driver.preload_animation();
        Some(preparer)
    } else {
        None
    };

    let mut canvas = if args.out.is_some() {
        RecordingCanvas::keeping_last_bitmap()
    } else {
        RecordingCanvas::new()
    };
    let mut ticks_played = 0;
    for tick in 0..cfg.ticks {
        let now_ms = tick as u64 * cfg.tick_ms;
        let Some(frame) = scheduler.frame_number_to_render(now_ms) else {
            tracing::info!(tick, now_ms, "animation finished");
            break;
        };
        // The preparer gets the whole tick interval to catch up.
        if let Some(preparer) = &preparer {
            preparer.wait_until_idle();
        }
        driver.draw_frame(&mut canvas, frame);
        ticks_played += 1;
    }
    if let Some(preparer) = &preparer {
        preparer.wait_until_idle();
    }

    let allocator_before_close = allocator.stats();
    let cache_bytes = driver.size_in_bytes();
    let driver_stats = driver.stats();
    driver.close();

    let report = SimulationReport {
        ticks_played,
        driver: driver_stats,
        lru: lru.as_ref().map(|c| c.stats()),
        preparer: preparer.as_ref().map(|p| p.stats()),
        allocator_before_close,
        allocator_after_close: allocator.stats(),
        cache_bytes,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(out) = &args.out {
        let bitmap = canvas
            .last_bitmap()
            .context("no frame was drawn, nothing to write")?;
        write_png(bitmap, out)?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn write_png(bitmap: &Bitmap, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    bitmap
        .to_rgba_image()?
        .save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))?;
    Ok(())
}
