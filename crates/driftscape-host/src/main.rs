mod renderer;
mod source;
mod store;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use driftscape_core::kurbo::{Rect, Size, Vec2};
use driftscape_core::{
    AppMode, AppSettings, ClickThrough, Compositor, EventSource, FsImageLoader, InputEvent,
    InputQueue, Key, KeyEvent, LayerSettings, ParticlePresetSettings, ParticleType,
    virtual_display_bounds,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::renderer::{SummaryRenderer, write_summary};
use crate::source::SweepPointerSource;
use crate::store::{JsonSceneRepository, JsonSettingsStore};

#[derive(Debug, Parser)]
#[command(name = "driftscape")]
#[command(about = "Parallax wallpaper overlay compositor")]
struct Cli {
    /// Settings file.
    #[arg(short = 's', long = "settings", default_value = "driftscape.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Weather {
    None,
    Snow,
    Rain,
}

impl From<Weather> for ParticleType {
    fn from(weather: Weather) -> Self {
        match weather {
            Weather::None => ParticleType::None,
            Weather::Snow => ParticleType::Snow,
            Weather::Rain => ParticleType::Rain,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Drive the compositor headlessly and summarize each frame.
    Run {
        /// Number of render ticks.
        #[arg(long, default_value_t = 300)]
        ticks: u64,
        #[arg(long, default_value_t = 60.0)]
        fps: f64,
        /// Monitor rectangles as `x,y,w,h`; repeat for multi-monitor.
        #[arg(long = "monitor", value_parser = parse_monitor)]
        monitors: Vec<Rect>,
        /// Sleep between ticks to match `fps`.
        #[arg(long)]
        realtime: bool,
        /// Replay a drag on the topmost layer in edit mode after startup.
        #[arg(long)]
        demo_edit: bool,
        /// Write JSON-lines frame summaries here.
        #[arg(short = 'o', long = "frames")]
        frames: Option<PathBuf>,
        /// Do not write settings back on exit.
        #[arg(long)]
        no_save: bool,
    },
    /// Append a foreground layer.
    AddLayer { image: PathBuf },
    /// Set the background image.
    SetBackground { image: PathBuf },
    /// Choose the particle effect.
    SetWeather {
        weather: Weather,
        #[arg(long)]
        z_index: Option<i32>,
        #[arg(long)]
        max_particles: Option<usize>,
        #[arg(long)]
        opacity: Option<f64>,
    },
    /// Print the settings file.
    Show,
    /// Save the loaded scene as a standalone scene file.
    ExportScene { output: PathBuf },
}

fn parse_monitor(value: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p}: {e}")))
        .collect::<Result<_, _>>()?;
    let &[x, y, w, h] = parts.as_slice() else {
        return Err(format!("expected x,y,w,h, got {value}"));
    };
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("monitor size must be positive, got {w}x{h}"));
    }
    Ok(Rect::new(x, y, x + w, y + h))
}

/// Click-through sink that only logs.
struct LoggingClickThrough;

impl ClickThrough for LoggingClickThrough {
    fn set_click_through(&mut self, enabled: bool) {
        tracing::info!("[window] Click-through {}", if enabled { "on" } else { "off" });
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = JsonSettingsStore::new(&cli.settings);

    match cli.command {
        Commands::Run {
            ticks,
            fps,
            monitors,
            realtime,
            demo_edit,
            frames,
            no_save,
        } => {
            let options = RunOptions {
                ticks,
                fps,
                monitors,
                realtime,
                demo_edit,
                frames,
                save: !no_save,
            };
            run(&store, &options)
        }
        Commands::AddLayer { image } => edit_settings(&store, |c| {
            if c.add_layer(&image).is_none() {
                bail!("could not add layer {}", image.display());
            }
            Ok(())
        }),
        Commands::SetBackground { image } => edit_settings(&store, |c| {
            if !c.set_background(&image) {
                bail!("could not load background {}", image.display());
            }
            Ok(())
        }),
        Commands::SetWeather {
            weather,
            z_index,
            max_particles,
            opacity,
        } => edit_settings(&store, |c| {
            let current = c.particle_preset();
            c.set_particle_preset(ParticlePresetSettings {
                kind: weather.into(),
                z_index: z_index.unwrap_or(current.z_index),
                max_particles: max_particles.unwrap_or(current.max_particles),
                opacity: opacity.unwrap_or(current.opacity),
            });
            Ok(())
        }),
        Commands::Show => {
            let settings = store.load();
            println!("{}", serde_json::to_string_pretty(&settings)?);
            print_layers(&settings.layers);
            Ok(())
        }
        Commands::ExportScene { output } => {
            let compositor = load_compositor(&store.load());
            JsonSceneRepository::new(&output)
                .save(compositor.scene())
                .with_context(|| format!("exporting scene to {}", output.display()))?;
            println!("Exported {} layers to {}", compositor.scene().layer_count(), output.display());
            Ok(())
        }
    }
}

fn print_layers(layers: &[LayerSettings]) {
    for layer in layers {
        println!(
            "  z{:>2}  {:<16} {}",
            layer.z_index,
            layer.name,
            layer.image_path.display()
        );
    }
}

fn load_compositor(settings: &AppSettings) -> Compositor {
    let viewport = Size::new(settings.window.width, settings.window.height);
    let mut compositor = Compositor::new(
        settings.engine,
        viewport,
        Box::new(FsImageLoader),
        Box::new(LoggingClickThrough),
    );
    compositor.apply_settings(settings);
    compositor
}

/// Loads settings into a compositor, applies `edit` and saves the result.
fn edit_settings(
    store: &JsonSettingsStore,
    edit: impl FnOnce(&mut Compositor) -> Result<()>,
) -> Result<()> {
    let settings = store.load();
    let mut compositor = load_compositor(&settings);
    edit(&mut compositor)?;
    save(store, &settings, &compositor)
}

fn save(store: &JsonSettingsStore, previous: &AppSettings, compositor: &Compositor) -> Result<()> {
    let settings = AppSettings {
        window: previous.window,
        ..compositor.to_settings()
    };
    store
        .save(&settings)
        .with_context(|| format!("saving {}", store.path().display()))
}

struct RunOptions {
    ticks: u64,
    fps: f64,
    monitors: Vec<Rect>,
    realtime: bool,
    demo_edit: bool,
    frames: Option<PathBuf>,
    save: bool,
}

fn run(store: &JsonSettingsStore, options: &RunOptions) -> Result<()> {
    if !(options.fps.is_finite() && options.fps > 0.0) {
        bail!("fps must be a positive number");
    }
    let settings = store.load();
    let mut compositor = load_compositor(&settings);

    let display = if options.monitors.is_empty() {
        Rect::new(0.0, 0.0, 1920.0, 1080.0)
    } else {
        virtual_display_bounds(&options.monitors)
    };
    compositor.initialize(display);

    let queue = InputQueue::new();
    let mut source = SweepPointerSource::new(queue.clone(), display, Duration::from_secs(6), 120.0);
    source.start();

    if options.demo_edit {
        queue_demo_edit(&queue, &compositor);
    }

    let mut out: Option<Box<dyn Write>> = match &options.frames {
        Some(path) => Some(Box::new(BufWriter::new(open_output(path)?))),
        None => None,
    };
    let mut renderer = SummaryRenderer::default();
    let dt = 1.0 / options.fps;
    let frame_time = Duration::from_secs_f64(dt);
    let started = Instant::now();

    let (width, height) = (display.width(), display.height());
    tracing::info!(
        "[host] Running {} ticks at {} fps over {}x{} display",
        options.ticks,
        options.fps,
        width,
        height
    );

    for tick in 0..options.ticks {
        let tick_start = Instant::now();
        compositor.drain(&queue);
        let frame = compositor.tick(dt);

        renderer.begin(tick);
        frame.replay(&mut renderer);
        let summary = renderer.finish();
        if let Some(out) = out.as_mut() {
            write_summary(out, &summary)?;
        }

        for event in compositor.take_events() {
            tracing::debug!("[host] {event:?}");
        }

        if options.realtime
            && let Some(rest) = frame_time.checked_sub(tick_start.elapsed())
        {
            std::thread::sleep(rest);
        }
    }

    source.dispose();
    if let Some(out) = out.as_mut() {
        out.flush()?;
    }

    if compositor.mode() == AppMode::Edit {
        compositor.set_mode(AppMode::Viewer);
    }
    tracing::info!(
        "[host] Finished {} ticks in {:.2?} ({} particles live)",
        options.ticks,
        started.elapsed(),
        compositor.particles().len()
    );

    if options.save {
        save(store, &settings, &compositor)?;
    }
    Ok(())
}

fn open_output(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("creating {}", path.display()))
}

/// Queues edit-mode input that drags the topmost layer 40px right and
/// down, undoes it, drags it again and leaves edit mode.
fn queue_demo_edit(queue: &InputQueue, compositor: &Compositor) {
    let Some(top) = compositor.scene().foreground().last().map(|l| l.id) else {
        tracing::warn!("[host] No foreground layer to edit");
        return;
    };
    let Some(bounds) = compositor.stack().bounds(top) else {
        return;
    };
    let start = bounds.center();
    let end = start + Vec2::new(40.0, 40.0);

    queue.push(InputEvent::Key(KeyEvent::new(Key::F12)));
    queue.push(InputEvent::PointerPressed(start));
    for step in 1..=4_i32 {
        let t = f64::from(step) / 4.0;
        queue.push(InputEvent::PointerMoved(start.lerp(end, t)));
    }
    queue.push(InputEvent::PointerReleased(end));
    queue.push(InputEvent::Key(KeyEvent::with_ctrl(Key::Z)));
    queue.push(InputEvent::PointerPressed(start));
    queue.push(InputEvent::PointerMoved(end));
    queue.push(InputEvent::PointerReleased(end));
    queue.push(InputEvent::Key(KeyEvent::new(Key::Escape)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_monitor() {
        assert_eq!(
            parse_monitor("-1280, 0, 1280, 1024"),
            Ok(Rect::new(-1280.0, 0.0, 0.0, 1024.0))
        );
        assert!(parse_monitor("1,2,3").is_err());
        assert!(parse_monitor("0,0,0,100").is_err());
        assert!(parse_monitor("a,b,c,d").is_err());
    }

    #[test]
    fn test_run_rejects_invalid_fps() {
        let store = JsonSettingsStore::new("unused-settings.json");
        for fps in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let options = RunOptions {
                ticks: 1,
                fps,
                monitors: Vec::new(),
                realtime: false,
                demo_edit: false,
                frames: None,
                save: false,
            };
            assert!(run(&store, &options).is_err(), "fps {fps} accepted");
        }
    }

    #[test]
    fn test_demo_edit_moves_top_layer() {
        struct StubLoader;

        impl driftscape_core::ImageLoader for StubLoader {
            fn load(
                &self,
                path: &Path,
            ) -> Result<driftscape_core::ImageResource, driftscape_core::ImageLoadError> {
                Ok(driftscape_core::ImageResource::new(path, 100, 50))
            }
        }

        let mut compositor = Compositor::new(
            driftscape_core::EngineConfig::default(),
            Size::new(300.0, 600.0),
            Box::new(StubLoader),
            Box::new(LoggingClickThrough),
        );
        let queue = InputQueue::new();
        queue_demo_edit(&queue, &compositor);
        assert!(queue.is_empty());

        let id = compositor.add_layer(Path::new("hill.png")).unwrap();
        queue_demo_edit(&queue, &compositor);
        compositor.drain(&queue);

        assert_eq!(compositor.mode(), AppMode::Viewer);
        assert_eq!(compositor.undo_stack().len(), 1);
        let t = compositor.scene().layer(id).unwrap().transform;
        assert!((t.x - 40.0).abs() < 0.001);
        assert!((t.y - 40.0).abs() < 0.001);
    }
}
