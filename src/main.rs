//! tagsync - mirror the currently playing track onto a BusyTag display.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::time::Duration;

use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::{debug, info, warn};

use tagsync::cli::{self, Cli, Commands, LogFormat};
use tagsync::color::{self, Rgb};
use tagsync::config::{self, Settings, SourceKind};
use tagsync::device::{DisplaySpec, VolumeSink};
use tagsync::error::{Result, TagError};
use tagsync::image_ops::load_image;
use tagsync::logging::init_logging;
use tagsync::palette::{self, ExtractionMode};
use tagsync::quantize::{ColorCandidate, Quantizer};
use tagsync::render::{ArtworkCompositor, Compositor, SvgCompositor};
use tagsync::source::{FileSource, SpotifySource, TrackSource};
use tagsync::sync::{SyncLoop, TickOutcome};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hue offset, in degrees, of the analogous pair shown by `extract --all`.
const ANALOGOUS_OFFSET: f64 = 30.0;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    init_logging(cli.log_format == LogFormat::Json, cli.verbose, cli.quiet);

    if let Err(e) = run(&cli).await {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Run(args)) => cmd_run(cli, args).await,
        Some(Commands::Extract(args)) => cmd_extract(cli, args),
        Some(Commands::Config(args)) => cmd_config(cli, args),
        Some(Commands::Init(args)) => cmd_init(cli, args),
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => cmd_completions(args),
    }
}

// === Quick Start ===

#[derive(Serialize)]
struct QuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    commands: [(&'static str, &'static str); 4],
    modes: [&'static str; 4],
}

fn print_quick_start(cli: &Cli) -> Result<()> {
    let help = QuickStart {
        tool: "tagsync",
        version: VERSION,
        description: "Mirror the currently playing track onto a BusyTag display",
        commands: [
            ("init", "tagsync init --volume <MOUNT>"),
            ("run", "tagsync run"),
            ("run once", "tagsync run --once"),
            ("extract", "tagsync extract <IMAGE> --all"),
        ],
        modes: ExtractionMode::ALL.map(ExtractionMode::as_str),
    };

    if cli.use_json() {
        return output_json(cli, &help);
    }

    println!(
        "{} {} - {}\n",
        style("tagsync").bold().cyan(),
        style(VERSION).dim(),
        help.description
    );
    println!("{}", style("Getting started:").bold());
    for (name, usage) in help.commands {
        println!("  {:<10} {}", style(name).green(), usage);
    }
    println!("\n{} {}", style("Modes:").bold(), help.modes.join(", "));
    println!("\nRun {} for all options.", style("tagsync --help").yellow());
    Ok(())
}

// === Commands ===

fn load_settings(cli: &Cli, overrides: &cli::OverrideArgs) -> Result<config::LoadedSettings> {
    let mut loaded = config::locate_settings(cli.config.as_deref())?;
    loaded.settings.apply(&overrides.to_overrides());
    Ok(loaded)
}

fn build_source(settings: &Settings) -> Result<Box<dyn TrackSource>> {
    let source: Box<dyn TrackSource> = match settings.source.kind {
        SourceKind::Spotify => {
            let mut spotify = SpotifySource::new(
                settings.source.api_base.clone(),
                settings.source.token_env.clone(),
                Duration::from_millis(settings.poll_timeout_ms),
            )?;
            if let Some(token) = &settings.source.token {
                spotify = spotify.with_token(token.clone());
            }
            Box::new(spotify)
        }
        SourceKind::File => {
            let path = settings.source.path.clone().ok_or_else(|| {
                TagError::ConfigInvalid("source.path is required for the file source".into())
            })?;
            Box::new(FileSource::new(path))
        }
    };
    Ok(source)
}

fn build_compositor(settings: &Settings) -> Box<dyn Compositor> {
    let spec = DisplaySpec::BUSYTAG;
    if settings.render.show_text {
        Box::new(
            SvgCompositor::new(spec)
                .resize(settings.render.resize)
                .font_family(settings.render.font_family.clone()),
        )
    } else {
        Box::new(ArtworkCompositor {
            spec,
            resize: settings.render.resize,
        })
    }
}

fn build_sink(settings: &Settings) -> Result<VolumeSink> {
    let volume = settings
        .device
        .volume
        .clone()
        .ok_or_else(|| TagError::ConfigInvalid("device.volume is not set".into()))?;
    Ok(VolumeSink::new(volume, settings.device.image_name.clone())
        .paused_led_bits(settings.device.paused_led_bits)
        .brightness(settings.device.brightness))
}

#[derive(Serialize)]
struct TickReport<'a> {
    outcome: &'static str,
    color: Option<String>,
    error: Option<String>,
    state: tagsync::state::StateSummary,
    stats: tagsync::sync::SyncStats,
    source: &'a str,
}

async fn cmd_run(cli: &Cli, args: &cli::RunArgs) -> Result<()> {
    let loaded = load_settings(cli, &args.overrides)?;
    let settings = loaded.settings;
    settings.validate()?;
    debug!(path = %loaded.path.display(), from_file = loaded.from_file, "Settings ready");

    let source = build_source(&settings)?;
    let source_name = source.describe();
    let mut sync = SyncLoop::new(
        source,
        build_compositor(&settings),
        build_sink(&settings)?,
        settings.sync_settings(),
    );

    if args.once {
        let outcome = sync.tick().await?;
        let report = TickReport {
            outcome: outcome.label(),
            color: match &outcome {
                TickOutcome::Written { color } => Some(color.to_string()),
                _ => None,
            },
            error: outcome.error().map(ToString::to_string),
            state: sync.state().summary(),
            stats: sync.stats(),
            source: &source_name,
        };
        if cli.use_json() {
            return output_json(cli, &report);
        }
        print_tick(&report);
        return Ok(());
    }

    // The signal is watched from its own task so it is registered at once,
    // while the loop only looks at it between ticks.
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current tick");
                let _ = tx.send(());
            }
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl+C"),
        }
    });

    let stats = sync
        .run(async move {
            // A dropped sender means no signal handler: run until killed.
            if rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;

    if cli.use_json() {
        output_json(cli, &stats)
    } else {
        println!(
            "Stopped after {} ticks ({} writes, {} failures)",
            stats.ticks, stats.writes, stats.failures
        );
        Ok(())
    }
}

fn print_tick(report: &TickReport<'_>) {
    let outcome = match report.outcome {
        "written" => style(report.outcome).green(),
        o if o.ends_with("failed") => style(o).red(),
        o => style(o).dim(),
    };
    println!("{} {}", style("Tick:").bold(), outcome);
    if let Some(color) = &report.color {
        println!("{} {}", style("Color:").bold(), color);
    }
    if let Some(error) = &report.error {
        println!("{} {}", style("Error:").bold(), error);
    }
    if let Some(title) = &report.state.title {
        println!(
            "{} {} ({})",
            style("Track:").bold(),
            title,
            if report.state.is_playing { "playing" } else { "paused" }
        );
    }
}

#[derive(Serialize)]
struct ModeColor {
    mode: ExtractionMode,
    color: String,
}

#[derive(Serialize)]
struct ExtractReport {
    image: String,
    mode: ExtractionMode,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    modes: Option<Vec<ModeColor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    led_pattern: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analogous: Option<[String; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidates: Option<Vec<ColorCandidate>>,
}

fn cmd_extract(cli: &Cli, args: &cli::ExtractArgs) -> Result<()> {
    let mode = match args.mode {
        Some(mode) => mode,
        None => config::locate_settings(cli.config.as_deref())?.settings.mode,
    };

    let image = load_image(&args.image)?;
    let candidates = Quantizer::default().quantize(&image, args.candidates);
    let color = palette::select(&candidates, mode)?;
    debug!(candidates = candidates.len(), %color, "Extracted color");

    let mut report = ExtractReport {
        image: args.image.display().to_string(),
        mode,
        color: color.to_string(),
        modes: None,
        led_pattern: None,
        analogous: None,
        candidates: None,
    };

    if args.all {
        report.modes = Some(
            ExtractionMode::ALL
                .into_iter()
                .map(|mode| {
                    palette::select(&candidates, mode).map(|c| ModeColor {
                        mode,
                        color: c.to_string(),
                    })
                })
                .collect::<Result<_>>()?,
        );
        report.led_pattern = Some(
            palette::led_pattern(&candidates, 4)?
                .iter()
                .map(ToString::to_string)
                .collect(),
        );
        report.analogous = Some(color::analogous(color, ANALOGOUS_OFFSET).map(|c| c.to_string()));
        report.candidates = Some(candidates);
    }

    if cli.use_json() {
        return output_json(cli, &report);
    }

    if !args.all {
        println!("{}", report.color);
        return Ok(());
    }

    for entry in report.modes.iter().flatten() {
        println!("{:<14} {}", style(entry.mode).bold(), swatch(&entry.color));
    }
    if let Some(pattern) = &report.led_pattern {
        let swatches: Vec<String> = pattern.iter().map(|c| swatch(c)).collect();
        println!("{:<14} {}", style("led pattern").bold(), swatches.join("  "));
    }
    if let Some(pair) = &report.analogous {
        let swatches: Vec<String> = pair.iter().map(|c| swatch(c)).collect();
        println!("{:<14} {}", style("analogous").bold(), swatches.join("  "));
    }
    Ok(())
}

/// `#RRGGBB` preceded by a colored block when the terminal supports it.
fn swatch(hex: &str) -> String {
    let Ok(rgb) = hex.parse::<Rgb>() else {
        return hex.to_string();
    };
    let block = style("██").color256(ansi256(rgb));
    format!("{block} {hex}")
}

/// Nearest entry of the 6×6×6 xterm color cube.
fn ansi256(c: Rgb) -> u8 {
    let level = |v: u8| (u16::from(v) * 5 + 127) / 255;
    (16 + 36 * level(c.r) + 6 * level(c.g) + level(c.b)) as u8
}

fn cmd_config(cli: &Cli, args: &cli::ConfigArgs) -> Result<()> {
    let loaded = load_settings(cli, &args.overrides)?;

    if args.path {
        if cli.use_json() {
            return output_json(
                cli,
                &serde_json::json!({ "path": loaded.path, "exists": loaded.from_file }),
            );
        }
        println!("{}", loaded.path.display());
        return Ok(());
    }

    if cli.use_json() {
        return output_json(
            cli,
            &serde_json::json!({
                "path": loaded.path,
                "from_file": loaded.from_file,
                "settings": loaded.settings,
            }),
        );
    }

    let origin = if loaded.from_file {
        loaded.path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", loaded.path.display())
    };
    println!("{} {}\n", style("#").dim(), style(origin).dim());
    let toml = toml::to_string_pretty(&loaded.settings)
        .map_err(|e| TagError::ConfigParse(format!("TOML: {e}")))?;
    print!("{toml}");
    Ok(())
}

fn cmd_init(cli: &Cli, args: &cli::InitArgs) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_settings_path()?,
    };
    if path.exists() && !args.force {
        return Err(TagError::ConfigInvalid(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let mut settings = Settings::default();
    settings.device.volume.clone_from(&args.volume);
    config::save_settings(&settings, &path)?;

    if cli.use_json() {
        return output_json(cli, &serde_json::json!({ "path": path, "written": true }));
    }
    println!("{} {}", style("Wrote").green(), path.display());
    if settings.device.volume.is_none() {
        println!("Set {} before running, or pass --volume.", style("device.volume").bold());
    }
    Ok(())
}

fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        return output_json(
            cli,
            &serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": VERSION,
                "modes": ExtractionMode::ALL.map(ExtractionMode::as_str),
            }),
        );
    }
    println!("tagsync {VERSION}");
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "tagsync", &mut io::stdout());
    Ok(())
}

// === Output ===

fn output_json<T: Serialize>(cli: &Cli, data: &T) -> Result<()> {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    }
    .map_err(|e| TagError::Other(format!("JSON output: {e}")))?;
    println!("{json}");
    Ok(())
}

fn output_error(cli: &Cli, error: &TagError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json}");
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
