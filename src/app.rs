//! Command handlers behind the `epm-tracker` binary.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task;
use tracing::{info, warn};

use epm_tracker_decoder::{Configuration, FrameError, FrameSource};

use crate::arena::{Arena, ArenaGeometry, NODE_COUNT};
use crate::blob::detect;
use crate::cli::{AnalyzeArgs, ArenaArgs, CliArgs, CliSources, Command, PreviewArgs, TrackArgs, VideoArgs};
use crate::error::AppError;
use crate::mask::BinaryMask;
use crate::normalize::{frame_to_image, to_byte};
use crate::output::{
    AnalysisReport, ImageDump, NodePlacement, load_nodes, load_trajectory, resolve_pixel_coords,
    save_nodes, save_trajectory, write_report,
};
use crate::progress;
use crate::segment::{effective_cutoff, subtract_background, threshold_difference};
use crate::settings::{EffectiveSettings, resolve_settings};
use crate::stats::summarize;
use crate::tracker::VideoTracker;

pub type SharedSource = Arc<dyn FrameSource>;

pub async fn run(cli: CliArgs, sources: CliSources) -> Result<(), AppError> {
    let settings = resolve_settings(&cli, &sources)?;
    if let Some(path) = settings.config_path.as_ref() {
        info!(path = %path.display(), "using config file");
    }
    match &cli.command {
        Command::Track(args) => track(args, &settings).await,
        Command::Arena(args) => arena(args),
        Command::Analyze(args) => analyze(args, &settings).await,
        Command::Preview(args) => preview(args, &settings).await,
        Command::ListBackends => {
            print_available_backends();
            Ok(())
        }
    }
}

fn print_available_backends() {
    let backends = Configuration::available_backends();
    if backends.is_empty() {
        println!("no backends compiled in");
        return;
    }
    println!("available backends:");
    for backend in backends {
        println!("  {}", backend.as_str());
    }
}

/// Opens the video selected by CLI, config file and `EPM_*` environment.
pub fn open_source(video: &VideoArgs, settings: &EffectiveSettings) -> Result<SharedSource, FrameError> {
    let mut config = Configuration::from_env()?;
    if settings.backend.is_some() {
        config.backend = settings.backend;
    }
    if let Some(input) = video.input.as_ref() {
        config.input = Some(input.clone());
    }
    config.width = settings.width.or(config.width);
    config.height = settings.height.or(config.height);

    let backend = config.resolved_backend()?;
    if !Configuration::available_backends().contains(&backend) {
        return Err(FrameError::unsupported(backend.as_str()));
    }
    let source = config.create_source()?;
    let metadata = source.metadata();
    info!(
        backend = %backend,
        width = metadata.width,
        height = metadata.height,
        frames = metadata.frame_count,
        fps = ?metadata.fps,
        "opened video"
    );
    Ok(Arc::from(source))
}

/// Inclusion mask filled from the outline of an arena node file.
pub fn inclusion_mask(path: &Path, width: u32, height: u32) -> Result<BinaryMask, AppError> {
    let nodes = load_nodes(&resolve_pixel_coords(path))?;
    if nodes.len() != NODE_COUNT {
        warn!(
            path = %path.display(),
            nodes = nodes.len(),
            "arena outline does not have {NODE_COUNT} nodes"
        );
    }
    let mask = BinaryMask::from_arena_outline(width, height, &nodes);
    info!(pixels = mask.count(), "inclusion mask built from arena outline");
    Ok(mask)
}

async fn track(args: &TrackArgs, settings: &EffectiveSettings) -> Result<(), AppError> {
    let source = open_source(&args.video, settings)?;
    let metadata = source.metadata();

    let mut tracking = settings.tracking();
    if let Some(path) = args.arena_nodes.as_ref() {
        tracking.inclusion_mask = Some(inclusion_mask(path, metadata.width, metadata.height)?);
    }
    let tracker = Arc::new(VideoTracker::new(tracking)?);

    let spinner = progress::spinner(
        "background",
        format!("averaging {} frames", settings.background_frames),
    );
    let background = {
        let source = Arc::clone(&source);
        let tracker = Arc::clone(&tracker);
        task::spawn_blocking(move || tracker.background(source.as_ref())).await??
    };
    spinner.finish_and_clear();

    if let Some(dir) = args.dump_dir.as_ref() {
        let dump = ImageDump::create(dir).await?;
        dump.write("background", &background).await?;
        if let Some(mask) = tracker.settings().inclusion_mask.as_ref() {
            dump.write("inclusion-mask", &mask.to_image()).await?;
        }
        info!(dir = %dump.directory().display(), "diagnostic images written");
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let monitor = progress::spawn_monitor("tracking", metadata.frame_count as u64, rx);
    let result = {
        let source = Arc::clone(&source);
        let tracker = Arc::clone(&tracker);
        task::spawn_blocking(move || {
            #[cfg(feature = "parallel")]
            let trajectory = tracker.run_parallel_with_background(source.as_ref(), &background, &tx);
            #[cfg(not(feature = "parallel"))]
            let trajectory = tracker.run_with_background(source.as_ref(), &background, &tx);
            trajectory
        })
        .await
    };
    monitor.await?;
    let trajectory = result??;

    save_trajectory(&args.output, &trajectory)?;
    println!(
        "tracked {} frames ({} without a detection) -> {}",
        trajectory.len(),
        trajectory.missing_frames(),
        args.output.display()
    );
    Ok(())
}

fn arena(args: &ArenaArgs) -> Result<(), AppError> {
    let path = resolve_pixel_coords(&args.nodes);
    let nodes = load_nodes(&path)?;
    let geometry = ArenaGeometry::from_nodes(&nodes)?;
    if let Some(target) = args.save_nodes.as_ref() {
        let pixel_path = save_nodes(target, &NodePlacement::anchored_at_first(&nodes))?;
        info!(
            path = %target.display(),
            pixel_path = %pixel_path.display(),
            "arena nodes saved"
        );
    }
    if args.json {
        let encoded = serde_json::to_string_pretty(&geometry).map_err(crate::output::OutputError::from)?;
        println!("{encoded}");
        return Ok(());
    }

    let center = geometry.central_polygon().centroid();
    println!("center  centroid ({:.1}, {:.1})", center.r, center.c);
    for (index, arm) in geometry.arms().iter().enumerate() {
        let centroid = arm.centroid();
        let vertices: Vec<String> = arm
            .vertices()
            .iter()
            .map(|p| format!("({:.1}, {:.1})", p.r, p.c))
            .collect();
        println!(
            "arm {index}   centroid ({:.1}, {:.1})  vertices {}",
            centroid.r,
            centroid.c,
            vertices.join(" ")
        );
    }
    Ok(())
}

async fn analyze(args: &AnalyzeArgs, settings: &EffectiveSettings) -> Result<(), AppError> {
    let trajectory = load_trajectory(&args.tracking)?;
    let nodes_path = resolve_pixel_coords(&args.arena);
    let mut arena = Arena::from_nodes(&load_nodes(&nodes_path)?)?;
    if let Some(labels) = settings.labels.clone() {
        arena = arena.with_labels(labels)?;
    }

    let summary = summarize(&trajectory, &arena, settings.pixels_per_unit)?;
    println!("frames               {}", summary.frames);
    println!("missing frames       {}", summary.missing_frames);
    println!("unidentified frames  {}", summary.unidentified_frames);
    println!("time in center       {:.4}", summary.time_in_center);
    for (index, fraction) in summary.time_in_arms.iter().enumerate() {
        println!("time in arm {index}        {fraction:.4}");
    }
    if let Some(open) = summary.time_in_open_arms {
        println!("time in open arms    {open:.4}");
    }
    if let Some(closed) = summary.time_in_closed_arms {
        println!("time in closed arms  {closed:.4}");
    }
    println!("total distance       {:.3}", summary.total_distance);

    if let Some(path) = args.json.as_ref() {
        let report = AnalysisReport {
            tracking_file: args.tracking.clone(),
            nodes_file: nodes_path,
            labels: arena.labels(),
            summary: &summary,
        };
        write_report(path, &report, true).await?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}

async fn preview(args: &PreviewArgs, settings: &EffectiveSettings) -> Result<(), AppError> {
    let source = open_source(&args.video, settings)?;
    let metadata = source.metadata();
    let inclusion = match args.arena_nodes.as_ref() {
        Some(path) => Some(inclusion_mask(path, metadata.width, metadata.height)?),
        None => None,
    };
    let tracker = Arc::new(VideoTracker::new(settings.tracking())?);
    let frame_index = args.frame;

    let (background, frame) = {
        let source = Arc::clone(&source);
        let tracker = Arc::clone(&tracker);
        task::spawn_blocking(move || -> Result<_, AppError> {
            let background = tracker.background(source.as_ref())?;
            let frame = frame_to_image(&source.frame(frame_index)?);
            Ok((background, frame))
        })
        .await??
    };

    let diff = subtract_background(&frame, &background)?;
    let cutoff = effective_cutoff(&diff, settings.cutoff);
    let source_label = if settings.cutoff.is_some() { "configured" } else { "otsu" };
    info!(
        frame = frame_index,
        cutoff_percent = cutoff * 100.0,
        source = source_label,
        "foreground cutoff"
    );
    let mut mask = threshold_difference(&diff, cutoff);
    if let Some(inclusion) = inclusion.as_ref() {
        mask.retain_within(inclusion);
    }
    let detection = detect(&frame, &background, Some(cutoff), inclusion.as_ref())?;
    let difference = to_byte(&diff);

    let dump = ImageDump::create(&args.dump_dir).await?;
    dump.write("background", &background).await?;
    dump.write(&format!("frame-{frame_index}"), &frame).await?;
    dump.write(&format!("difference-{frame_index}"), &difference).await?;
    dump.write(&format!("threshold-{frame_index}"), &mask.to_image()).await?;
    if let Some(inclusion) = inclusion.as_ref() {
        dump.write("inclusion-mask", &inclusion.to_image()).await?;
    }

    println!("frame {frame_index}: cutoff {:.1}% ({source_label})", cutoff * 100.0);
    match detection.centroid() {
        Some((r, c)) => println!("frame {frame_index}: mouse at ({r:.1}, {c:.1})"),
        None => println!("frame {frame_index}: no foreground detected"),
    }
    println!("preview images written to {}", dump.directory().display());
    Ok(())
}
