use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};

use crate::background::DEFAULT_BACKGROUND_FRAMES;

/// Records which defaulted flags were typed on the command line, so values
/// from the config file only replace true defaults.
#[derive(Debug, Default)]
pub struct CliSources {
    pub background_frames_from_cli: bool,
    pub pixels_per_unit_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        let Some((_, sub)) = matches.subcommand() else {
            return Self::default();
        };
        Self {
            background_frames_from_cli: value_from_cli(sub, "background_frames"),
            pixels_per_unit_from_cli: value_from_cli(sub, "pixels_per_unit"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    // Subcommands without the flag report an unknown id instead of panicking.
    matches.try_contains_id(id).unwrap_or(false)
        && matches
            .value_source(id)
            .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

pub fn try_parse_cli_from<I, T>(itr: I) -> Result<(CliArgs, CliSources), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(itr)?;
    let args = CliArgs::from_arg_matches(&matches)?;
    let sources = CliSources::from_matches(&matches);
    Ok((args, sources))
}

#[derive(Debug, Parser)]
#[command(
    name = "epm-tracker",
    about = "Track a mouse through Elevated Plus Maze videos and summarize where it spent its time",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Override the configuration file path
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Track the mouse through every frame and write the tracking file
    Track(TrackArgs),
    /// Print the arm and centre polygons reconstructed from a node file
    Arena(ArenaArgs),
    /// Compute time-in-region and distance statistics for a tracking file
    Analyze(AnalyzeArgs),
    /// Write background, difference and threshold images for one frame
    Preview(PreviewArgs),
    /// Print the list of available decoding backends
    ListBackends,
}

#[derive(Debug, Args)]
pub struct VideoArgs {
    /// Lock decoding to a specific backend implementation
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// Frame width in pixels (raw backend)
    #[arg(long = "width", value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Frame height in pixels (raw backend)
    #[arg(long = "height", value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Input video path
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TrackingArgs {
    /// Foreground cutoff as a percentage of the background difference (0-100); Otsu when omitted
    #[arg(short = 't', long = "threshold", value_name = "PCT")]
    pub threshold: Option<f32>,

    /// Number of randomly sampled frames averaged into the background
    #[arg(
        long = "background-frames",
        id = "background_frames",
        default_value_t = DEFAULT_BACKGROUND_FRAMES,
        value_parser = clap::value_parser!(usize)
    )]
    pub background_frames: usize,

    /// Seed for background frame sampling
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct TrackArgs {
    #[command(flatten)]
    pub video: VideoArgs,

    #[command(flatten)]
    pub tracking: TrackingArgs,

    /// Tracking file to write (CSV)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: PathBuf,

    /// Arena node file; detections outside its outline are ignored
    #[arg(long = "arena-nodes", value_name = "CSV")]
    pub arena_nodes: Option<PathBuf>,

    /// Output directory for the background and mask images
    #[arg(long = "dump-dir")]
    pub dump_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ArenaArgs {
    /// Arena node file (CSV with node,rr,cc)
    pub nodes: PathBuf,

    /// Print the geometry as JSON
    #[arg(long = "json")]
    pub json: bool,

    /// Also write the nodes relative to their first node, plus the pixel file
    #[arg(long = "save-nodes", value_name = "CSV")]
    pub save_nodes: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Tracking file produced by `track`
    #[arg(long = "tracking", value_name = "CSV")]
    pub tracking: PathBuf,

    /// Arena node file
    #[arg(long = "arena", value_name = "CSV")]
    pub arena: PathBuf,

    /// Indices of the open arms, comma separated
    #[arg(long = "open-arms", value_delimiter = ',', value_name = "ARMS")]
    pub open_arms: Vec<usize>,

    /// Indices of the closed arms, comma separated
    #[arg(long = "closed-arms", value_delimiter = ',', value_name = "ARMS")]
    pub closed_arms: Vec<usize>,

    /// Pixels per distance unit
    #[arg(
        long = "pixels-per-unit",
        id = "pixels_per_unit",
        default_value_t = 1.0
    )]
    pub pixels_per_unit: f64,

    /// Write the summary as JSON to this file
    #[arg(long = "json", value_name = "FILE")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub video: VideoArgs,

    #[command(flatten)]
    pub tracking: TrackingArgs,

    /// Frame to preview
    #[arg(long = "frame", default_value_t = 0)]
    pub frame: usize,

    /// Arena node file; foreground outside its outline is dropped
    #[arg(long = "arena-nodes", value_name = "CSV")]
    pub arena_nodes: Option<PathBuf>,

    /// Output directory for the preview images
    #[arg(long = "dump-dir")]
    pub dump_dir: PathBuf,
}
