use minimap_vision::template_matching::CorrelationMethod;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct CropArgs {
    pub input_video: PathBuf,
    pub output_dir: PathBuf,
    pub fourcc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArgs {
    pub input_video: PathBuf,
    pub icons: Option<PathBuf>,
    pub threshold: Option<f32>,
    pub method: Option<CorrelationMethod>,
    pub json: bool,
    pub annotated: Option<PathBuf>,
    pub max_frames: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Crop(CropArgs),
    Match(MatchArgs),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub command: Command,
    pub debug_mode: bool,
}

impl Args {
    /// Parse the process arguments. `Ok(None)` means help or version was printed.
    pub fn parse() -> Result<Option<Self>, String> {
        Self::parse_from(env::args().skip(1))
    }

    pub fn parse_from<I, S>(args: I) -> Result<Option<Self>, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut subcommand: Option<String> = None;
        let mut positional: Vec<String> = Vec::new();
        let mut debug_mode = false;
        let mut fourcc = None;
        let mut icons = None;
        let mut threshold = None;
        let mut method = None;
        let mut json = false;
        let mut annotated = None;
        let mut max_frames = None;

        for arg in args.into_iter().map(Into::into) {
            if arg == "--help" || arg == "-h" {
                print_help();
                return Ok(None);
            } else if arg == "--version" || arg == "-v" {
                print_version();
                return Ok(None);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--json" {
                json = true;
            } else if let Some(val) = arg.strip_prefix("--fourcc=") {
                fourcc = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--icons=") {
                icons = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--annotated=") {
                annotated = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--threshold=") {
                let parsed = val
                    .parse::<f32>()
                    .ok()
                    .filter(|t| t.is_finite())
                    .ok_or_else(|| format!("Invalid threshold value: {val}"))?;
                threshold = Some(parsed);
            } else if let Some(val) = arg.strip_prefix("--method=") {
                method = Some(val.parse::<CorrelationMethod>()?);
            } else if let Some(val) = arg.strip_prefix("--max-frames=") {
                let parsed = val
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("Invalid max-frames value: {val}"))?;
                max_frames = Some(parsed);
            } else if arg.starts_with("--") {
                return Err(format!("Unknown argument: {arg}"));
            } else if subcommand.is_none() {
                subcommand = Some(arg);
            } else {
                positional.push(arg);
            }
        }

        let command = match subcommand.as_deref() {
            Some("crop") => {
                let [input_video, output_dir] = take_positional::<2>(positional, "crop")?;
                Command::Crop(CropArgs {
                    input_video: PathBuf::from(input_video),
                    output_dir: PathBuf::from(output_dir),
                    fourcc,
                })
            }
            Some("match") => {
                let [input_video] = take_positional::<1>(positional, "match")?;
                Command::Match(MatchArgs {
                    input_video: PathBuf::from(input_video),
                    icons,
                    threshold,
                    method,
                    json,
                    annotated,
                    max_frames,
                })
            }
            Some(other) => return Err(format!("Unknown command: {other}")),
            None => return Err("Missing command: expected 'crop' or 'match'".to_string()),
        };

        Ok(Some(Args {
            command,
            debug_mode,
        }))
    }
}

fn take_positional<const N: usize>(values: Vec<String>, command: &str) -> Result<[String; N], String> {
    let count = values.len();
    values
        .try_into()
        .map_err(|_| format!("'{command}' expects {N} positional argument(s), got {count}"))
}

fn version_line() -> String {
    format!(
        "Minimap Vision v{} (c) {}",
        env!("APP_VERSION_DISPLAY"),
        env!("APP_BUILD_YEAR")
    )
}

fn print_version() {
    println!("{}", version_line());
}

pub fn print_help() {
    println!("🗺️  Minimap Vision");
    println!();
    println!("USAGE:");
    println!("    minimap-vision crop <input_video> <output_dir> [FLAGS]");
    println!("    minimap-vision match <input_video> [FLAGS]");
    println!();
    println!("COMMANDS:");
    println!("    crop                Crop the minimap into <output_dir>/minimap.mp4");
    println!("    match               Find champion icons in an already-cropped minimap video");
    println!();
    println!("FLAGS:");
    println!("    --fourcc=XXXX       Output codec for crop (default: mp4v)");
    println!("    --icons=DIR         Icon folder for match (default: champion_icons)");
    println!("    --threshold=F       Detection threshold for match (default: 0.8)");
    println!("    --method=zncc|ncc   Correlation score for match (default: zncc)");
    println!("    --json              Print one JSON object per frame instead of scores");
    println!("    --annotated=PATH    Write a video with detection boxes drawn");
    println!("    --max-frames=N      Stop after N frames");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    minimap-vision crop data/clip1/input.mp4 data/");
    println!("    minimap-vision match data/minimap.mp4");
    println!("    minimap-vision match data/minimap.mp4 --json --threshold=0.85");
}
