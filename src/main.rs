mod args;

use args::{Args, Command, CropArgs, MatchArgs};
use minimap_vision::champions::{ChampionIconMatcher, FrameConsumer, MatchConfig};
use minimap_vision::report::{AnnotatedVideoWriter, FrameLimit, JsonLinesReport, ScoreLogger, Tee};
use minimap_vision::video::{Fourcc, SinkSettings, VideoBackend, default_backend};
use minimap_vision::{CropConfig, MinimapCropper, VisionResult};
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("❌ {message}");
            args::print_help();
            return ExitCode::from(2);
        }
    };

    let default_level = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = default_backend().and_then(|backend| match args.command {
        Command::Crop(crop) => run_crop(backend.as_ref(), crop),
        Command::Match(matching) => run_match(backend.as_ref(), matching),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("Fatal {:?} error", e.kind());
            eprintln!("❌ {e}");
            ExitCode::from(1)
        }
    }
}

fn run_crop(backend: &dyn VideoBackend, args: CropArgs) -> VisionResult<()> {
    let mut config = CropConfig::default();
    if let Some(fourcc) = args.fourcc.as_deref() {
        config.fourcc = Fourcc::parse(fourcc)?;
    }

    let outcome = MinimapCropper::new(config).crop(backend, &args.input_video, &args.output_dir)?;
    println!(
        "Cropped minimap video has been saved as {}",
        outcome.output_path.display()
    );
    Ok(())
}

fn run_match(backend: &dyn VideoBackend, args: MatchArgs) -> VisionResult<()> {
    let mut config = MatchConfig {
        annotate: args.annotated.is_some(),
        ..MatchConfig::default()
    };
    if let Some(icons) = args.icons {
        config.icons.folder = icons;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(method) = args.method {
        config.method = method;
    }

    let session = ChampionIconMatcher::new(config).open(backend, &args.input_video)?;
    if !args.json {
        println!("Loaded {} icons.", session.library().len());
    }

    let mut writer = match &args.annotated {
        Some(path) => {
            let info = session.video_info();
            let sink = backend.create_sink(
                path,
                SinkSettings {
                    width: info.width,
                    height: info.height,
                    fps: info.fps,
                    fourcc: Fourcc::default(),
                },
            )?;
            Some(AnnotatedVideoWriter::new(sink))
        }
        None => None,
    };
    let mut telemetry: Box<dyn FrameConsumer> = if args.json {
        Box::new(JsonLinesReport::new(io::stdout().lock(), true))
    } else {
        Box::new(ScoreLogger::new(io::stdout().lock()))
    };
    let mut limit = args.max_frames.map(FrameLimit::new);

    let summary = {
        let mut tee = Tee::new().with(telemetry.as_mut());
        if let Some(limit) = limit.as_mut() {
            tee.push(limit);
        }
        if let Some(writer) = writer.as_mut() {
            tee.push(writer);
        }
        session.run(&mut tee)?
    };
    drop(telemetry);

    if let (Some(writer), Some(path)) = (writer, &args.annotated) {
        let written = writer.finish()?;
        log::info!("Wrote {} annotated frames to {:?}", written, path);
    }
    log::info!(
        "Done: {} frames, {} detections",
        summary.frames,
        summary.detections
    );
    Ok(())
}
