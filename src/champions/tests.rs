//! Tests for champion icon matching

use crate::champions::{
    ChampionIconMatcher, FrameReport, IconConfig, IconLibrary, MatchConfig, MatchState,
    create_headless_config, preprocess_icon,
};
use crate::error::{ErrorKind, VisionError, VisionResult};
use crate::geometry::Ratio;
use crate::video::{Frame, MemoryBackend, VideoBackend};
use image::{GrayImage, Rgb, RgbImage};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

const VIDEO: &str = "minimap.mp4";

/// Grey pseudo-random noise; different seeds give uncorrelated images
fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let v = (state >> 24) as u8;
        Rgb([v, v, v])
    })
}

/// Paint a luma template into an RGB frame as grey pixels
fn paint(frame: &mut Frame, template: &GrayImage, x: u32, y: u32) {
    for (tx, ty, p) in template.enumerate_pixels() {
        let v = p[0];
        frame.put_pixel(x + tx, y + ty, Rgb([v, v, v]));
    }
}

struct IconFolder {
    dir: tempfile::TempDir,
}

impl IconFolder {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn add_icon(&self, file_name: &str, seed: u32) -> PathBuf {
        let path = self.dir.path().join(file_name);
        noise(120, 120, seed)
            .save_with_format(&path, image::ImageFormat::Png)
            .expect("write icon");
        path
    }

    fn add_raw(&self, file_name: &str, bytes: &[u8]) {
        std::fs::write(self.dir.path().join(file_name), bytes).expect("write file");
    }

    /// Template as the matcher will see it for a given icon size
    fn template(&self, file_name: &str, icon_size: u32) -> GrayImage {
        let icon = image::open(self.dir.path().join(file_name)).expect("read icon");
        preprocess_icon(&icon, icon_size, 0.5).expect("non-empty template")
    }

    fn config(&self) -> MatchConfig {
        MatchConfig {
            icons: IconConfig {
                folder: self.path().to_path_buf(),
                ..IconConfig::default()
            },
            ..MatchConfig::default()
        }
    }
}

fn collect(backend: &MemoryBackend, config: MatchConfig) -> Vec<FrameReport> {
    ChampionIconMatcher::new(config)
        .open(backend, Path::new(VIDEO))
        .expect("session opens")
        .collect::<Result<Vec<_>, _>>()
        .expect("all frames processed")
}

#[test]
fn test_library_skips_bad_entries() {
    let folder = IconFolder::new();
    folder.add_icon("Garen.png", 2);
    folder.add_icon("Ahri.PNG", 1);
    folder.add_raw("Broken.png", b"definitely not a png");
    folder.add_raw("notes.txt", b"Teemo");
    std::fs::create_dir(folder.path().join("Nested.png")).unwrap();

    let library = IconLibrary::load(folder.path(), 25, &IconConfig::default()).unwrap();
    let names: Vec<&str> = library.iter().map(|icon| icon.name.as_str()).collect();
    assert_eq!(names, ["Ahri", "Garen"]);
    assert!(library.iter().all(|icon| icon.image.dimensions() == (13, 13)));
}

#[test]
fn test_library_missing_folder_is_empty() {
    let folder = IconFolder::new();
    let library =
        IconLibrary::load(&folder.path().join("nope"), 25, &IconConfig::default()).unwrap();
    assert!(library.is_empty());
}

#[test]
fn test_library_can_be_iterated_repeatedly() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let library = IconLibrary::load(folder.path(), 25, &IconConfig::default()).unwrap();
    assert_eq!(library.iter().count(), 1);
    assert_eq!(library.iter().count(), 1);
    assert!(library.get("Ahri").is_some());
    assert!(library.get("Zed").is_none());
}

#[test]
fn test_pixel_identical_icon_is_detected() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    folder.add_icon("Garen.png", 2);

    let mut frame = noise(280, 280, 99);
    let ahri = folder.template("Ahri.png", 25);
    paint(&mut frame, &ahri, 100, 60);

    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![frame]);
    let reports = collect(&backend, folder.config());

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.scores.len(), 2);
    assert_eq!(report.detections.len(), 1);

    let detection = &report.detections[0];
    assert_eq!(detection.champion, "Ahri");
    assert!(detection.confidence > 0.999, "{}", detection.confidence);
    assert_eq!((detection.bbox.x, detection.bbox.y), (100, 60));
    assert_eq!((detection.bbox.width, detection.bbox.height), (13, 13));
    assert!(detection.label().starts_with("Ahri (1.00"));
}

#[test]
fn test_every_icon_checked_on_every_frame() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    folder.add_icon("Garen.png", 2);
    let ahri = folder.template("Ahri.png", 25);
    let garen = folder.template("Garen.png", 25);

    let mut both = noise(280, 280, 7);
    paint(&mut both, &ahri, 10, 10);
    paint(&mut both, &garen, 200, 150);
    let mut only_garen = noise(280, 280, 8);
    paint(&mut only_garen, &garen, 40, 220);
    let neither = noise(280, 280, 9);

    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![both, only_garen, neither]);
    let reports = collect(&backend, folder.config());

    let found: Vec<Vec<&str>> = reports
        .iter()
        .map(|r| r.detections.iter().map(|d| d.champion.as_str()).collect())
        .collect();
    assert_eq!(found, vec![vec!["Ahri", "Garen"], vec!["Garen"], vec![]]);
    assert_eq!(reports.iter().map(|r| r.index).collect::<Vec<_>>(), [0, 1, 2]);
    assert!(reports.iter().all(|r| r.scores.len() == 2));
}

#[test]
fn test_icon_size_follows_minimap_resolution() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    // 187px minimap -> 16px icons -> 8px templates
    let ahri = folder.template("Ahri.png", 16);
    assert_eq!(ahri.dimensions(), (8, 8));

    let mut frame = noise(187, 187, 3);
    paint(&mut frame, &ahri, 90, 33);
    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![frame]);

    let session = ChampionIconMatcher::new(folder.config())
        .open(&backend, Path::new(VIDEO))
        .unwrap();
    assert_eq!(session.icon_size(), 16);

    let reports: Vec<FrameReport> = session.map(|r| r.unwrap()).collect();
    let detection = reports[0].best_detection().unwrap();
    assert_eq!((detection.bbox.x, detection.bbox.y), (90, 33));
}

#[test]
fn test_oversized_icons_are_skipped_not_fatal() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let config = MatchConfig {
        icons: IconConfig {
            folder: folder.path().to_path_buf(),
            // Icon side twice the minimap side, nothing trimmed
            icon_ratio: Ratio::new(2, 1),
            search_ratio: 0.0,
            ..IconConfig::default()
        },
        ..MatchConfig::default()
    };

    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![noise(50, 50, 1), noise(50, 50, 2)]);
    let reports = collect(&backend, config);

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.scores.is_empty() && r.detections.is_empty()));
}

#[test]
fn test_no_icons_stops_before_streaming() {
    let folder = IconFolder::new();
    folder.add_raw("readme.txt", b"put icons here");

    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![noise(280, 280, 1)]);
    let err = ChampionIconMatcher::new(folder.config())
        .open(&backend, Path::new(VIDEO))
        .err()
        .expect("no icons is fatal");

    assert!(matches!(err, VisionError::NoIcons { .. }));
    assert_eq!(err.kind(), ErrorKind::AssetMissing);
    assert_eq!(backend.open_handles(), 0);
}

#[test]
fn test_unreadable_and_empty_videos() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let backend = MemoryBackend::new();
    let matcher = ChampionIconMatcher::new(folder.config());

    let err = matcher.open(&backend, Path::new("missing.mp4")).err().unwrap();
    assert!(matches!(err, VisionError::VideoOpen { .. }));

    backend.insert_clip(VIDEO, 30.0, Vec::new());
    let err = matcher.open(&backend, Path::new(VIDEO)).err().unwrap();
    assert!(matches!(err, VisionError::EmptyVideo { .. }));
    assert_eq!(err.kind(), ErrorKind::SourceUnreadable);
}

#[test]
fn test_session_states() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![noise(280, 280, 1), noise(280, 280, 2)]);

    let mut session = ChampionIconMatcher::new(folder.config())
        .open(&backend, Path::new(VIDEO))
        .unwrap();
    assert_eq!(session.state(), MatchState::Streaming);
    assert!(session.next().is_some());
    assert!(session.next().is_some());
    assert!(session.next().is_none());
    assert_eq!(session.state(), MatchState::Done);
    assert!(session.state().is_terminal());
    // Exhausted sessions stay exhausted
    assert!(session.next().is_none());
}

#[test]
fn test_consumer_break_stops_run() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let backend = MemoryBackend::new();
    let frames = (0..4).map(|i| noise(280, 280, i)).collect();
    backend.insert_clip(VIDEO, 30.0, frames);

    let session = ChampionIconMatcher::new(folder.config())
        .open(&backend, Path::new(VIDEO))
        .unwrap();
    let mut seen = Vec::new();
    let summary = session
        .run(&mut |report: &FrameReport| -> VisionResult<ControlFlow<()>> {
            seen.push(report.index);
            Ok(if report.index == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .unwrap();

    assert_eq!(seen, [0, 1]);
    assert_eq!(summary.frames, 2);
    assert!(summary.interrupted);
    assert_eq!(backend.open_handles(), 0);
}

#[test]
fn test_run_to_exhaustion() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let ahri = folder.template("Ahri.png", 25);
    let mut frame = noise(280, 280, 5);
    paint(&mut frame, &ahri, 0, 0);

    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![frame.clone(), frame]);
    let summary = ChampionIconMatcher::new(folder.config())
        .open(&backend, Path::new(VIDEO))
        .unwrap()
        .run(&mut |_: &FrameReport| -> VisionResult<ControlFlow<()>> {
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.detections, 2);
    assert!(!summary.interrupted);
}

#[test]
fn test_consumer_error_aborts_run() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![noise(280, 280, 1), noise(280, 280, 2)]);

    let result = ChampionIconMatcher::new(folder.config())
        .open(&backend, Path::new(VIDEO))
        .unwrap()
        .run(&mut |_: &FrameReport| -> VisionResult<ControlFlow<()>> {
            Err(VisionError::backend_failure("test", "consumer gave up"))
        });
    assert!(matches!(result, Err(VisionError::Backend { .. })));
    assert_eq!(backend.open_handles(), 0);
}

#[test]
fn test_annotation_toggle() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let ahri = folder.template("Ahri.png", 25);
    let mut frame = noise(280, 280, 5);
    paint(&mut frame, &ahri, 30, 40);

    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![frame.clone()]);

    let annotated = collect(&backend, folder.config());
    let drawn = annotated[0].annotated.as_ref().expect("annotated frame");
    assert_eq!(drawn.dimensions(), frame.dimensions());
    assert_eq!(drawn.get_pixel(30, 40), &crate::champions::annotate::BOX_COLOR);

    let headless = MatchConfig {
        icons: folder.config().icons,
        ..create_headless_config()
    };
    let plain = collect(&backend, headless);
    assert!(plain[0].annotated.is_none());
    assert_eq!(plain[0].detections.len(), 1);
}

#[test]
fn test_threshold_is_configurable() {
    let folder = IconFolder::new();
    folder.add_icon("Ahri.png", 1);
    let ahri = folder.template("Ahri.png", 25);
    let mut frame = noise(280, 280, 5);
    paint(&mut frame, &ahri, 30, 40);

    let backend = MemoryBackend::new();
    backend.insert_clip(VIDEO, 30.0, vec![frame]);

    let strict = MatchConfig {
        threshold: 1.01,
        ..folder.config()
    };
    let reports = collect(&backend, strict);
    assert!(reports[0].detections.is_empty());
    // Scores are still reported for telemetry
    assert!(reports[0].scores[0].score > 0.999);
}

#[test]
fn test_backend_trait_object_usable() {
    let backend: Box<dyn VideoBackend> = Box::new(MemoryBackend::new());
    assert_eq!(backend.name(), "memory");
}
