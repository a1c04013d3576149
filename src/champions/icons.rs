//! Champion icon library loading and preprocessing

use super::config::IconConfig;
use crate::error::VisionResult;
use crate::geometry::Ratio;
use crate::template_matching::to_luma;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};

/// A preprocessed icon ready for matching
#[derive(Debug, Clone, PartialEq)]
pub struct IconTemplate {
    /// Champion display name, taken verbatim from the file stem
    pub name: String,
    pub image: GrayImage,
}

impl IconTemplate {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the template fits inside a `width × height` frame
    pub fn fits_in(&self, width: u32, height: u32) -> bool {
        self.width() <= width && self.height() <= height
    }
}

/// Icon side length for a minimap frame: `floor(min(width, height) × ratio)`.
pub fn icon_size_for(width: u32, height: u32, ratio: &Ratio) -> u32 {
    ratio.floor_of(width.min(height))
}

/// Pixels trimmed from each side of a resized icon: `floor(icon_size × search_ratio / 2)`.
pub fn crop_margin(icon_size: u32, search_ratio: f64) -> u32 {
    let margin = (f64::from(icon_size) * search_ratio / 2.0).floor();
    if margin.is_finite() && margin > 0.0 {
        margin as u32
    } else {
        0
    }
}

/// Resize to `icon_size × icon_size` with cubic interpolation, trim the margin
/// from every side and convert to luma. Alpha is dropped, not blended.
///
/// Returns `None` when nothing would be left after trimming.
pub fn preprocess_icon(icon: &DynamicImage, icon_size: u32, search_ratio: f64) -> Option<GrayImage> {
    let margin = crop_margin(icon_size, search_ratio);
    let kept = margin
        .checked_mul(2)
        .and_then(|trimmed| icon_size.checked_sub(trimmed))
        .filter(|&kept| kept > 0)?;

    let rgb = icon.to_rgb8();
    let resized = image::imageops::resize(&rgb, icon_size, icon_size, FilterType::CatmullRom);
    let trimmed = image::imageops::crop_imm(&resized, margin, margin, kept, kept).to_image();
    Some(to_luma(&trimmed))
}

/// Ordered set of champion templates loaded from one folder
#[derive(Debug, Clone, Default)]
pub struct IconLibrary {
    folder: PathBuf,
    icon_size: u32,
    icons: Vec<IconTemplate>,
}

impl IconLibrary {
    /// Scan `folder` for icons and preprocess them for `icon_size`.
    ///
    /// Entries are visited in file-name order. Files with another extension are
    /// ignored; unreadable or corrupt images are logged and skipped. A missing
    /// folder gives an empty library.
    pub fn load(folder: &Path, icon_size: u32, config: &IconConfig) -> VisionResult<Self> {
        let mut library = Self {
            folder: folder.to_path_buf(),
            icon_size,
            icons: Vec::new(),
        };

        let entries = match std::fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("⚠️ Icon folder not found: {:?}", folder);
                return Ok(library);
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| has_extension(path, &config.extension) && path.is_file())
            .collect();
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                log::warn!("⚠️ Skipping icon with non UTF-8 name: {:?}", path);
                continue;
            };
            let icon = match read_icon(&path) {
                Ok(icon) => icon,
                Err(e) => {
                    log::warn!("⚠️ Failed to load icon {:?}: {}", path, e);
                    continue;
                }
            };
            match preprocess_icon(&icon, icon_size, config.search_ratio) {
                Some(image) => library.icons.push(IconTemplate {
                    name: name.to_string(),
                    image,
                }),
                None => log::warn!(
                    "⚠️ Icon {} is empty at {}px with search ratio {}",
                    name,
                    icon_size,
                    config.search_ratio
                ),
            }
        }

        log::debug!(
            "Loaded {} icons from {:?} at {}px",
            library.icons.len(),
            folder,
            icon_size
        );
        Ok(library)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn icon_size(&self) -> u32 {
        self.icon_size
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IconTemplate> {
        self.icons.iter()
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&IconTemplate> {
        self.icons.iter().find(|icon| icon.name == name)
    }
}

impl<'a> IntoIterator for &'a IconLibrary {
    type Item = &'a IconTemplate;
    type IntoIter = std::slice::Iter<'a, IconTemplate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Decode by content, so `AHRI.PNG` and mislabelled files still load
fn read_icon(path: &Path) -> image::ImageResult<DynamicImage> {
    image::ImageReader::open(path)?.with_guessed_format()?.decode()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
