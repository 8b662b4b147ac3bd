//! Image URL resolution for catalog cards.
//!
//! Each source is a small resolver returning `Option<String>`; the chains are
//! probed in order and the first hit wins.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Images;
use crate::model::{BatchEntry, FileKind, PreviewImage, TypeInfo};

pub const STATIC_ASSET_BASE: &str = "https://static.pw.live/";
pub const FALLBACK_IMAGE_URL: &str =
    "https://static.pw.live/5eb393ee95fab7468a79d189/9ef3bea0-6eed-46a8-b148-4a35dd6b3b61.png";

static ABSOLUTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://").expect("static regex"));

type PopularResolver = fn(&TypeInfo, &Images) -> Option<String>;

const POPULAR_CHAIN: [PopularResolver; 5] = [
    first_image_file,
    first_video_thumbnail,
    first_non_video_file,
    joined_preview_image,
    preview_image_path,
];

/// Resolve the image for a popular entry. `None` means render the placeholder glyph.
pub fn popular_image_url(info: &TypeInfo, images: &Images) -> Option<String> {
    POPULAR_CHAIN.iter().find_map(|resolve| resolve(info, images))
}

/// Resolve the image for a regular batch; always yields a URL.
pub fn batch_image_url(batch: &BatchEntry, images: &Images) -> String {
    concatenated_preview_image(batch)
        .or_else(|| non_empty(batch.image.as_deref()))
        .unwrap_or_else(|| images.fallback.clone())
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

fn first_image_file(info: &TypeInfo, _: &Images) -> Option<String> {
    let files = &info.card.as_ref()?.files;
    let file = files.iter().find(|f| f.kind == FileKind::IMAGE)?;
    non_empty(file.url.as_deref())
}

fn first_video_thumbnail(info: &TypeInfo, _: &Images) -> Option<String> {
    let files = &info.card.as_ref()?.files;
    let file = files.iter().find(|f| f.kind == FileKind::VIDEO)?;
    non_empty(file.video.as_ref()?.image.as_deref())
}

fn first_non_video_file(info: &TypeInfo, _: &Images) -> Option<String> {
    let file = info.card.as_ref()?.files.first()?;
    if file.kind == FileKind::VIDEO {
        return None;
    }
    non_empty(file.url.as_deref())
}

fn preview_parts(preview: Option<&PreviewImage>) -> Option<(&str, &str)> {
    let preview = preview?;
    let base = preview.base_url.as_deref().filter(|s| !s.is_empty())?;
    let key = preview.key.as_deref().filter(|s| !s.is_empty())?;
    Some((base, key))
}

/// `baseUrl` + `key` with exactly one slash at the seam.
fn joined_preview_image(info: &TypeInfo, _: &Images) -> Option<String> {
    let (base, key) = preview_parts(info.preview_image.as_ref())?;
    Some(join_with_slash(base, key))
}

fn preview_image_path(info: &TypeInfo, images: &Images) -> Option<String> {
    let path = non_empty(info.preview_image_url.as_deref())?;
    if ABSOLUTE_URL.is_match(&path) {
        Some(path)
    } else {
        Some(format!("{}{}", images.static_base, path))
    }
}

fn concatenated_preview_image(batch: &BatchEntry) -> Option<String> {
    let (base, key) = preview_parts(batch.preview_image.as_ref())?;
    Some(format!("{}{}", base, key))
}

pub fn join_with_slash(base: &str, key: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let key = key.strip_prefix('/').unwrap_or(key);
    format!("{}/{}", base, key)
}

/// What an image element currently shows after load failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    Resolved(String),
    Fallback(String),
    Placeholder,
}

impl ImageSlot {
    pub fn new(resolved: Option<String>) -> Self {
        match resolved {
            Some(url) => ImageSlot::Resolved(url),
            None => ImageSlot::Placeholder,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ImageSlot::Resolved(u) | ImageSlot::Fallback(u) => Some(u.as_str()),
            ImageSlot::Placeholder => None,
        }
    }

    /// Advance after the current source failed to load. Terminal at `Placeholder`.
    pub fn on_load_error(self, fallback: &str) -> Self {
        match self {
            ImageSlot::Resolved(_) => ImageSlot::Fallback(fallback.to_string()),
            ImageSlot::Fallback(_) | ImageSlot::Placeholder => ImageSlot::Placeholder,
        }
    }
}
