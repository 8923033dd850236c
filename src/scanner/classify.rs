//! Media classification from file signatures.
//!
//! The walker calls a [`Classifier`] once per regular file, outside the
//! gate and outside the registry lock. The default [`MagicClassifier`]
//! reads the first [`HEADER_LEN`] bytes and hands them to [`infer`]; the
//! matcher family decides the [`MediaKind`].
//!
//! Images get two more probes: pixel dimensions through the `image` crate
//! and the EXIF block through `kamadak-exif`. A failed probe is reported in
//! [`Probe::metadata_error`] and never turns into a [`ClassifyError`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ClassifyError;

/// Bytes read from the start of a file for signature matching.
pub const HEADER_LEN: usize = 261;

/// Coarse media type of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    #[default]
    Other,
}

impl MediaKind {
    /// Image, audio or video.
    #[must_use]
    pub fn is_media(self) -> bool {
        !matches!(self, Self::Other)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a file is, as far as its signature tells.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub kind: MediaKind,
    /// Full MIME value, e.g. `image/png`. Empty when unknown.
    pub mime: String,
    /// Canonical extension for the detected format, without the dot.
    pub extension: String,
}

impl Classification {
    /// The empty classification used when a file could not be read.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    fn detected(kind: MediaKind, mime: &str, extension: &str) -> Self {
        Self {
            kind,
            mime: mime.to_string(),
            extension: extension.to_string(),
        }
    }

    /// Part of the MIME value after the slash (`png` for `image/png`).
    #[must_use]
    pub fn mime_subtype(&self) -> &str {
        self.mime.split_once('/').map_or("", |(_, sub)| sub)
    }

    #[must_use]
    pub fn is_media(&self) -> bool {
        self.kind.is_media()
    }
}

/// EXIF fields of the primary image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifData {
    /// `DateTimeOriginal`, in the camera's local time.
    pub datetime_original: Option<NaiveDateTime>,
    /// Every primary-IFD field, tag name to display value.
    pub tags: BTreeMap<String, String>,
}

impl ExifData {
    fn from_exif(data: &exif::Exif) -> Self {
        let tags = data
            .fields()
            .filter(|f| f.ifd_num == exif::In::PRIMARY)
            .map(|f| (f.tag.to_string(), f.display_value().with_unit(data).to_string()))
            .collect();

        let datetime_original = data
            .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
            .and_then(|field| match field.value {
                exif::Value::Ascii(ref lines) => lines.first(),
                _ => None,
            })
            .and_then(|ascii| exif::DateTime::from_ascii(ascii).ok())
            .and_then(|dt| {
                NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
                    .and_hms_opt(u32::from(dt.hour), u32::from(dt.minute), u32::from(dt.second))
            });

        Self {
            datetime_original,
            tags,
        }
    }
}

/// Header-level metadata for media files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Pixel dimensions `(width, height)` for decodable image formats.
    pub dimensions: Option<(u32, u32)>,
    /// EXIF block, when the image carries one.
    pub exif: Option<ExifData>,
}

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Probe {
    pub classification: Classification,
    pub metadata: MediaMetadata,
    /// Set when the metadata probe failed. The classification is still valid.
    pub metadata_error: Option<String>,
}

/// Classifies a file by content.
///
/// Implementations must be pure queries: no state changes visible to the
/// scan, safe to call from any walker thread.
pub trait Classifier: Send + Sync {
    /// Classify the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] when the file cannot be opened or read.
    fn classify(&self, path: &Path) -> Result<Probe, ClassifyError>;
}

/// Signature-based classifier (first 261 bytes).
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicClassifier;

impl MagicClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for MagicClassifier {
    fn classify(&self, path: &Path) -> Result<Probe, ClassifyError> {
        let file = File::open(path).map_err(|e| ClassifyError::from_io(path, e))?;
        let mut header = Vec::with_capacity(HEADER_LEN);
        file.take(HEADER_LEN as u64)
            .read_to_end(&mut header)
            .map_err(|e| ClassifyError::from_io(path, e))?;

        let mut probe = Probe {
            classification: sniff(&header),
            ..Probe::default()
        };
        if probe.classification.kind != MediaKind::Image {
            return Ok(probe);
        }

        let mut failures = Vec::new();
        if let Ok(format) = image::guess_format(&header) {
            if format.reading_enabled() {
                match probe_dimensions(path, format) {
                    Ok(dims) => probe.metadata.dimensions = Some(dims),
                    Err(e) => failures.push(format!("dimensions: {e}")),
                }
            }
        }
        if carries_exif(&probe.classification.mime) {
            match read_exif(path) {
                Ok(exif) => probe.metadata.exif = exif,
                Err(e) => failures.push(format!("exif: {e}")),
            }
        }

        if !failures.is_empty() {
            let message = failures.join("; ");
            log::debug!("Metadata probe failed for {}: {}", path.display(), message);
            probe.metadata_error = Some(message);
        }
        Ok(probe)
    }
}

fn probe_dimensions(path: &Path, format: image::ImageFormat) -> image::ImageResult<(u32, u32)> {
    let mut reader = image::ImageReader::open(path)?;
    reader.set_format(format);
    reader.into_dimensions()
}

// Containers kamadak-exif can read.
fn carries_exif(mime: &str) -> bool {
    matches!(
        mime,
        "image/jpeg" | "image/png" | "image/tiff" | "image/webp" | "image/heif"
    )
}

/// Read the EXIF block of `path`. An image without one yields `Ok(None)`.
fn read_exif(path: &Path) -> Result<Option<ExifData>, exif::Error> {
    let mut reader = BufReader::new(File::open(path)?);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(Some(ExifData::from_exif(&exif))),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Classify a header buffer.
#[must_use]
pub fn sniff(header: &[u8]) -> Classification {
    let Some(detected) = infer::get(header) else {
        return Classification::unknown();
    };
    let kind = match detected.matcher_type() {
        infer::MatcherType::Image => MediaKind::Image,
        infer::MatcherType::Audio => MediaKind::Audio,
        infer::MatcherType::Video => MediaKind::Video,
        _ => MediaKind::Other,
    };
    Classification::detected(kind, detected.mime_type(), detected.extension())
}
