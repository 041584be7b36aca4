use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of archived media, derived from the declared MIME type at upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Document,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Video,
        MediaKind::Image,
        MediaKind::Audio,
        MediaKind::Document,
    ];

    /// String form used in the `media.media_type` column and the JSON API.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    /// Looks up a declared `Content-Type` in the upload allow-list.
    ///
    /// Parameters (`; charset=...`) are ignored and the comparison is
    /// case-insensitive.
    pub fn from_mime(content_type: &str) -> Option<MediaKind> {
        let essence = essence(content_type);
        ALLOWED_MIME_TYPES
            .iter()
            .find(|(mime, _)| *mime == essence)
            .map(|(_, kind)| *kind)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(MediaKind::Video),
            "image" => Ok(MediaKind::Image),
            "audio" => Ok(MediaKind::Audio),
            "document" => Ok(MediaKind::Document),
            _ => Err(format!("Unknown media type: {}", s)),
        }
    }
}

/// Upload allow-list: MIME type -> media kind.
pub const ALLOWED_MIME_TYPES: &[(&str, MediaKind)] = &[
    // Videos
    ("video/mp4", MediaKind::Video),
    ("video/webm", MediaKind::Video),
    ("video/ogg", MediaKind::Video),
    ("video/quicktime", MediaKind::Video),
    ("video/x-msvideo", MediaKind::Video),
    ("video/x-matroska", MediaKind::Video),
    // Images
    ("image/jpeg", MediaKind::Image),
    ("image/png", MediaKind::Image),
    ("image/gif", MediaKind::Image),
    ("image/webp", MediaKind::Image),
    ("image/svg+xml", MediaKind::Image),
    ("image/bmp", MediaKind::Image),
    // Audio
    ("audio/mpeg", MediaKind::Audio),
    ("audio/ogg", MediaKind::Audio),
    ("audio/wav", MediaKind::Audio),
    ("audio/webm", MediaKind::Audio),
    ("audio/flac", MediaKind::Audio),
    // Documents
    ("application/pdf", MediaKind::Document),
];

pub fn allowed_mime_types() -> Vec<&'static str> {
    ALLOWED_MIME_TYPES.iter().map(|(mime, _)| *mime).collect()
}

/// `"Video/MP4; codecs=avc1"` -> `"video/mp4"`
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Normalizes a user-supplied tag list into the stored comma-joined form.
/// Returns `None` when nothing is left after trimming.
pub fn join_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let tags: Vec<&str> = tags
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_allowed_type_maps_to_its_kind() {
        for (mime, kind) in ALLOWED_MIME_TYPES {
            assert_eq!(MediaKind::from_mime(mime), Some(*kind));
        }
        assert_eq!(allowed_mime_types().len(), ALLOWED_MIME_TYPES.len());
    }

    #[test]
    fn mime_parameters_and_case_are_ignored() {
        assert_eq!(
            MediaKind::from_mime("Video/MP4; codecs=avc1"),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_mime(" image/png "), Some(MediaKind::Image));
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert_eq!(MediaKind::from_mime("application/zip"), None);
        assert_eq!(MediaKind::from_mime("text/html"), None);
        assert_eq!(MediaKind::from_mime(""), None);
    }

    #[test]
    fn kind_string_form_roundtrips_through_serde() {
        for kind in MediaKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<MediaKind>().unwrap(), kind);
        }
        assert!("podcast".parse::<MediaKind>().is_err());
    }

    #[test]
    fn tags_are_trimmed_and_empties_dropped() {
        assert_eq!(
            join_tags("vhs, 1994 ,,commercial ".split(',')),
            Some("vhs,1994,commercial".to_string())
        );
        assert_eq!(join_tags(" , ".split(',')), None);
    }
}
