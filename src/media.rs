use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Interpret the bridge's `type` / `mimeType` argument.
    ///
    /// Accepts either a bare kind (`"image"`, `"video"`) or a full MIME type
    /// (`"video/mp4"`). Anything that is not recognisably video is an image.
    pub fn from_type_hint(hint: &str) -> Self {
        let hint = hint.trim().to_ascii_lowercase();
        let top_level = hint.split('/').next().unwrap_or_default();
        if top_level == "video" {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    fn fallback_mime(self) -> &'static str {
        match self {
            MediaKind::Image => "image/*",
            MediaKind::Video => "video/*",
        }
    }
}

/// Pick the MIME type advertised on the clip.
///
/// An explicit MIME type from the caller wins; otherwise it is guessed from
/// the file name, and a wildcard of the media kind is used as a last resort.
pub fn resolve_mime(explicit: Option<&str>, file_name: &str, kind: MediaKind) -> String {
    if let Some(mime) = explicit.filter(|m| m.contains('/')) {
        return mime.trim().to_string();
    }

    let guessed = mime_guess::from_path(file_name)
        .iter()
        .find(|m| match kind {
            MediaKind::Image => m.type_() == mime_guess::mime::IMAGE,
            MediaKind::Video => m.type_() == mime_guess::mime::VIDEO,
        });

    match guessed {
        Some(mime) => mime.essence_str().to_string(),
        None => kind.fallback_mime().to_string(),
    }
}
