use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::PlatformError;
use crate::provider::ContentUri;
use crate::shadow::ShadowRenderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipItem {
    pub uri: ContentUri,
    /// Local file behind `uri`, for targets that take plain paths.
    pub path: PathBuf,
}

/// Single-item payload attached to a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipData {
    pub label: String,
    pub mime_types: Vec<String>,
    pub item: ClipItem,
}

impl ClipData {
    pub fn new(label: impl Into<String>, mime_type: impl Into<String>, item: ClipItem) -> Self {
        Self {
            label: label.into(),
            mime_types: vec![mime_type.into()],
            item,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragFlags {
    /// The drag may leave this app's windows.
    pub global: bool,
    /// Receivers outside this process may read the clip's URI.
    pub global_uri_read: bool,
}

impl DragFlags {
    pub const GLOBAL_WITH_URI_READ: Self = Self {
        global: true,
        global_uri_read: true,
    };
}

pub struct DragSession {
    pub clip: ClipData,
    pub shadow: Box<dyn ShadowRenderer>,
    pub flags: DragFlags,
}

/// Native side of a drag: window density, haptics and the drag-start call.
///
/// `start_drag` implementations must run the native call on the thread that
/// owns the UI; callers may be on any runtime worker.
#[async_trait]
pub trait DragPlatform: Send + Sync {
    /// Physical pixels per density-independent unit.
    fn density(&self) -> f64;

    fn perform_haptic_feedback(&self);

    async fn start_drag(&self, session: DragSession) -> Result<(), PlatformError>;
}
