use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use crate::config::ShadowBounds;
use crate::error::DragFailure;
use crate::fetch::{self, RemoteFetcher};
use crate::media::{self, MediaKind};
use crate::platform::{ClipData, ClipItem, DragFlags, DragPlatform, DragSession};
use crate::provider::UriExposer;
use crate::shadow;

pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    Local(PathBuf),
    Remote(Url),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragRequest {
    pub source: DragSource,
    pub media_kind: MediaKind,
    pub mime_type: String,
}

impl DragRequest {
    pub fn local(path: impl Into<PathBuf>, type_hint: Option<&str>) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        Self::with_hints(DragSource::Local(path), &name, type_hint, None)
    }

    fn from_args(args: &Map<String, Value>) -> Result<Self, DecodeError> {
        let path = non_blank(string_arg(args, &["path", "imagePath"])?);
        let url = non_blank(string_arg(args, &["url"])?);
        let type_hint = string_arg(args, &["type"])?;
        let mime_hint = string_arg(args, &["mimeType"])?;

        let (raw, from_url) = match (path, url) {
            (Some(path), _) => (path, false),
            (None, Some(url)) => (url, true),
            (None, None) => {
                return Err(DecodeError::InvalidArguments("path is required".to_string()));
            }
        };

        let (source, name) = match fetch::parse_remote(raw) {
            Some(url) => {
                let name = fetch::cache_file_name(&url).unwrap_or_default();
                (DragSource::Remote(url), name)
            }
            None if from_url => {
                return Err(DecodeError::InvalidArguments(format!(
                    "url must be http or https: {raw}"
                )));
            }
            None => {
                let path = PathBuf::from(raw);
                let name = file_name_of(&path);
                (DragSource::Local(path), name)
            }
        };

        Ok(Self::with_hints(source, &name, type_hint, mime_hint))
    }

    fn with_hints(
        source: DragSource,
        file_name: &str,
        type_hint: Option<&str>,
        mime_hint: Option<&str>,
    ) -> Self {
        let media_kind = MediaKind::from_type_hint(type_hint.or(mime_hint).unwrap_or("image"));
        let mime_type = media::resolve_mime(mime_hint.or(type_hint), file_name, media_kind);
        Self {
            source,
            media_kind,
            mime_type,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First present string argument among `keys`; `null` counts as absent.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn string_arg<'a>(args: &'a Map<String, Value>, keys: &[&str]) -> Result<Option<&'a str>, DecodeError> {
    for key in keys {
        match args.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(value)) => return Ok(Some(value.as_str())),
            Some(_) => {
                return Err(DecodeError::InvalidArguments(format!("{key} must be a string")));
            }
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    NotImplemented(String),
    InvalidArguments(String),
}

/// Methods understood on the drag channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    /// `startDrag { path, type? }`, answers `null` once the drag is live.
    StartDrag(DragRequest),
    /// `startDragDrop { imagePath, mimeType? }`, answers `true` once the drag is live.
    StartDragDrop(DragRequest),
}

impl BridgeRequest {
    pub const START_DRAG: &'static str = "startDrag";
    pub const START_DRAG_DROP: &'static str = "startDragDrop";

    pub fn decode(method: &str, args: &Map<String, Value>) -> Result<Self, DecodeError> {
        match method {
            Self::START_DRAG => DragRequest::from_args(args).map(BridgeRequest::StartDrag),
            Self::START_DRAG_DROP => DragRequest::from_args(args).map(BridgeRequest::StartDragDrop),
            other => Err(DecodeError::NotImplemented(other.to_string())),
        }
    }

    pub fn drag(&self) -> &DragRequest {
        match self {
            BridgeRequest::StartDrag(drag) | BridgeRequest::StartDragDrop(drag) => drag,
        }
    }

    fn into_parts(self) -> (DragRequest, Value) {
        match self {
            BridgeRequest::StartDrag(drag) => (drag, Value::Null),
            BridgeRequest::StartDragDrop(drag) => (drag, Value::Bool(true)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BridgeResponse {
    Success {
        value: Value,
    },
    Error {
        code: String,
        message: String,
        details: Option<Value>,
    },
    NotImplemented {
        method: String,
    },
}

impl BridgeResponse {
    pub fn success(value: Value) -> Self {
        BridgeResponse::Success { value }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeResponse::Error {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<DecodeError> for BridgeResponse {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::NotImplemented(method) => BridgeResponse::NotImplemented { method },
            DecodeError::InvalidArguments(message) => BridgeResponse::error(INVALID_ARGUMENTS, message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Validating,
    Fetching,
    Exposing,
    ShadowBuilding,
    DragStarted,
    Failed,
}

impl fmt::Display for DragState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DragState::Idle => "idle",
            DragState::Validating => "validating",
            DragState::Fetching => "fetching",
            DragState::Exposing => "exposing",
            DragState::ShadowBuilding => "shadow-building",
            DragState::DragStarted => "drag-started",
            DragState::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct StateTracker {
    id: String,
    state: DragState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: DragState::Idle,
        }
    }

    fn advance(&mut self, next: DragState) {
        log::debug!("drag {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }
}

/// Everything a drag needs that does not depend on the calling window.
#[derive(Debug, Clone)]
pub struct DragSettings {
    pub exposer: UriExposer,
    pub bounds: ShadowBounds,
    pub clip_label: String,
    pub fetcher: RemoteFetcher,
}

pub struct DragBridge<P: DragPlatform + 'static> {
    platform: Arc<P>,
    settings: Arc<DragSettings>,
}

impl<P: DragPlatform + 'static> Clone for DragBridge<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<P: DragPlatform + 'static> DragBridge<P> {
    pub fn new(platform: Arc<P>, settings: Arc<DragSettings>) -> Self {
        Self { platform, settings }
    }

    /// Decode and dispatch one channel message.
    pub async fn handle(&self, method: &str, args: &Map<String, Value>) -> BridgeResponse {
        match BridgeRequest::decode(method, args) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => {
                log::warn!("Rejected drag channel call '{}': {:?}", method, err);
                err.into()
            }
        }
    }

    pub async fn dispatch(&self, request: BridgeRequest) -> BridgeResponse {
        let (drag, started) = request.into_parts();

        if let DragSource::Remote(_) = drag.source {
            // The caller is answered now; the drag follows the download, if it succeeds
            drop(self.spawn(drag));
            return BridgeResponse::success(Value::Null);
        }

        match self.run(drag).await {
            Ok(()) => BridgeResponse::success(started),
            Err(_) => BridgeResponse::success(Value::Bool(false)),
        }
    }

    /// Run a drag request on a background task.
    pub fn spawn(&self, request: DragRequest) -> JoinHandle<Result<(), DragFailure>> {
        let bridge = self.clone();
        tokio::spawn(async move { bridge.run(request).await })
    }

    /// Drive one request to `DragStarted` or `Failed`.
    pub async fn run(&self, request: DragRequest) -> Result<(), DragFailure> {
        let mut tracker = StateTracker::new();
        tracker.advance(DragState::Validating);

        let result = self.drive(&mut tracker, request).await;
        match &result {
            Ok(()) => tracker.advance(DragState::DragStarted),
            Err(err) => {
                tracker.advance(DragState::Failed);
                log::warn!("Drag {} did not start: {}", tracker.id, err);
            }
        }
        result
    }

    async fn drive(&self, tracker: &mut StateTracker, request: DragRequest) -> Result<(), DragFailure> {
        let path = match request.source {
            DragSource::Local(path) => {
                if !path.exists() {
                    return Err(DragFailure::ResourceMissing(path));
                }
                path
            }
            DragSource::Remote(url) => {
                tracker.advance(DragState::Fetching);
                self.settings.fetcher.fetch(&url).await?
            }
        };

        tracker.advance(DragState::Exposing);
        let uri = self.settings.exposer.expose(&path)?;
        let clip = ClipData::new(
            self.settings.clip_label.clone(),
            request.mime_type,
            ClipItem {
                uri,
                path: path.clone(),
            },
        );

        tracker.advance(DragState::ShadowBuilding);
        let density = self.platform.density();
        let bounds = self.settings.bounds;
        let kind = request.media_kind;
        let built = tokio::task::spawn_blocking(move || shadow::build(&path, kind, bounds, density))
            .await
            .map_err(|e| DragFailure::Task(e.to_string()))?;

        self.platform.perform_haptic_feedback();
        self.platform
            .start_drag(DragSession {
                clip,
                shadow: built.renderer,
                flags: DragFlags::GLOBAL_WITH_URI_READ,
            })
            .await?;

        Ok(())
    }
}
