use async_trait::async_trait;
use tauri::{Runtime, WebviewWindow};

use crate::error::PlatformError;
use crate::platform::{DragPlatform, DragSession};

/// Starts drags from a webview window through the `drag` crate.
pub struct WindowPlatform<R: Runtime> {
    window: WebviewWindow<R>,
}

impl<R: Runtime> WindowPlatform<R> {
    pub fn new(window: WebviewWindow<R>) -> Self {
        Self { window }
    }
}

#[async_trait]
impl<R: Runtime> DragPlatform for WindowPlatform<R> {
    fn density(&self) -> f64 {
        self.window.scale_factor().unwrap_or_else(|err| {
            log::warn!("Failed to read scale factor of '{}': {}", self.window.label(), err);
            1.0
        })
    }

    fn perform_haptic_feedback(&self) {
        // Desktop windows have no actuator to pulse
        log::trace!("Skipping haptic pulse for '{}'", self.window.label());
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    async fn start_drag(&self, session: DragSession) -> Result<(), PlatformError> {
        let png = crate::shadow::render_png(session.shadow.as_ref())
            .map_err(|e| PlatformError::Native(e.to_string()))?;

        log::info!(
            "Starting drag of {} ({}) global={} uri_read={}",
            session.clip.item.uri,
            session.clip.mime_types.join(","),
            session.flags.global,
            session.flags.global_uri_read
        );

        let (sender, receiver) = tokio::sync::oneshot::channel();
        let window = self.window.clone();
        let path = session.clip.item.path;
        self.window
            .run_on_main_thread(move || {
                let _ = sender.send(native::start(&window, path, png));
            })
            .map_err(|e| PlatformError::Native(e.to_string()))?;

        receiver.await.map_err(|_| PlatformError::Dispatch)?
    }

    #[cfg(any(target_os = "android", target_os = "ios"))]
    async fn start_drag(&self, _session: DragSession) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }
}

#[cfg(not(any(target_os = "android", target_os = "ios")))]
mod native {
    use std::path::PathBuf;
    use tauri::{Runtime, WebviewWindow};

    use crate::error::PlatformError;

    /// Must be called on the main thread.
    pub(super) fn start<R: Runtime>(
        window: &WebviewWindow<R>,
        path: PathBuf,
        png: Vec<u8>,
    ) -> Result<(), PlatformError> {
        let item = drag::DragItem::Files(vec![path]);
        let image = drag::Image::Raw(png);
        let on_drop = |result: drag::DragResult, _position: drag::CursorPosition| {
            log::debug!("Drag session finished: {:?}", result);
        };

        #[cfg(target_os = "linux")]
        let handle = window
            .gtk_window()
            .map_err(|_| PlatformError::NoWindow)?;
        #[cfg(not(target_os = "linux"))]
        let handle = window.clone();

        drag::start_drag(&handle, item, image, on_drop, drag::Options::default())
            .map_err(|e| PlatformError::Native(e.to_string()))
    }
}
