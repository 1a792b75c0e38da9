use std::path::Path;
use std::sync::Arc;
use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Manager, Runtime, WebviewWindow,
};

pub mod bridge;
mod commands;
pub mod config;
mod desktop;
pub mod error;
pub mod fetch;
pub mod media;
pub mod platform;
pub mod provider;
pub mod shadow;

pub use bridge::{BridgeRequest, BridgeResponse, DragBridge, DragRequest, DragSettings, DragSource};
pub use config::{Config, ShadowBounds};
pub use desktop::WindowPlatform;
pub use error::{ConfigError, DragFailure};
pub use media::MediaKind;
pub use platform::{ClipData, DragFlags, DragPlatform, DragSession};
pub use provider::{ContentUri, UriExposer};

pub const PLUGIN_NAME: &str = "media-drag";

/// Managed state: the window-independent half of every drag.
pub struct MediaDrag {
    settings: Arc<DragSettings>,
}

impl MediaDrag {
    pub fn new(settings: DragSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &DragSettings {
        &self.settings
    }

    /// Bridge that starts drags from `window`.
    pub fn bridge<R: Runtime>(&self, window: WebviewWindow<R>) -> DragBridge<WindowPlatform<R>> {
        DragBridge::new(Arc::new(WindowPlatform::new(window)), self.settings.clone())
    }
}

pub trait MediaDragExt<R: Runtime> {
    fn media_drag(&self) -> &MediaDrag;
}

impl<R: Runtime, T: Manager<R>> MediaDragExt<R> for T {
    fn media_drag(&self) -> &MediaDrag {
        self.state::<MediaDrag>().inner()
    }
}

/// ffmpeg for video shadows lives here, under the app cache directory.
const FFMPEG_DIR_NAME: &str = "ffmpeg";

fn build_settings<R: Runtime>(
    app: &AppHandle<R>,
    config: &Config,
    cache_dir: &Path,
) -> Result<DragSettings, ConfigError> {
    let bounds = config.shadow_bounds()?;

    let data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| ConfigError::Directory {
            what: "data",
            reason: e.to_string(),
        })?;

    let mut exposer = UriExposer::for_package(&app.config().identifier, &config.authority_suffix)
        .with_root("cache", cache_dir)?
        .with_root("files", &data_dir)?;
    for (name, dir) in &config.roots {
        exposer = exposer.with_root(name.clone(), dir.clone())?;
    }

    Ok(DragSettings {
        exposer,
        bounds,
        clip_label: config.clip_label.clone(),
        fetcher: fetch::RemoteFetcher::new(cache_dir.join(&config.cache_dir_name)),
    })
}

/// Initializes the plugin.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
    Builder::<R, Option<Config>>::new(PLUGIN_NAME)
        .invoke_handler(tauri::generate_handler![commands::dispatch])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            let cache_dir = app
                .path()
                .app_cache_dir()
                .map_err(|e| ConfigError::Directory {
                    what: "cache",
                    reason: e.to_string(),
                })?;
            let settings = build_settings(app, &config, &cache_dir)?;
            log::info!(
                "media-drag ready: authority={}, shadow={}..{}dp, downloads={}",
                settings.exposer.authority(),
                settings.bounds.min_dp(),
                settings.bounds.max_dp(),
                settings.fetcher.cache_dir().display()
            );
            app.manage(MediaDrag::new(settings));

            // Off the drag path: until this finishes video drags use the default shadow
            let ffmpeg_dir = cache_dir.join(FFMPEG_DIR_NAME);
            tauri::async_runtime::spawn_blocking(move || match shadow::install_ffmpeg(&ffmpeg_dir) {
                Ok(binary) => log::debug!("Video shadows use {}", binary.display()),
                Err(err) => log::warn!("Video shadows disabled: {}", err),
            });
            Ok(())
        })
        .build()
}
