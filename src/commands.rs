use serde_json::{Map, Value};
use tauri::{command, AppHandle, Runtime, WebviewWindow};

use crate::bridge::BridgeResponse;
use crate::MediaDragExt;

/// The drag channel: `invoke('plugin:media-drag|dispatch', { method, args })`.
#[command]
pub async fn dispatch<R: Runtime>(
    app: AppHandle<R>,
    window: WebviewWindow<R>,
    method: String,
    args: Option<Map<String, Value>>,
) -> BridgeResponse {
    let bridge = app.media_drag().bridge(window);
    bridge.handle(&method, &args.unwrap_or_default()).await
}
