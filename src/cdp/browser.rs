//! Browser process lifecycle and the DevTools websocket transport.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};
use url::Url;

use super::protocol;
use super::{CdpError, Page};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Per-command response timeout.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
/// How long to wait for the DevTools endpoint after launch.
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(20);
const ENDPOINT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct Browser {
    ws: WsStream,
    next_id: u64,
    child: Child,
    user_data_dir: PathBuf,
}

impl Browser {
    /// Launch a Chromium instance with a throwaway profile and connect to
    /// its DevTools websocket.
    pub async fn launch(headless: bool) -> Result<Self, CdpError> {
        let executable = find_chromium()?;
        let user_data_dir =
            std::env::temp_dir().join(format!("tourcap-profile-{}", std::process::id()));
        std::fs::create_dir_all(&user_data_dir)?;
        // A crashed previous run can leave a stale port marker behind.
        let _ = std::fs::remove_file(user_data_dir.join("DevToolsActivePort"));

        info!("Launching browser: {}", executable.display());
        let mut command = Command::new(&executable);
        command
            .arg("--remote-debugging-port=0")
            .arg(format!("--user-data-dir={}", user_data_dir.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .arg("--window-size=1280,800")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if headless {
            command.arg("--headless=new");
        }
        let child = command.spawn()?;

        let port = wait_for_devtools_port(&user_data_dir).await?;
        let ws_url = discover_websocket_url(port).await?;
        debug!("DevTools endpoint: {}", ws_url);

        let (ws, _) = connect_async(ws_url.as_str()).await?;

        Ok(Self {
            ws,
            next_id: 0,
            child,
            user_data_dir,
        })
    }

    /// Send one command and read frames until its response arrives.
    /// Events are skipped; the driver is strictly sequential so no other
    /// response can interleave.
    pub async fn call(
        &mut self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<Value, CdpError> {
        self.next_id += 1;
        let id = self.next_id;
        let request = protocol::Request {
            id,
            method,
            params,
            session_id,
        };
        let encoded = serde_json::to_string(&request)?;
        trace!("cdp -> {}", encoded);
        self.ws.send(WsMessage::Text(encoded)).await?;

        let deadline = tokio::time::Instant::now() + COMMAND_TIMEOUT;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .ok_or_else(|| CdpError::ResponseTimeout {
                    method: method.to_string(),
                    seconds: COMMAND_TIMEOUT.as_secs(),
                })?;
            let frame = tokio::time::timeout(remaining, self.ws.next())
                .await
                .map_err(|_| CdpError::ResponseTimeout {
                    method: method.to_string(),
                    seconds: COMMAND_TIMEOUT.as_secs(),
                })?
                .ok_or_else(|| CdpError::Protocol("websocket closed by browser".to_string()))??;

            let text = match frame {
                WsMessage::Text(text) => text,
                _ => continue,
            };
            trace!("cdp <- {}", text);
            let message: protocol::Message = serde_json::from_str(&text)?;
            if message.id != Some(id) {
                continue;
            }
            if let Some(error) = message.error {
                return Err(CdpError::Command {
                    method: method.to_string(),
                    message: error.message,
                });
            }
            return Ok(message.result.unwrap_or(Value::Null));
        }
    }

    /// Open the single page/tab reused across all steps.
    pub async fn new_page(mut self) -> Result<Page, CdpError> {
        let result = self
            .call(None, "Target.createTarget", json!({"url": "about:blank"}))
            .await?;
        let target_id = result["targetId"]
            .as_str()
            .ok_or_else(|| CdpError::Protocol("Target.createTarget returned no targetId".to_string()))?
            .to_string();

        let result = self
            .call(
                None,
                "Target.attachToTarget",
                json!({"targetId": target_id, "flatten": true}),
            )
            .await?;
        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::Protocol("Target.attachToTarget returned no sessionId".to_string()))?
            .to_string();

        Ok(Page::new(self, session_id))
    }

    /// Close the browser and remove the throwaway profile. Safe on error
    /// paths: every failure here is ignored past the initial close request.
    pub async fn close(mut self) -> Result<(), CdpError> {
        let _ = self.call(None, "Browser.close", json!({})).await;
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
        if let Err(error) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!("Could not remove browser profile: {}", error);
        }
        Ok(())
    }
}

/// Locate the browser executable: `TOURCAP_CHROME`, then well-known names
/// on PATH, then fixed absolute locations.
fn find_chromium() -> Result<PathBuf, CdpError> {
    if let Ok(path) = std::env::var("TOURCAP_CHROME") {
        return Ok(PathBuf::from(path));
    }

    const NAMES: [&str; 5] = [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
    ];
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            for name in NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
    }

    const ABSOLUTE: [&str; 2] = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    for path in ABSOLUTE {
        if Path::new(path).is_file() {
            return Ok(PathBuf::from(path));
        }
    }

    Err(CdpError::BrowserNotFound)
}

/// With `--remote-debugging-port=0` the browser writes the chosen port to
/// `DevToolsActivePort` inside the profile directory. Poll for it.
async fn wait_for_devtools_port(user_data_dir: &Path) -> Result<u16, CdpError> {
    let marker = user_data_dir.join("DevToolsActivePort");
    let deadline = tokio::time::Instant::now() + ENDPOINT_TIMEOUT;

    loop {
        if let Ok(contents) = std::fs::read_to_string(&marker) {
            if let Some(port) = parse_devtools_port(&contents) {
                return Ok(port);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CdpError::EndpointTimeout(ENDPOINT_TIMEOUT.as_secs()));
        }
        tokio::time::sleep(ENDPOINT_POLL_INTERVAL).await;
    }
}

fn parse_devtools_port(contents: &str) -> Option<u16> {
    contents.lines().next()?.trim().parse().ok()
}

/// The browser-level websocket url, from the DevTools HTTP API.
async fn discover_websocket_url(port: u16) -> Result<Url, CdpError> {
    let version: Value = reqwest::get(format!("http://127.0.0.1:{}/json/version", port))
        .await?
        .json()
        .await?;
    let ws_url = version["webSocketDebuggerUrl"]
        .as_str()
        .ok_or_else(|| CdpError::Protocol("missing webSocketDebuggerUrl".to_string()))?;
    Ok(Url::parse(ws_url)?)
}
