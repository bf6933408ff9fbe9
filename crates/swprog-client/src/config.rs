//! Configuration types for swprog.
//! Parsed from ~/.config/swprog/config.toml.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use swprog_protocol::{ByteOrder, FrameLayout, DEFAULT_FRAME_WIDTH};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub endpoint: EndpointSection,
    #[serde(default)]
    pub protocol: ProtocolSection,
    #[serde(default)]
    pub monitor: MonitorSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointSection {
    /// Progress socket path. Unset means the daemon's default location.
    pub socket: Option<String>,
}

/// Must match the daemon build: there is no negotiation on the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSection {
    #[serde(default = "default_frame_width")]
    pub frame_width: usize,
    #[serde(default)]
    pub byte_order: ByteOrder,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        Self {
            frame_width: DEFAULT_FRAME_WIDTH,
            byte_order: ByteOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSection {
    #[serde(default)]
    pub wait: bool,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub color: bool,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            wait: false,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            quiet: false,
            color: false,
        }
    }
}

fn default_frame_width() -> usize {
    DEFAULT_FRAME_WIDTH
}
fn default_reconnect_delay_ms() -> u64 {
    1000
}

impl ClientConfig {
    /// Load config from file, or use defaults if missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ClientConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn layout(&self) -> swprog_protocol::Result<FrameLayout> {
        FrameLayout::new(self.protocol.frame_width, self.protocol.byte_order)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.monitor.reconnect_delay_ms)
    }
}
