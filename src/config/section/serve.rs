//! `[serve]` section: where the dev server listens and stages its output.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"   # "0.0.0.0" exposes the server on the LAN
//! port = 8080               # next free port is used when taken
//! output = ".dudu"          # removed again on clean shutdown
//! ```

use std::{
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub interface: IpAddr,
    /// First port tried.
    pub port: u16,
    /// Transient build output, served and then deleted.
    pub output: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            output: PathBuf::from(".dudu"),
        }
    }
}
