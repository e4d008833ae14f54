//! Configuration management for the document view bridge

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::engine::EngineKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Size of the pool running file writes, exports and imports
    pub worker_threads: usize,
    /// Root that `asset:///` references resolve against
    pub asset_root: PathBuf,
    /// Mount point for `content://authority/path` references
    pub content_root: PathBuf,
    /// Scratch space for materialized assets and imports
    pub cache_dir: PathBuf,
    /// Destination of annotation and form field exports
    pub export_dir: PathBuf,
    pub engine: EngineKind,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            bridge: BridgeConfig::default(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            worker_threads: 4,
            asset_root: PathBuf::from("./assets"),
            content_root: PathBuf::from("./content"),
            cache_dir: env::temp_dir().join("docview-bridge"),
            export_dir: PathBuf::from("./exports"),
            engine: EngineKind::Auto,
        }
    }
}

impl BridgeConfig {
    /// Everything rooted under one directory. Handy for tests.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        BridgeConfig {
            worker_threads: 2,
            asset_root: root.join("assets"),
            content_root: root.join("content"),
            cache_dir: root.join("cache"),
            export_dir: root.join("exports"),
            engine: EngineKind::Auto,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = BridgeConfig::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            bridge: BridgeConfig {
                worker_threads: env::var("BRIDGE_WORKER_THREADS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.worker_threads),
                asset_root: env::var("BRIDGE_ASSET_ROOT").map(PathBuf::from).unwrap_or(defaults.asset_root),
                content_root: env::var("BRIDGE_CONTENT_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.content_root),
                cache_dir: env::var("BRIDGE_CACHE_DIR").map(PathBuf::from).unwrap_or(defaults.cache_dir),
                export_dir: env::var("BRIDGE_EXPORT_DIR").map(PathBuf::from).unwrap_or(defaults.export_dir),
                engine: match env::var("BRIDGE_ENGINE").unwrap_or_else(|_| "auto".to_string()).as_str() {
                    "memory" => EngineKind::Memory,
                    "mupdf" => EngineKind::Mupdf,
                    _ => EngineKind::Auto,
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.bridge.worker_threads, 4);
        assert_eq!(config.bridge.engine, EngineKind::Auto);
    }

    #[test]
    fn test_rooted_at() {
        let bridge = BridgeConfig::rooted_at("/tmp/x");
        assert_eq!(bridge.cache_dir, PathBuf::from("/tmp/x/cache"));
        assert_eq!(bridge.export_dir, PathBuf::from("/tmp/x/exports"));
    }
}
