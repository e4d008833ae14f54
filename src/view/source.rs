//! Document references and where they live on disk
//!
//! Hosts name documents four ways:
//!
//! - `asset:///name.pdf` or `file:///android_asset/name.pdf`: a bundled
//!   asset, copied into the cache before the engine sees it
//! - `content://authority/path`: a content-provider reference, mounted
//!   under the content root
//! - `file:///abs/path.pdf`: a file URL, percent-decoded
//! - anything else: a bare path, passed through

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::BridgeConfig;
use crate::engine::{Engine, EngineDocument};
use crate::error::{BridgeError, Result};

const ASSET_SCHEMES: [&str; 2] = ["asset:///", "file:///android_asset/"];
const CONTENT_SCHEME: &str = "content://";
const FILE_SCHEME: &str = "file://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentUri {
    Asset(PathBuf),
    Content { authority: String, path: PathBuf },
    File(PathBuf),
    Path(PathBuf),
}

impl DocumentUri {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(BridgeError::InvalidArgument("empty document path".to_string()));
        }

        if let Some(name) = ASSET_SCHEMES.iter().find_map(|scheme| raw.strip_prefix(scheme)) {
            return Ok(DocumentUri::Asset(relative(&decode(name)?)?));
        }

        if let Some(rest) = raw.strip_prefix(CONTENT_SCHEME) {
            let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
            if authority.is_empty() || path.is_empty() {
                return Err(BridgeError::InvalidArgument(format!("malformed content uri: {}", raw)));
            }
            relative(authority)?;
            return Ok(DocumentUri::Content {
                authority: authority.to_string(),
                path: relative(&decode(path)?)?,
            });
        }

        if let Some(path) = raw.strip_prefix(FILE_SCHEME) {
            return Ok(DocumentUri::File(PathBuf::from(decode(path)?)));
        }

        Ok(DocumentUri::Path(PathBuf::from(raw)))
    }
}

fn decode(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| BridgeError::InvalidArgument(format!("invalid percent-encoding in '{}': {}", raw, e)))
}

/// A relative path that cannot escape its root
fn relative(raw: &str) -> Result<PathBuf> {
    let path = PathBuf::from(raw.trim_start_matches('/'));
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || path.as_os_str().is_empty() {
        return Err(BridgeError::InvalidArgument(format!("path escapes its root: {}", raw)));
    }
    Ok(path)
}

/// Turns document references into engine-readable paths
#[derive(Debug, Clone)]
pub struct UriResolver {
    asset_root: PathBuf,
    content_root: PathBuf,
    cache_dir: PathBuf,
    export_dir: PathBuf,
}

impl UriResolver {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            asset_root: config.asset_root.clone(),
            content_root: config.content_root.clone(),
            cache_dir: config.cache_dir.clone(),
            export_dir: config.export_dir.clone(),
        }
    }

    /// Path to open a document from. Assets are copied into the cache first.
    pub fn resolve(&self, uri: &DocumentUri) -> Result<PathBuf> {
        match uri {
            DocumentUri::Asset(name) => self.materialize_asset(name),
            DocumentUri::Content { authority, path } => Ok(self.content_root.join(authority).join(path)),
            DocumentUri::File(path) | DocumentUri::Path(path) => Ok(path.clone()),
        }
    }

    /// Path to import pages from. Content references are copied into the
    /// cache so the engine never reads through the provider mount.
    pub fn materialize_import(&self, uri: &DocumentUri) -> Result<PathBuf> {
        match uri {
            DocumentUri::Content { authority, path } => {
                let source = self.content_root.join(authority).join(path);
                copy_into(&source, &self.cache_dir.join("imports").join(authority).join(path))
            }
            _ => self.resolve(uri),
        }
    }

    /// Path to write a save, export or split to. Bundled assets are read-only.
    pub fn output_path(&self, uri: &DocumentUri) -> Result<PathBuf> {
        let path = match uri {
            DocumentUri::Asset(name) => {
                return Err(BridgeError::InvalidArgument(format!(
                    "cannot write to bundled asset {}",
                    name.display()
                )))
            }
            DocumentUri::Content { authority, path } => self.content_root.join(authority).join(path),
            DocumentUri::File(path) | DocumentUri::Path(path) => path.clone(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    /// The cached copy mirrors the asset's own relative path, and is
    /// where saves to the asset land.
    fn materialize_asset(&self, name: &Path) -> Result<PathBuf> {
        copy_into(&self.asset_root.join(name), &self.cache_dir.join("assets").join(name))
    }

    /// Fresh path under `export_dir/<kind>/` for `<stem>.<ext>`, adding a
    /// ` (n)` suffix when the name is taken.
    pub fn export_path(&self, kind: &str, stem: &str, ext: &str) -> Result<PathBuf> {
        let dir = self.export_dir.join(kind);
        fs::create_dir_all(&dir)?;

        let mut candidate = dir.join(format!("{}.{}", stem, ext));
        let mut n = 1;
        while candidate.exists() {
            candidate = dir.join(format!("{} ({}).{}", stem, n, ext));
            n += 1;
        }
        Ok(candidate)
    }
}

/// Copy `source` to `target` unless an up-to-date copy is already there.
/// A copy written after the source changed last is kept.
fn copy_into(source: &Path, target: &Path) -> Result<PathBuf> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if is_fresh(source, target) {
        tracing::debug!(target = %target.display(), "cached copy reused");
        return Ok(target.to_path_buf());
    }
    fs::copy(source, target)?;
    tracing::debug!(source = %source.display(), target = %target.display(), "document materialized");
    Ok(target.to_path_buf())
}

fn is_fresh(source: &Path, target: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified());
    match (modified(source), modified(target)) {
        (Ok(source), Ok(target)) => target >= source,
        _ => false,
    }
}

/// The engine plus the resolver: everything a view needs to open a document
pub struct DocumentOpener {
    engine: Box<dyn Engine>,
    resolver: UriResolver,
}

impl DocumentOpener {
    pub fn new(engine: Box<dyn Engine>, resolver: UriResolver) -> Self {
        Self { engine, resolver }
    }

    pub fn resolver(&self) -> &UriResolver {
        &self.resolver
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn open(&self, uri: &str, password: Option<&str>) -> Result<Box<dyn EngineDocument>> {
        let path = self.resolver.resolve(&DocumentUri::parse(uri)?)?;
        tracing::debug!(engine = self.engine.name(), path = %path.display(), "opening document");
        Ok(self.engine.open(&path, password)?)
    }
}
