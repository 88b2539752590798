//! Persistent slide verdict cache
//!
//! Verdicts are keyed by the slide URL exactly as it was discovered. The cache only
//! ever grows: a verdict, once recorded, is kept until someone edits the file by hand.

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::CacheError;

/// Mapping from slide URL to liveness verdict, backed by a JSON file
#[derive(Debug, Clone, Default)]
pub struct SlideCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, bool>,
    dirty: bool,
}

impl SlideCache {
    /// Create an empty cache that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache stored at `path`
    ///
    /// A missing file yields an empty cache bound to `path`. A file that cannot be
    /// parsed is an error; it is never silently replaced.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| CacheError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        tracing::debug!("Loaded {} slide verdicts from {}", entries.len(), path.display());

        Ok(Self {
            path: Some(path),
            entries,
            dirty: false,
        })
    }

    /// Stored verdict for `url`, if any
    pub fn get(&self, url: &str) -> Option<bool> {
        self.entries.get(url).copied()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Record a verdict
    ///
    /// An existing verdict is kept; the returned value is the one now stored.
    pub fn insert(&mut self, url: &str, verdict: bool) -> bool {
        if let Some(existing) = self.entries.get(url) {
            return *existing;
        }
        self.entries.insert(url.to_string(), verdict);
        self.dirty = true;
        verdict
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether verdicts were added since the last load or save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Iterate over verdicts in URL order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(url, verdict)| (url.as_str(), *verdict))
    }

    /// Write the cache to its file, replacing it atomically
    ///
    /// In-memory caches have nowhere to go and save as a no-op.
    pub fn save(&mut self) -> Result<(), CacheError> {
        let Some(path) = self.path.as_deref() else {
            self.dirty = false;
            return Ok(());
        };

        let mut json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            CacheError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        json.push('\n');

        write_atomic(path, json.as_bytes()).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Saved {} slide verdicts to {}", self.entries.len(), path.display());
        self.dirty = false;
        Ok(())
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
