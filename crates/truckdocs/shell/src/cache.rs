//! Offline document cache.

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr as _;

const INDEX_FILE: &str = "index.json";
const FILES_DIR: &str = "files";

/// A document to store for offline use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Index entry of a cached document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub name: String,
    pub size: u64,
    pub cached_at: chrono::DateTime<chrono::Utc>,
}

/// Local store of documents keyed by file name.
pub trait OfflineCache: Send + Sync {
    /// Drop every cached document and store `documents` instead.
    fn replace_all(&self, documents: Vec<CachedDocument>) -> color_eyre::eyre::Result<()>;

    /// List cached documents.
    fn list(&self) -> color_eyre::eyre::Result<Vec<CacheEntry>>;

    /// Read a cached document by name.
    fn read(&self, name: &str) -> color_eyre::eyre::Result<Option<Vec<u8>>>;
}

/// Cache in a directory: one file per document plus a JSON index.
#[derive(Debug, Clone)]
pub struct DirCache {
    root: PathBuf,
}

impl DirCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.files_dir().join(file_key(name))
    }
}

/// Document names come from the server; keep them inside the cache dir.
fn file_key(name: &str) -> String {
    let key: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();

    match key.trim_matches('.') {
        "" => "_".to_string(),
        _ => key,
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> color_eyre::eyre::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).wrap_err_with(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).wrap_err_with(|| format!("failed to replace {}", path.display()))
}

impl OfflineCache for DirCache {
    fn replace_all(&self, documents: Vec<CachedDocument>) -> color_eyre::eyre::Result<()> {
        let files = self.files_dir();
        if files.exists() {
            std::fs::remove_dir_all(&files)
                .wrap_err_with(|| format!("failed to clear {}", files.display()))?;
        }
        std::fs::create_dir_all(&files)
            .wrap_err_with(|| format!("failed to create {}", files.display()))?;

        let now = chrono::Utc::now();
        let mut index: Vec<CacheEntry> = Vec::with_capacity(documents.len());
        for doc in documents {
            let path = self.file_path(&doc.name);
            std::fs::write(&path, &doc.bytes)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;

            index.retain(|e| file_key(&e.name) != file_key(&doc.name));
            index.push(CacheEntry {
                name: doc.name,
                size: doc.bytes.len() as u64,
                cached_at: now,
            });
        }

        let json = serde_json::to_vec_pretty(&index).wrap_err("failed to encode cache index")?;
        write_atomic(&self.index_path(), &json)?;

        tracing::debug!(count = index.len(), root = %self.root.display(), "replaced offline cache");
        Ok(())
    }

    fn list(&self) -> color_eyre::eyre::Result<Vec<CacheEntry>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let bytes =
            std::fs::read(&path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes).wrap_err("corrupt cache index")
    }

    fn read(&self, name: &str) -> color_eyre::eyre::Result<Option<Vec<u8>>> {
        if !self.list()?.iter().any(|e| e.name == name) {
            return Ok(None);
        }

        let path = self.file_path(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).wrap_err_with(|| format!("failed to read {}", path.display())),
        }
    }
}
