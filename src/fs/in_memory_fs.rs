//! In-Memory File System Implementation
//!
//! Path-keyed store for the materialized tree. Entries are kept in a
//! BTreeMap so directory enumeration is lexicographically ordered.

use std::collections::BTreeMap;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::*;

/// In-memory virtual file system.
pub struct InMemoryFs {
    data: RwLock<BTreeMap<String, TreeEntry>>,
}

impl InMemoryFs {
    /// Create a new filesystem holding only the root directory.
    pub fn new() -> Self {
        let mut data = BTreeMap::new();
        data.insert(
            "/".to_string(),
            TreeEntry::Directory {
                mode: 0o755,
                mtime: SystemTime::now(),
            },
        );
        Self {
            data: RwLock::new(data),
        }
    }
}

impl Default for InMemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Path utilities (free functions operating on the map directly)
// ============================================================================

fn normalize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn dirname(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => normalized[..pos].to_string(),
        None => "/".to_string(),
    }
}

fn ensure_parent_dirs(data: &mut BTreeMap<String, TreeEntry>, path: &str) {
    let dir = dirname(path);
    if dir == "/" {
        return;
    }
    if !data.contains_key(&dir) {
        ensure_parent_dirs(data, &dir);
        data.insert(
            dir,
            TreeEntry::Directory {
                mode: 0o755,
                mtime: SystemTime::now(),
            },
        );
    }
}

// ============================================================================
// FileSystem trait implementation
// ============================================================================

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read_file(&self, path: &str) -> Result<String, FsError> {
        let data = self.data.read().await;
        match data.get(&normalize_path(path)) {
            Some(TreeEntry::File { content, .. }) => {
                Ok(String::from_utf8_lossy(content).to_string())
            }
            Some(TreeEntry::Directory { .. }) => Err(FsError::IsDirectory {
                path: path.to_string(),
                operation: "read".to_string(),
            }),
            None => Err(FsError::NotFound {
                path: path.to_string(),
                operation: "open".to_string(),
            }),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        let data = self.data.read().await;
        data.contains_key(&normalize_path(path))
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        let data = self.data.read().await;
        match data.get(&normalize_path(path)) {
            Some(entry) => {
                let (mode, mtime, size) = match entry {
                    TreeEntry::File {
                        content,
                        mode,
                        mtime,
                    } => (*mode, *mtime, content.len() as u64),
                    TreeEntry::Directory { mode, mtime } => (*mode, *mtime, 0),
                };
                Ok(FsStat {
                    is_file: entry.is_file(),
                    is_directory: entry.is_directory(),
                    mode,
                    size,
                    mtime,
                })
            }
            None => Err(FsError::NotFound {
                path: path.to_string(),
                operation: "stat".to_string(),
            }),
        }
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let data = self.data.read().await;
        let normalized = normalize_path(path);

        match data.get(&normalized) {
            Some(TreeEntry::Directory { .. }) => {}
            Some(_) => {
                return Err(FsError::NotDirectory {
                    path: path.to_string(),
                    operation: "scandir".to_string(),
                })
            }
            None => {
                return Err(FsError::NotFound {
                    path: path.to_string(),
                    operation: "scandir".to_string(),
                })
            }
        }

        let prefix = if normalized == "/" {
            "/".to_string()
        } else {
            format!("{}/", normalized)
        };

        // Immediate children only: the BTreeMap iterates in path order, so
        // names come out sorted without a second pass.
        let mut names = Vec::new();
        for p in data.keys() {
            if p == &normalized {
                continue;
            }
            if let Some(rest) = p.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    names.push(rest.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let normalized = normalize_path(path);

        if let Some(existing) = data.get(&normalized) {
            if existing.is_file() {
                return Err(FsError::AlreadyExists {
                    path: path.to_string(),
                    operation: "mkdir".to_string(),
                });
            }
            return Ok(());
        }

        ensure_parent_dirs(&mut data, &normalized);
        data.insert(
            normalized,
            TreeEntry::Directory {
                mode: 0o755,
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn write_file(&self, path: &str, content: &[u8], mode: u32) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let normalized = normalize_path(path);

        if let Some(TreeEntry::Directory { .. }) = data.get(&normalized) {
            return Err(FsError::IsDirectory {
                path: path.to_string(),
                operation: "write".to_string(),
            });
        }

        ensure_parent_dirs(&mut data, &normalized);
        data.insert(
            normalized,
            TreeEntry::File {
                content: content.to_vec(),
                mode,
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
