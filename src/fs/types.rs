//! File System Types
//!
//! Core types and the storage trait for the materialized virtual tree.

use async_trait::async_trait;
use std::time::SystemTime;
use thiserror::Error;

/// File system errors
#[derive(Error, Debug, Clone)]
pub enum FsError {
    #[error("ENOENT: no such file or directory, {operation} '{path}'")]
    NotFound { path: String, operation: String },

    #[error("EEXIST: file already exists, {operation} '{path}'")]
    AlreadyExists { path: String, operation: String },

    #[error("EISDIR: illegal operation on a directory, {operation} '{path}'")]
    IsDirectory { path: String, operation: String },

    #[error("ENOTDIR: not a directory, {operation} '{path}'")]
    NotDirectory { path: String, operation: String },
}

/// An entry in the materialized tree: regular files and directories only.
#[derive(Debug, Clone)]
pub enum TreeEntry {
    File {
        content: Vec<u8>,
        mode: u32,
        mtime: SystemTime,
    },
    Directory {
        mode: u32,
        mtime: SystemTime,
    },
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        matches!(self, TreeEntry::File { .. })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, TreeEntry::Directory { .. })
    }
}

/// File status information
#[derive(Debug, Clone)]
pub struct FsStat {
    pub is_file: bool,
    pub is_directory: bool,
    pub mode: u32,
    pub size: u64,
    pub mtime: SystemTime,
}

/// Storage interface for the materialized tree.
///
/// The write half (`write_file`, `mkdir`) is only exercised while the
/// archive is materialized; the interpreter itself reads.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read the contents of a file as a string (lossy utf8)
    async fn read_file(&self, path: &str) -> Result<String, FsError>;

    /// Check if a path exists
    async fn exists(&self, path: &str) -> bool;

    /// Get file/directory information
    async fn stat(&self, path: &str) -> Result<FsStat, FsError>;

    /// Read directory contents (entry names, lexicographic order)
    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError>;

    /// Create a directory, including missing parents
    async fn mkdir(&self, path: &str) -> Result<(), FsError>;

    /// Write content to a file, creating parent directories as needed
    async fn write_file(&self, path: &str, content: &[u8], mode: u32) -> Result<(), FsError>;
}
