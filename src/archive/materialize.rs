//! Archive materialization
//!
//! One-time setup: writes parsed archive members into the virtual
//! filesystem under the tree root. After this the interpreter treats the
//! tree as read-only.

use tracing::{debug, info, warn};

use super::tar::{ArchiveEntry, EntryKind};
use crate::fs::{FileSystem, FsError};

/// Strip the `./` and `/` decorations archive tools put on member paths.
fn clean_member_path(path: &str) -> &str {
    let mut p = path;
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest;
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest;
        } else {
            break;
        }
    }
    let p = p.trim_end_matches('/');
    if p == "." {
        ""
    } else {
        p
    }
}

/// Populate `fs` under `root` from archive members.
///
/// Members that are neither regular files nor directories are skipped.
pub async fn materialize(
    fs: &dyn FileSystem,
    root: &str,
    entries: &[ArchiveEntry],
) -> Result<(), FsError> {
    fs.mkdir(root).await?;

    let mut files = 0usize;
    let mut dirs = 0usize;

    for entry in entries {
        let member = clean_member_path(&entry.path);
        if member.is_empty() {
            continue;
        }
        let physical = crate::vpath::to_physical(&format!("/{}", member), root);

        match entry.kind {
            EntryKind::Directory => {
                fs.mkdir(&physical).await?;
                dirs += 1;
            }
            EntryKind::File => {
                fs.write_file(&physical, &entry.data, entry.mode).await?;
                files += 1;
            }
            EntryKind::Other => {
                warn!(member, "skipping unsupported archive member");
            }
        }
        debug!(member, %physical, "materialized");
    }

    info!(files, dirs, root, "virtual tree materialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    fn sample_entries() -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry::directory("./subdir"),
            ArchiveEntry::file("./file1.txt", b"a\nb\na\n".to_vec()),
            ArchiveEntry::file("./file2.txt", b"1\n2\n3\n".to_vec()),
            ArchiveEntry::file("./subdir/file3.txt", b"nested\n".to_vec()),
        ]
    }

    #[tokio::test]
    async fn test_materialize_at_root() {
        let fs = InMemoryFs::new();
        materialize(&fs, "/", &sample_entries()).await.unwrap();

        assert_eq!(fs.read_file("/file1.txt").await.unwrap(), "a\nb\na\n");
        assert!(fs.stat("/subdir").await.unwrap().is_directory);
        assert_eq!(fs.read_file("/subdir/file3.txt").await.unwrap(), "nested\n");
        assert_eq!(
            fs.readdir("/").await.unwrap(),
            vec!["file1.txt", "file2.txt", "subdir"]
        );
    }

    #[tokio::test]
    async fn test_materialize_under_prefix() {
        let fs = InMemoryFs::new();
        materialize(&fs, "/srv/tree", &sample_entries()).await.unwrap();

        assert!(fs.exists("/srv/tree/file2.txt").await);
        assert!(!fs.exists("/file2.txt").await);
        assert_eq!(
            fs.read_file("/srv/tree/subdir/file3.txt").await.unwrap(),
            "nested\n"
        );
    }

    #[tokio::test]
    async fn test_materialize_skips_other_members() {
        let fs = InMemoryFs::new();
        let entries = vec![
            ArchiveEntry {
                path: "weird".to_string(),
                data: Vec::new(),
                mode: 0o777,
                mtime: 0,
                kind: EntryKind::Other,
            },
            ArchiveEntry::file("kept.txt", b"ok".to_vec()),
        ];
        materialize(&fs, "/", &entries).await.unwrap();
        assert!(!fs.exists("/weird").await);
        assert!(fs.exists("/kept.txt").await);
    }

    #[tokio::test]
    async fn test_materialize_without_explicit_dir_members() {
        // Some archives omit directory members; parents appear anyway.
        let fs = InMemoryFs::new();
        let entries = vec![ArchiveEntry::file("deep/path/f.txt", b"x".to_vec())];
        materialize(&fs, "/", &entries).await.unwrap();
        assert!(fs.stat("/deep/path").await.unwrap().is_directory);
    }

    #[test]
    fn test_clean_member_path() {
        assert_eq!(clean_member_path("./a/b"), "a/b");
        assert_eq!(clean_member_path("././a"), "a");
        assert_eq!(clean_member_path("/abs"), "abs");
        assert_eq!(clean_member_path("dir/"), "dir");
        assert_eq!(clean_member_path("./"), "");
        assert_eq!(clean_member_path("."), "");
    }
}
