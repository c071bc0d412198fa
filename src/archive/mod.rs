//! Archive Module
//!
//! ustar/gzip handling and one-time materialization of the packaged
//! virtual tree into the filesystem.

pub mod materialize;
pub mod tar;

pub use materialize::materialize;
pub use tar::{is_gzip, pack, read_archive, unpack, ArchiveEntry, ArchiveError, EntryKind};
