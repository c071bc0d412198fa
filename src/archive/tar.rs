//! ustar archive reading and writing
//!
//! Just enough of the ustar format to pack and unpack the virtual-tree
//! archives this crate ships: 512-byte blocks, octal ASCII fields, the
//! checksum-as-spaces rule, and two zero blocks as the end marker.
//! Archives may be gzip-compressed; `read_archive` sniffs the magic and
//! decompresses transparently.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

const BLOCK_SIZE: usize = 512;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("invalid header checksum at offset {0}")]
    BadChecksum(usize),

    #[error("unexpected end of archive while reading '{0}'")]
    Truncated(String),

    #[error("gzip: {0}")]
    Gzip(String),
}

/// Member kind as recorded in the header type flag.
///
/// Anything that is not a regular file or a directory (symlinks, device
/// nodes, pax headers) is surfaced as `Other` and left to the caller to
/// skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// One archive member.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub mode: u32,
    pub mtime: u64,
    pub kind: EntryKind,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            path: path.into(),
            data,
            mode: 0o644,
            mtime: 0,
            kind: EntryKind::File,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: Vec::new(),
            mode: 0o755,
            mtime: 0,
            kind: EntryKind::Directory,
        }
    }
}

// ============================================================================
// Header field access
// ============================================================================

fn field_str(block: &[u8], offset: usize, len: usize) -> String {
    let slice = &block[offset..offset + len];
    let end = slice.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&slice[..end]).to_string()
}

fn field_octal(block: &[u8], offset: usize, len: usize) -> u64 {
    let text = field_str(block, offset, len);
    u64::from_str_radix(text.trim(), 8).unwrap_or(0)
}

/// Sum of all header bytes with the checksum field counted as spaces.
fn header_checksum(block: &[u8]) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if (148..156).contains(&i) {
                0x20u32
            } else {
                b as u32
            }
        })
        .sum()
}

fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

fn kind_from_flag(flag: u8) -> EntryKind {
    match flag {
        b'0' | 0 => EntryKind::File,
        b'5' => EntryKind::Directory,
        _ => EntryKind::Other,
    }
}

// ============================================================================
// Unpacking
// ============================================================================

/// Parse a raw (uncompressed) ustar archive into its members.
pub fn unpack(data: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut entries = Vec::new();
    let mut offset = 0;
    let mut zero_blocks = 0;

    while offset + BLOCK_SIZE <= data.len() {
        let block = &data[offset..offset + BLOCK_SIZE];

        if is_zero_block(block) {
            zero_blocks += 1;
            offset += BLOCK_SIZE;
            if zero_blocks >= 2 {
                break;
            }
            continue;
        }
        zero_blocks = 0;

        if field_octal(block, 148, 8) as u32 != header_checksum(block) {
            return Err(ArchiveError::BadChecksum(offset));
        }

        let name = field_str(block, 0, 100);
        let prefix = field_str(block, 345, 155);
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        let mode = field_octal(block, 100, 8) as u32;
        let size = field_octal(block, 124, 12) as usize;
        let mtime = field_octal(block, 136, 12);
        let kind = kind_from_flag(block[156]);

        offset += BLOCK_SIZE;

        let data_bytes = if kind == EntryKind::File && size > 0 {
            let end = offset + size;
            if end > data.len() {
                return Err(ArchiveError::Truncated(path));
            }
            let content = data[offset..end].to_vec();
            offset += size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
            content
        } else {
            Vec::new()
        };

        entries.push(ArchiveEntry {
            path,
            data: data_bytes,
            mode,
            mtime,
            kind,
        });
    }

    Ok(entries)
}

/// Unpack an archive, decompressing first when the gzip magic is present.
pub fn read_archive(data: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    if is_gzip(data) {
        let raw = gunzip(data)?;
        unpack(&raw)
    } else {
        unpack(data)
    }
}

// ============================================================================
// Packing
// ============================================================================

fn put_str(block: &mut [u8], offset: usize, len: usize, s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    block[offset..offset + n].copy_from_slice(&bytes[..n]);
}

fn put_octal(block: &mut [u8], offset: usize, len: usize, value: u64) {
    let text = format!("{:0>width$o}", value, width = len - 1);
    let bytes = text.as_bytes();
    let start = bytes.len().saturating_sub(len - 1);
    let slice = &bytes[start..];
    block[offset..offset + slice.len()].copy_from_slice(slice);
}

/// Split a long member path into (prefix, name) so both fit their fields.
fn split_member_path(path: &str) -> (String, String) {
    if path.len() <= 100 {
        return (String::new(), path.to_string());
    }
    for (i, c) in path.char_indices() {
        if c == '/' && i <= 155 && path.len() - i - 1 <= 100 {
            return (path[..i].to_string(), path[i + 1..].to_string());
        }
    }
    (String::new(), path[..100.min(path.len())].to_string())
}

fn build_header(entry: &ArchiveEntry) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];

    let mut path = entry.path.clone();
    if entry.kind == EntryKind::Directory && !path.ends_with('/') {
        path.push('/');
    }
    let (prefix, name) = split_member_path(&path);

    put_str(&mut block, 0, 100, &name);
    put_octal(&mut block, 100, 8, entry.mode as u64);
    put_octal(&mut block, 108, 8, 0); // uid
    put_octal(&mut block, 116, 8, 0); // gid
    let size = if entry.kind == EntryKind::File {
        entry.data.len() as u64
    } else {
        0
    };
    put_octal(&mut block, 124, 12, size);
    put_octal(&mut block, 136, 12, entry.mtime);
    block[148..156].copy_from_slice(b"        ");
    block[156] = if entry.kind == EntryKind::Directory {
        b'5'
    } else {
        b'0'
    };
    block[257..263].copy_from_slice(b"ustar\0");
    block[263..265].copy_from_slice(b"00");
    put_str(&mut block, 265, 32, "root");
    put_str(&mut block, 297, 32, "root");
    put_octal(&mut block, 329, 8, 0);
    put_octal(&mut block, 337, 8, 0);
    put_str(&mut block, 345, 155, &prefix);

    let checksum = format!("{:06o}\0 ", header_checksum(&block));
    block[148..156].copy_from_slice(&checksum.as_bytes()[..8]);

    block
}

/// Build a ustar archive from entries. `Other` members are not packable
/// and are silently omitted.
pub fn pack(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut archive = Vec::new();

    for entry in entries {
        if entry.kind == EntryKind::Other {
            continue;
        }
        archive.extend_from_slice(&build_header(entry));
        if entry.kind == EntryKind::File {
            archive.extend_from_slice(&entry.data);
            let remainder = entry.data.len() % BLOCK_SIZE;
            if remainder != 0 {
                archive.extend(std::iter::repeat(0u8).take(BLOCK_SIZE - remainder));
            }
        }
    }

    archive.extend(std::iter::repeat(0u8).take(BLOCK_SIZE * 2));
    archive
}

// ============================================================================
// Gzip
// ============================================================================

/// Check for the gzip magic bytes 0x1f 0x8b.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

pub fn gzip(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ArchiveError::Gzip(e.to_string()))?;
    encoder.finish().map_err(|e| ArchiveError::Gzip(e.to_string()))
}

pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ArchiveError::Gzip(e.to_string()))?;
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
