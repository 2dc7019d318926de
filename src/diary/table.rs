//! On-disk format of the diary.
//!
//! The table is a JSON Lines file with one row per entry (`date`, `entry`,
//! `images`, optional `updated`). Embeddings live in a binary side file keyed
//! by row order; each record carries the blake3 checksum of the text it was
//! computed from, so a vector that no longer matches its row is dropped on
//! load instead of being served as if it were current.
//!
//! Both files are always rewritten in full through a temp file in the same
//! directory followed by a rename.

use crate::constants::{
    EMBEDDING_CACHE_MAGIC, EMBEDDING_CACHE_VERSION, TABLE_TIMESTAMP_FORMAT,
};
use crate::diary::DiaryEntry;
use crate::errors::{AppError, AppResult, StorageError};
use bytemuck::{cast_slice, cast_slice_mut};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// A persisted table row.
#[derive(Debug, Serialize, Deserialize)]
struct Row {
    date: String,
    entry: String,
    images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated: Option<String>,
}

type Checksum = [u8; 32];

/// One decoded record of the embedding cache.
#[derive(Debug, Clone, PartialEq)]
struct CachedEmbedding {
    checksum: Checksum,
    values: Vec<f32>,
}

/// Checksum of the text an embedding is derived from.
pub fn text_checksum(text: &str) -> Checksum {
    *blake3::hash(text.as_bytes()).as_bytes()
}

fn corrupt(path: &Path, line: usize, reason: impl Into<String>) -> AppError {
    StorageError::Corrupt {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
    .into()
}

/// Parses a persisted timestamp.
///
/// Besides the canonical `2021-06-15T10:00:00` form this accepts a space
/// separator and bare dates, which older exports contain.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TABLE_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TABLE_TIMESTAMP_FORMAT).to_string()
}

/// Reads the full table and attaches cached embeddings.
///
/// A missing table is an empty diary. A missing cache leaves every embedding
/// unset.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` if a row or the cache cannot be decoded,
/// and `AppError::Io` for other read failures.
pub fn load(table_path: &Path, cache_path: &Path) -> AppResult<Vec<DiaryEntry>> {
    let content = match fs::read_to_string(table_path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No diary table at {:?}, starting empty", table_path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let row: Row = serde_json::from_str(line)
            .map_err(|e| corrupt(table_path, line_no, e.to_string()))?;

        let date = parse_timestamp(&row.date)
            .ok_or_else(|| corrupt(table_path, line_no, format!("invalid date '{}'", row.date)))?;
        let last_fragment = match row.updated.as_deref() {
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                corrupt(table_path, line_no, format!("invalid updated time '{}'", raw))
            })?),
            None => None,
        };

        entries.push(DiaryEntry {
            date,
            text: row.entry,
            images: row.images,
            last_fragment,
            embedding: None,
        });
    }

    let cache = read_embedding_cache(cache_path)?;
    attach_embeddings(&mut entries, cache, cache_path);

    debug!("Loaded {} diary entries", entries.len());
    Ok(entries)
}

fn attach_embeddings(
    entries: &mut [DiaryEntry],
    cache: Option<Vec<Option<CachedEmbedding>>>,
    cache_path: &Path,
) {
    let cache = match cache {
        Some(cache) => cache,
        None => return,
    };

    if cache.len() != entries.len() {
        warn!(
            "Embedding cache {:?} has {} records for {} rows; keeping only records whose checksum matches",
            cache_path,
            cache.len(),
            entries.len()
        );
    }

    let mut stale = 0usize;
    for (entry, record) in entries.iter_mut().zip(cache) {
        if let Some(record) = record {
            if record.checksum == text_checksum(&entry.text) {
                entry.embedding = Some(record.values);
            } else {
                stale += 1;
            }
        }
    }
    if stale > 0 {
        debug!("Dropped {} stale embeddings", stale);
    }
}

/// Writes the full table and the embedding cache.
///
/// # Errors
///
/// Returns `AppError::Io` if either file cannot be written. A failure leaves
/// the previous version of that file in place.
pub fn save(table_path: &Path, cache_path: &Path, entries: &[DiaryEntry]) -> AppResult<()> {
    let mut table = Vec::new();
    for entry in entries {
        let row = Row {
            date: format_timestamp(&entry.date),
            entry: entry.text.clone(),
            images: entry.images.clone(),
            updated: entry.last_fragment.as_ref().map(format_timestamp),
        };
        serde_json::to_writer(&mut table, &row).map_err(StorageError::Encode)?;
        table.push(b'\n');
    }

    write_atomically(table_path, &table)?;
    write_atomically(cache_path, &encode_embedding_cache(entries))?;

    debug!("Saved {} diary entries", entries.len());
    Ok(())
}

fn encode_embedding_cache(entries: &[DiaryEntry]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(EMBEDDING_CACHE_MAGIC);
    buf.push(EMBEDDING_CACHE_VERSION);
    buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());

    for entry in entries {
        match &entry.embedding {
            Some(values) => {
                buf.push(1);
                buf.extend_from_slice(&text_checksum(&entry.text));
                buf.extend_from_slice(&(values.len() as u32).to_le_bytes());
                buf.extend_from_slice(cast_slice::<f32, u8>(values));
            }
            None => buf.push(0),
        }
    }
    buf
}

/// Sequential reader over the cache bytes that reports truncation as corruption.
struct CacheReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    path: &'a Path,
    record: usize,
}

impl<'a> CacheReader<'a> {
    fn take(&mut self, len: usize) -> AppResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(corrupt(self.path, self.record, "embedding cache is truncated")),
        }
    }

    fn read_u8(&mut self) -> AppResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> AppResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }
}

fn read_embedding_cache(path: &Path) -> AppResult<Option<Vec<Option<CachedEmbedding>>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut reader = CacheReader {
        bytes: &bytes,
        pos: 0,
        path,
        record: 0,
    };

    if reader.take(EMBEDDING_CACHE_MAGIC.len())? != EMBEDDING_CACHE_MAGIC {
        return Err(corrupt(path, 0, "not an embedding cache (bad magic)"));
    }
    let version = reader.read_u8()?;
    if version != EMBEDDING_CACHE_VERSION {
        return Err(corrupt(
            path,
            0,
            format!("unsupported embedding cache version {}", version),
        ));
    }
    let count = reader.read_u32()? as usize;

    let mut records = Vec::with_capacity(count.min(1 << 16));
    for record in 1..=count {
        reader.record = record;
        match reader.read_u8()? {
            0 => records.push(None),
            1 => {
                let mut checksum = [0u8; 32];
                checksum.copy_from_slice(reader.take(32)?);
                let dim = reader.read_u32()? as usize;
                let byte_len = dim
                    .checked_mul(std::mem::size_of::<f32>())
                    .ok_or_else(|| corrupt(path, record, "embedding dimension overflows"))?;
                let raw = reader.take(byte_len)?;

                // Convert bytes to f32 slice
                let mut values = vec![0.0f32; dim];
                cast_slice_mut::<f32, u8>(&mut values).copy_from_slice(raw);

                records.push(Some(CachedEmbedding { checksum, values }));
            }
            flag => {
                return Err(corrupt(
                    path,
                    record,
                    format!("invalid record flag {}", flag),
                ))
            }
        }
    }

    if reader.pos != bytes.len() {
        return Err(corrupt(path, count, "trailing bytes after last record"));
    }

    Ok(Some(records))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let dir = path.parent().ok_or_else(|| {
        AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("No parent directory for {}", path.display()),
        ))
    })?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    // Set secure permissions (0o600 - read/write only for owner)
    #[cfg(unix)]
    {
        use crate::constants::DEFAULT_FILE_PERMISSIONS;
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(DEFAULT_FILE_PERMISSIONS))?;
    }

    temp.persist(path).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}
