//! Write-ahead log.
//!
//! Record framing: `[len: u32 LE][crc32: u32 LE][bincode payload]`.
//! Records are flushed and fsynced before the in-memory structures
//! mutate; a checksum mismatch during replay is a fatal startup error.
//! The file carries an advisory lock so two node processes cannot share
//! one ledger directory.

use crate::errors::{LedgerError, LedgerResult, StartupError};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use shared_types::{canonical_decode, canonical_encode, Block};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// One durable ledger mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalRecord {
    /// A main block was appended.
    Block(Box<Block>),
    /// A raw state write.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// A raw state delete.
    Delete { key: Vec<u8> },
}

/// Append-only WAL handle holding the advisory lock.
pub struct Wal {
    file: File,
    path: PathBuf,
}

impl Wal {
    /// Open (creating if absent) and lock the WAL at `path`.
    pub fn open(path: &Path) -> Result<Self, StartupError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StartupError::Io(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| StartupError::Io(e.to_string()))?;
        file.try_lock_exclusive()
            .map_err(|e| StartupError::Io(format!("WAL locked by another process: {e}")))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Replay every record currently in the WAL.
    ///
    /// # Errors
    ///
    /// `StartupError::CorruptWal` on a framing or checksum failure; the
    /// record index in the error points at the first bad record.
    pub fn replay(&mut self) -> Result<Vec<WalRecord>, StartupError> {
        let mut bytes = Vec::new();
        let mut reader = File::open(&self.path).map_err(|e| StartupError::Io(e.to_string()))?;
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| StartupError::Io(e.to_string()))?;

        let mut records = Vec::new();
        let mut cursor = 0usize;
        while cursor < bytes.len() {
            let index = records.len();
            if cursor + 8 > bytes.len() {
                return Err(StartupError::CorruptWal {
                    record: index,
                    reason: "truncated frame header".into(),
                });
            }
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[cursor..cursor + 4]);
            let len = u32::from_le_bytes(word) as usize;
            word.copy_from_slice(&bytes[cursor + 4..cursor + 8]);
            let crc = u32::from_le_bytes(word);
            cursor += 8;

            if cursor + len > bytes.len() {
                return Err(StartupError::CorruptWal {
                    record: index,
                    reason: "truncated payload".into(),
                });
            }
            let payload = &bytes[cursor..cursor + len];
            cursor += len;

            if crc32fast::hash(payload) != crc {
                return Err(StartupError::CorruptWal {
                    record: index,
                    reason: "checksum mismatch".into(),
                });
            }

            let record = canonical_decode(payload).map_err(|e| StartupError::CorruptWal {
                record: index,
                reason: e.to_string(),
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Append a record, flush and fsync.
    pub fn append(&mut self, record: &WalRecord) -> LedgerResult<()> {
        let payload = canonical_encode(record)?;
        let mut frame = Vec::with_capacity(8 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        self.file
            .write_all(&frame)
            .map_err(|e| LedgerError::Io(e.to_string()))?;
        self.file
            .sync_all()
            .map_err(|e| LedgerError::Io(e.to_string()))
    }

    /// Truncate the WAL after its contents were folded into a snapshot.
    pub fn truncate(&mut self) -> LedgerResult<()> {
        self.file
            .set_len(0)
            .map_err(|e| LedgerError::Io(e.to_string()))?;
        self.file
            .sync_all()
            .map_err(|e| LedgerError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn put(key: &[u8], value: &[u8]) -> WalRecord {
        WalRecord::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn test_append_replay_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");

        let mut wal = Wal::open(&path).unwrap();
        wal.append(&put(b"a", b"1")).unwrap();
        wal.append(&put(b"b", b"2")).unwrap();
        wal.append(&WalRecord::Delete { key: b"a".to_vec() }).unwrap();

        let records = wal.replay().unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(&records[2], WalRecord::Delete { key } if key == b"a"));
    }

    #[test]
    fn test_corrupt_payload_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&put(b"a", b"1")).unwrap();
        }

        // Flip a payload byte on disk.
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let mut wal = Wal::open(&path).unwrap();
        let err = wal.replay().unwrap_err();
        assert!(matches!(err, StartupError::CorruptWal { record: 0, .. }));
    }

    #[test]
    fn test_truncated_file_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&put(b"a", b"1")).unwrap();
        }

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

        let mut wal = Wal::open(&path).unwrap();
        assert!(wal.replay().is_err());
    }

    #[test]
    fn test_truncate_clears_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.wal");

        let mut wal = Wal::open(&path).unwrap();
        wal.append(&put(b"a", b"1")).unwrap();
        wal.truncate().unwrap();
        assert!(wal.replay().unwrap().is_empty());
    }
}
