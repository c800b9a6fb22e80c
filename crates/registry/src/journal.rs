//! Append-only status journal
//!
//! One JSON line per status change. Each record commits to the one before
//! it: `record_hash = blake3(bincode(sequence, root, status, prev_hash))`.
//! Rewriting, reordering or dropping an earlier line breaks the chain and
//! the journal refuses to open.
//!
//! A final line without its newline is the trace of an interrupted append.
//! It never reached `sync_data`, so replay drops it and cuts the file back
//! to the last complete record.

use crate::{Status, StatusStore, StoreError};
use merkle::{encode_hash, Hash32};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Upper bound for one encoded record, newline included
pub const MAX_RECORD_LEN: u64 = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    #[serde(with = "hex::serde")]
    pub root: Hash32,
    pub status: Status,
    #[serde(with = "hex::serde")]
    pub prev_hash: Hash32,
    #[serde(with = "hex::serde")]
    pub record_hash: Hash32,
}

impl JournalRecord {
    fn seal(sequence: u64, root: Hash32, status: Status, prev_hash: Hash32) -> Result<Self, StoreError> {
        let mut record = Self {
            sequence,
            root,
            status,
            prev_hash,
            record_hash: [0u8; 32],
        };
        record.record_hash = record.compute_hash()?;
        Ok(record)
    }

    /// Hash over everything except `record_hash` itself
    pub fn compute_hash(&self) -> Result<Hash32, StoreError> {
        let body = (self.sequence, self.root, self.status, self.prev_hash);
        let bytes = bincode::serialize(&body).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(blake3::hash(&bytes).into())
    }
}

/// Byte sink the journal appends to
pub trait JournalSink: Send + Sync {
    /// Current length in bytes
    fn end_offset(&self) -> io::Result<u64>;
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
    /// Cut the sink back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl JournalSink for File {
    fn end_offset(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_data()
    }
}

pub struct JournalStatusStore<W: JournalSink = File> {
    path: PathBuf,
    sink: W,
    statuses: HashMap<Hash32, Status>,
    head: Hash32,
    next_sequence: u64,
    /// Set when a failed append could not be rolled back
    halted: bool,
}

impl JournalStatusStore<File> {
    /// Open (or create) a journal, replaying and checking every record
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut statuses = HashMap::new();
        let mut head = [0u8; 32];
        let mut next_sequence = 0u64;
        // end of the last complete line
        let mut valid_len = 0u64;
        let mut torn = false;

        if path.exists() {
            let mut reader = BufReader::new(File::open(&path)?);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let read = (&mut reader).take(MAX_RECORD_LEN + 1).read_until(b'\n', &mut buf)? as u64;
                if read == 0 {
                    break;
                }
                if buf.last() != Some(&b'\n') {
                    if read > MAX_RECORD_LEN {
                        return Err(reject(
                            &path,
                            StoreError::Corrupted {
                                sequence: next_sequence,
                                reason: format!("record longer than {MAX_RECORD_LEN} bytes"),
                            },
                        ));
                    }
                    torn = true;
                    break;
                }
                valid_len += read;

                let line = std::str::from_utf8(&buf).map_err(|e| {
                    reject(
                        &path,
                        StoreError::Corrupted {
                            sequence: next_sequence,
                            reason: e.to_string(),
                        },
                    )
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                let record = replay(line, next_sequence, head, &statuses).map_err(|e| reject(&path, e))?;
                statuses.insert(record.root, record.status);
                head = record.record_hash;
                next_sequence += 1;
            }
        }

        let mut sink = OpenOptions::new().create(true).append(true).open(&path)?;
        if torn {
            warn!(path = %path.display(), offset = valid_len, "dropping incomplete final record");
            JournalSink::truncate(&mut sink, valid_len)?;
        }
        debug!(path = %path.display(), records = next_sequence, "journal opened");

        Ok(Self {
            path,
            sink,
            statuses,
            head,
            next_sequence,
            halted: false,
        })
    }
}

impl<W: JournalSink> JournalStatusStore<W> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far
    pub fn record_count(&self) -> u64 {
        self.next_sequence
    }

    /// Hash of the latest record (all zeroes for an empty journal)
    pub fn head(&self) -> Hash32 {
        self.head
    }

    /// True once an append failed and could not be undone
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[cfg(test)]
    fn map_sink<V: JournalSink>(self, wrap: impl FnOnce(W) -> V) -> JournalStatusStore<V> {
        JournalStatusStore {
            path: self.path,
            sink: wrap(self.sink),
            statuses: self.statuses,
            head: self.head,
            next_sequence: self.next_sequence,
            halted: self.halted,
        }
    }

    fn append_line(&mut self, line: &[u8]) -> Result<(), StoreError> {
        let offset = self.sink.end_offset()?;
        let written = self.sink.append(line).and_then(|()| self.sink.sync());
        if let Err(e) = written {
            // the record may be partly or wholly on disk; take it back out
            if let Err(undo) = self.sink.truncate(offset) {
                error!(
                    path = %self.path.display(),
                    error = %undo,
                    "could not roll back failed append, journal halted"
                );
                self.halted = true;
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn reject(path: &Path, err: StoreError) -> StoreError {
    warn!(path = %path.display(), error = %err, "rejecting journal");
    err
}

fn replay(
    line: &str,
    expected_sequence: u64,
    prev_hash: Hash32,
    statuses: &HashMap<Hash32, Status>,
) -> Result<JournalRecord, StoreError> {
    let corrupted = |reason: String| StoreError::Corrupted {
        sequence: expected_sequence,
        reason,
    };

    let record: JournalRecord = serde_json::from_str(line).map_err(|e| corrupted(e.to_string()))?;

    if record.sequence != expected_sequence {
        return Err(corrupted(format!("unexpected sequence {}", record.sequence)));
    }
    if record.prev_hash != prev_hash {
        return Err(corrupted("broken hash chain".into()));
    }
    if record.record_hash != record.compute_hash()? {
        return Err(corrupted("record hash mismatch".into()));
    }

    let previous = statuses.get(&record.root).copied().unwrap_or(Status::Unknown);
    if !previous.can_advance_to(record.status) {
        return Err(corrupted(format!(
            "{} cannot move from {} to {}",
            encode_hash(&record.root),
            previous,
            record.status
        )));
    }

    Ok(record)
}

impl<W: JournalSink> StatusStore for JournalStatusStore<W> {
    fn get(&self, root: &Hash32) -> Option<Status> {
        self.statuses.get(root).copied()
    }

    fn put(&mut self, root: Hash32, status: Status) -> Result<(), StoreError> {
        debug_assert_ne!(status, Status::Unknown, "Unknown is never stored");
        if self.halted {
            return Err(StoreError::Halted);
        }

        let record = JournalRecord::seal(self.next_sequence, root, status, self.head)?;
        let mut line = serde_json::to_string(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push('\n');

        self.append_line(line.as_bytes())?;

        // memory follows disk, never leads it
        self.statuses.insert(root, status);
        self.head = record.record_hash;
        self.next_sequence += 1;
        Ok(())
    }

    fn entries(&self) -> Vec<(Hash32, Status)> {
        self.statuses.iter().map(|(r, s)| (*r, *s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_records(path: &Path) -> Vec<JournalRecord> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn write_records(path: &Path, records: &[JournalRecord]) {
        let body: String = records
            .iter()
            .map(|r| serde_json::to_string(r).unwrap() + "\n")
            .collect();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_reopen_restores_statuses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            store.put([1u8; 32], Status::Issued).unwrap();
            store.put([2u8; 32], Status::Issued).unwrap();
            store.put([1u8; 32], Status::Invalidated).unwrap();
        }

        let store = JournalStatusStore::open(&path).unwrap();
        assert_eq!(store.get(&[1u8; 32]), Some(Status::Invalidated));
        assert_eq!(store.get(&[2u8; 32]), Some(Status::Issued));
        assert_eq!(store.get(&[3u8; 32]), None);
        assert_eq!(store.record_count(), 3);
    }

    #[test]
    fn test_records_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        let mut store = JournalStatusStore::open(&path).unwrap();
        assert_eq!(store.head(), [0u8; 32]);
        store.put([1u8; 32], Status::Issued).unwrap();
        store.put([1u8; 32], Status::Invalidated).unwrap();

        let records = read_records(&path);
        assert_eq!(records[0].prev_hash, [0u8; 32]);
        assert_eq!(records[1].prev_hash, records[0].record_hash);
        assert_eq!(store.head(), records[1].record_hash);
    }

    #[test]
    fn test_edited_status_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            store.put([1u8; 32], Status::Invalidated).unwrap();
        }

        // try to quietly un-revoke the root
        let mut records = read_records(&path);
        records[0].status = Status::Issued;
        write_records(&path, &records);

        let err = JournalStatusStore::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Corrupted { sequence: 0, .. }));
    }

    #[test]
    fn test_dropped_record_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            store.put([1u8; 32], Status::Issued).unwrap();
            store.put([1u8; 32], Status::Invalidated).unwrap();
            store.put([2u8; 32], Status::Issued).unwrap();
        }

        let mut records = read_records(&path);
        records.remove(1);
        write_records(&path, &records);

        let err = JournalStatusStore::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Corrupted { sequence: 1, .. }));
    }

    #[test]
    fn test_resealed_backwards_move_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        // a correctly chained journal that still moves a root backwards
        let first = JournalRecord::seal(0, [1u8; 32], Status::Invalidated, [0u8; 32]).unwrap();
        let second = JournalRecord::seal(1, [1u8; 32], Status::Issued, first.record_hash).unwrap();
        write_records(&path, &[first, second]);

        let err = JournalStatusStore::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Corrupted { sequence: 1, .. }));
    }

    #[test]
    fn test_garbage_line_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");
        std::fs::write(&path, "not json\n").unwrap();

        assert!(matches!(
            JournalStatusStore::open(&path),
            Err(StoreError::Corrupted { sequence: 0, .. })
        ));
    }

    /// File sink that fails the next append, sync or truncate on request
    struct FlakySink {
        file: File,
        tear_after: Option<usize>,
        fail_sync: bool,
        fail_truncate: bool,
    }

    impl FlakySink {
        fn new(file: File) -> Self {
            Self {
                file,
                tear_after: None,
                fail_sync: false,
                fail_truncate: false,
            }
        }
    }

    fn disk_full() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "no space left on device")
    }

    impl JournalSink for FlakySink {
        fn end_offset(&self) -> io::Result<u64> {
            self.file.end_offset()
        }

        fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
            match self.tear_after.take() {
                Some(n) => {
                    self.file.write_all(&bytes[..n])?;
                    Err(disk_full())
                }
                None => self.file.append(bytes),
            }
        }

        fn sync(&mut self) -> io::Result<()> {
            if std::mem::take(&mut self.fail_sync) {
                return Err(disk_full());
            }
            self.file.sync()
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.fail_truncate {
                return Err(disk_full());
            }
            JournalSink::truncate(&mut self.file, len)
        }
    }

    #[test]
    fn test_partial_append_rolled_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            store.put([1u8; 32], Status::Issued).unwrap();

            let mut store = store.map_sink(|file| FlakySink {
                tear_after: Some(20),
                ..FlakySink::new(file)
            });
            assert!(matches!(store.put([2u8; 32], Status::Issued), Err(StoreError::Io(_))));
            assert_eq!(store.get(&[2u8; 32]), None);
            assert_eq!(store.record_count(), 1);

            store.put([3u8; 32], Status::Issued).unwrap();
        }

        let store = JournalStatusStore::open(&path).unwrap();
        assert_eq!(store.record_count(), 2);
        assert_eq!(store.get(&[2u8; 32]), None);
        assert_eq!(store.get(&[3u8; 32]), Some(Status::Issued));
    }

    #[test]
    fn test_failed_sync_rolled_back_and_retry_succeeds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            store.put([1u8; 32], Status::Issued).unwrap();

            let mut store = store.map_sink(|file| FlakySink {
                fail_sync: true,
                ..FlakySink::new(file)
            });
            assert!(store.put([1u8; 32], Status::Invalidated).is_err());
            assert_eq!(store.get(&[1u8; 32]), Some(Status::Issued));

            store.put([1u8; 32], Status::Invalidated).unwrap();
        }

        let records = read_records(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].sequence, 1);

        let store = JournalStatusStore::open(&path).unwrap();
        assert_eq!(store.get(&[1u8; 32]), Some(Status::Invalidated));
    }

    #[test]
    fn test_unrecoverable_append_halts_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            store.put([1u8; 32], Status::Issued).unwrap();

            let mut store = store.map_sink(|file| FlakySink {
                tear_after: Some(10),
                fail_truncate: true,
                ..FlakySink::new(file)
            });
            assert!(store.put([2u8; 32], Status::Issued).is_err());
            assert!(store.is_halted());
            assert!(matches!(store.put([3u8; 32], Status::Issued), Err(StoreError::Halted)));
        }

        // the fragment left behind is an incomplete final line
        let store = JournalStatusStore::open(&path).unwrap();
        assert_eq!(store.record_count(), 1);
        assert_eq!(store.get(&[1u8; 32]), Some(Status::Issued));
    }

    #[test]
    fn test_torn_final_line_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            store.put([1u8; 32], Status::Issued).unwrap();
        }
        let intact = std::fs::metadata(&path).unwrap().len();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"sequence\":1,\"root\":\"0202").unwrap();
        drop(file);

        {
            let mut store = JournalStatusStore::open(&path).unwrap();
            assert_eq!(store.record_count(), 1);
            assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);
            store.put([2u8; 32], Status::Issued).unwrap();
        }

        let store = JournalStatusStore::open(&path).unwrap();
        assert_eq!(store.record_count(), 2);
        assert_eq!(store.get(&[2u8; 32]), Some(Status::Issued));
    }

    #[test]
    fn test_fragment_before_last_line_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");

        let first = JournalRecord::seal(0, [1u8; 32], Status::Issued, [0u8; 32]).unwrap();
        let second = JournalRecord::seal(1, [2u8; 32], Status::Issued, first.record_hash).unwrap();
        let body = format!(
            "{}\n{{\"sequence\":1,{}\n",
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        std::fs::write(&path, body).unwrap();

        assert!(matches!(
            JournalStatusStore::open(&path),
            Err(StoreError::Corrupted { sequence: 1, .. })
        ));
    }

    #[test]
    fn test_oversized_record_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.journal");
        std::fs::write(&path, vec![b'x'; 64 * 1024]).unwrap();

        assert!(matches!(
            JournalStatusStore::open(&path),
            Err(StoreError::Corrupted { sequence: 0, .. })
        ));
    }
}
