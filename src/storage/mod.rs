//! The persistence engine: an ordered `Series -> Frame -> Array` tree backed
//! by an embedded SQL store (SQLite, via `rusqlite`) with per-blob streaming
//! ZSTD compression.
//!
//! A single [`DataStorage`] handle is single-writer: all mutating calls take
//! `&self` but serialize on an internal lock, matching spec.md §5's "single
//! storage handle is single-writer" policy. IDs (series, frame, array) are
//! monotonically assigned by SQLite's `rowid` and never reused, since rows
//! are never `VACUUM`-ed into reused rowids by this schema (cascading
//! deletes remove children, not the id sequence).

pub mod compression;

use crate::datatype::DataType;
use crate::error::{Error, ErrorKind, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Opaque identifier for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesId(pub i64);

/// Opaque identifier for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub i64);

/// Opaque identifier for an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayId(pub i64);

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS series (
        id         INTEGER PRIMARY KEY,
        parameters TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS frames (
        id        INTEGER PRIMARY KEY,
        series_id INTEGER NOT NULL REFERENCES series(id) ON DELETE CASCADE,
        time      REAL NOT NULL,
        seq       INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS arrays (
        id       INTEGER PRIMARY KEY,
        frame_id INTEGER NOT NULL REFERENCES frames(id) ON DELETE CASCADE,
        name     TEXT NOT NULL,
        type_id  INTEGER NOT NULL,
        size     INTEGER NOT NULL,
        blob     BLOB NOT NULL,
        UNIQUE(frame_id, name)
    );
";

/// Compression level used for array blobs; middling default, not exposed as
/// a knob since spec.md doesn't name one.
const ZSTD_LEVEL: i32 = 3;

/// The on-disk time-series store: `Storage -> Series -> Frame -> Array`.
pub struct DataStorage {
    conn: Mutex<Connection>,
    max_series: Mutex<usize>,
}

impl DataStorage {
    /// Open (creating if absent) a storage file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        let max_series = read_max_series(&conn)?.unwrap_or(64);
        Ok(Self {
            conn: Mutex::new(conn),
            max_series: Mutex::new(max_series),
        })
    }

    /// Open a private in-memory storage, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_series: Mutex::new(64),
        })
    }

    /// Set the maximum number of series retained; if the current count
    /// exceeds `n`, the oldest series are deleted until it equals `n`.
    pub fn set_max_series(&self, n: usize) -> Result<()> {
        crate::tit_assert!(n > 0, "max_series must be positive");
        let conn = self.conn.lock();
        *self.max_series.lock() = n;
        evict_oldest_series(&conn, n)
    }

    /// Create a new series, evicting the oldest if this would exceed
    /// `max_series`.
    pub fn create_series(&self, parameters: &str) -> Result<SeriesId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO series (parameters, created_at) VALUES (?1, \
             (SELECT COALESCE(MAX(created_at), 0) + 1 FROM series))",
            params![parameters],
        )?;
        let id = conn.last_insert_rowid();
        let max_series = *self.max_series.lock();
        evict_oldest_series(&conn, max_series)?;
        Ok(SeriesId(id))
    }

    /// Delete a series and cascade to its frames and arrays.
    pub fn delete_series(&self, id: SeriesId) -> Result<()> {
        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM series WHERE id = ?1", params![id.0])?;
        if affected == 0 {
            return Err(Error::new(ErrorKind::UnknownSeries(id.0 as u64)));
        }
        Ok(())
    }

    /// Does this series id still exist?
    pub fn check_series(&self, id: SeriesId) -> bool {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT 1 FROM series WHERE id = ?1",
            params![id.0],
            |_| Ok(()),
        )
        .optional()
        .unwrap_or(None)
        .is_some()
    }

    /// All series ids, in insertion (creation) order.
    pub fn series_ids(&self) -> Result<std::vec::Vec<SeriesId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id FROM series ORDER BY created_at ASC, id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(SeriesId))
            .collect::<std::result::Result<_, _>>()?;
        Ok(ids)
    }

    /// Create a new frame at `time`. Fails if `time` is not strictly greater
    /// than the series' last frame's time.
    pub fn create_frame(&self, series_id: SeriesId, time: f64) -> Result<FrameId> {
        let conn = self.conn.lock();
        if !series_exists(&conn, series_id)? {
            return Err(Error::new(ErrorKind::UnknownSeries(series_id.0 as u64)));
        }
        let last: Option<f64> = conn
            .query_row(
                "SELECT time FROM frames WHERE series_id = ?1 ORDER BY seq DESC LIMIT 1",
                params![series_id.0],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(last_time) = last {
            if time <= last_time {
                return Err(Error::new(ErrorKind::FrameTimeNotMonotonic {
                    last: last_time,
                    new: time,
                }));
            }
        }
        let next_seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq), -1) + 1 FROM frames WHERE series_id = ?1",
            params![series_id.0],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO frames (series_id, time, seq) VALUES (?1, ?2, ?3)",
            params![series_id.0, time, next_seq],
        )?;
        Ok(FrameId(conn.last_insert_rowid()))
    }

    /// The time of the most recently inserted frame of `series_id`.
    pub fn series_last_time(&self, series_id: SeriesId) -> Result<Option<f64>> {
        let conn = self.conn.lock();
        let last = conn
            .query_row(
                "SELECT time FROM frames WHERE series_id = ?1 ORDER BY seq DESC LIMIT 1",
                params![series_id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(last)
    }

    /// Frame ids of `series_id`, in strictly increasing time order.
    pub fn frame_ids(&self, series_id: SeriesId) -> Result<std::vec::Vec<FrameId>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id FROM frames WHERE series_id = ?1 ORDER BY seq ASC")?;
        let ids = stmt
            .query_map(params![series_id.0], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(FrameId))
            .collect::<std::result::Result<_, _>>()?;
        Ok(ids)
    }

    pub fn frame_time(&self, frame_id: FrameId) -> Result<f64> {
        let conn = self.conn.lock();
        Ok(conn.query_row(
            "SELECT time FROM frames WHERE id = ?1",
            params![frame_id.0],
            |row| row.get(0),
        )?)
    }

    /// Declare a new (empty) array within a frame. Fails if the name is
    /// already used in that frame.
    pub fn create_array(&self, frame_id: FrameId, name: &str, ty: DataType) -> Result<ArrayId> {
        let conn = self.conn.lock();
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM arrays WHERE frame_id = ?1 AND name = ?2",
                params![frame_id.0, name],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if exists {
            return Err(Error::new(ErrorKind::ArrayExists(name.to_string())));
        }
        conn.execute(
            "INSERT INTO arrays (frame_id, name, type_id, size, blob) VALUES (?1, ?2, ?3, 0, ?4)",
            params![frame_id.0, name, ty.id(), std::vec::Vec::<u8>::new()],
        )?;
        Ok(ArrayId(conn.last_insert_rowid()))
    }

    /// Write `bytes` (uncompressed) into an array, compressing them and
    /// recording `size = bytes.len() / type.width()`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TruncatedArray`] if `bytes.len()` doesn't divide evenly
    /// by the array's element width.
    pub fn array_data_write(&self, array_id: ArrayId, bytes: &[u8]) -> Result<()> {
        let conn = self.conn.lock();
        let type_id: u32 = conn.query_row(
            "SELECT type_id FROM arrays WHERE id = ?1",
            params![array_id.0],
            |row| row.get(0),
        )?;
        let ty = DataType::from_id(type_id);
        let width = ty.width().max(1);
        if bytes.len() % width != 0 {
            return Err(Error::new(ErrorKind::TruncatedArray {
                bytes: bytes.len(),
                width,
            }));
        }
        let size = bytes.len() / width;

        let mut writer = compression::BlobWriter::new(ZSTD_LEVEL)?;
        std::io::Write::write_all(&mut writer, bytes)?;
        let blob = writer.finish()?;

        conn.execute(
            "UPDATE arrays SET size = ?1, blob = ?2 WHERE id = ?3",
            params![size as i64, blob, array_id.0],
        )?;
        Ok(())
    }

    /// Read back the decompressed bytes of an array.
    pub fn array_data_read(&self, array_id: ArrayId) -> Result<std::vec::Vec<u8>> {
        let conn = self.conn.lock();
        let blob: std::vec::Vec<u8> = conn.query_row(
            "SELECT blob FROM arrays WHERE id = ?1",
            params![array_id.0],
            |row| row.get(0),
        )?;
        compression::BlobReader::new(blob)?.read_all()
    }

    pub fn array_type(&self, array_id: ArrayId) -> Result<DataType> {
        let conn = self.conn.lock();
        let type_id: u32 = conn.query_row(
            "SELECT type_id FROM arrays WHERE id = ?1",
            params![array_id.0],
            |row| row.get(0),
        )?;
        Ok(DataType::from_id(type_id))
    }

    pub fn array_size(&self, array_id: ArrayId) -> Result<usize> {
        let conn = self.conn.lock();
        let size: i64 = conn.query_row(
            "SELECT size FROM arrays WHERE id = ?1",
            params![array_id.0],
            |row| row.get(0),
        )?;
        Ok(size as usize)
    }

    /// Names of every array in a frame.
    pub fn array_names(&self, frame_id: FrameId) -> Result<std::vec::Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM arrays WHERE frame_id = ?1 ORDER BY id")?;
        let names = stmt
            .query_map(params![frame_id.0], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(names)
    }

    pub fn find_array(&self, frame_id: FrameId, name: &str) -> Result<Option<ArrayId>> {
        let conn = self.conn.lock();
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM arrays WHERE frame_id = ?1 AND name = ?2",
                params![frame_id.0, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(ArrayId))
    }
}

fn series_exists(conn: &Connection, id: SeriesId) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM series WHERE id = ?1",
            params![id.0],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn evict_oldest_series(conn: &Connection, max_series: usize) -> Result<()> {
    loop {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM series", [], |row| row.get(0))?;
        if (count as usize) <= max_series {
            return Ok(());
        }
        conn.execute(
            "DELETE FROM series WHERE id = (SELECT id FROM series ORDER BY created_at ASC, id ASC LIMIT 1)",
            [],
        )?;
    }
}

fn read_max_series(conn: &Connection) -> Result<Option<usize>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = 'max_series'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::Kind;

    #[test]
    fn series_lifecycle() {
        let storage = DataStorage::open_in_memory().unwrap();
        let s = storage.create_series("{}").unwrap();
        assert!(storage.check_series(s));
        storage.delete_series(s).unwrap();
        assert!(!storage.check_series(s));
        assert!(matches!(
            storage.delete_series(s).unwrap_err().kind(),
            ErrorKind::UnknownSeries(_)
        ));
    }

    #[test]
    fn max_series_evicts_oldest() {
        let storage = DataStorage::open_in_memory().unwrap();
        storage.set_max_series(2).unwrap();
        let s1 = storage.create_series("a").unwrap();
        let _s2 = storage.create_series("b").unwrap();
        let _s3 = storage.create_series("c").unwrap();
        assert!(!storage.check_series(s1));
        assert_eq!(storage.series_ids().unwrap().len(), 2);
    }

    #[test]
    fn frame_time_must_be_monotonic() {
        let storage = DataStorage::open_in_memory().unwrap();
        let s = storage.create_series("{}").unwrap();
        storage.create_frame(s, 0.0).unwrap();
        storage.create_frame(s, 0.1).unwrap();
        let err = storage.create_frame(s, 0.05).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::FrameTimeNotMonotonic { .. }
        ));
        let err = storage.create_frame(s, 0.1).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::FrameTimeNotMonotonic { .. }
        ));
    }

    #[test]
    fn array_round_trip() {
        let storage = DataStorage::open_in_memory().unwrap();
        let s = storage.create_series("{}").unwrap();
        let f = storage.create_frame(s, 0.0).unwrap();
        let ty = DataType::scalar(Kind::F64);
        let a = storage.create_array(f, "m", ty).unwrap();
        let values: std::vec::Vec<f64> = vec![1.0, 2.0, 3.0];
        let bytes: std::vec::Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        storage.array_data_write(a, &bytes).unwrap();
        assert_eq!(storage.array_size(a).unwrap(), 3);
        let back = storage.array_data_read(a).unwrap();
        assert_eq!(back, bytes);

        let err = storage.create_array(f, "m", ty).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ArrayExists(_)));
    }

    #[test]
    fn array_write_must_divide_evenly() {
        let storage = DataStorage::open_in_memory().unwrap();
        let s = storage.create_series("{}").unwrap();
        let f = storage.create_frame(s, 0.0).unwrap();
        let ty = DataType::scalar(Kind::F64);
        let a = storage.create_array(f, "m", ty).unwrap();
        let err = storage.array_data_write(a, &[0u8; 7]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TruncatedArray { .. }));
    }
}
