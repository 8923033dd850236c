//! SQLite-backed media store.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use rusqlite::{params, Connection, Row};

use crate::duplicates::{common_path, FileIndex, FileRecord, Occurrence};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS media (
    name TEXT PRIMARY KEY,
    size INTEGER NOT NULL,
    datetime TEXT NOT NULL,
    exif_datetime_original TEXT,
    mime_type TEXT NOT NULL,
    mime_subtype TEXT NOT NULL,
    extension TEXT NOT NULL,
    width INTEGER,
    height INTEGER,
    count INTEGER NOT NULL,
    file_size_mismatch INTEGER NOT NULL,
    suffix_common_path TEXT NOT NULL,
    max_common_path TEXT NOT NULL,
    filepath TEXT NOT NULL,
    exif_json TEXT
);
CREATE TABLE IF NOT EXISTS duplicates (
    datetime TEXT NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    filepath TEXT PRIMARY KEY
);
CREATE INDEX IF NOT EXISTS idx_duplicates_name ON duplicates(name);
";

const INSERT_MEDIA: &str = "INSERT OR IGNORE INTO media \
    (name, size, datetime, mime_type, mime_subtype, extension, width, height, count, \
     file_size_mismatch, suffix_common_path, max_common_path, filepath, \
     exif_datetime_original, exif_json) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const INSERT_DUPLICATE: &str = "INSERT OR IGNORE INTO duplicates \
    (datetime, name, size, filepath) VALUES (?1, ?2, ?3, ?4)";

const SELECT_MEDIA: &str = "SELECT name, size, datetime, mime_type, mime_subtype, extension, \
    width, height, count, file_size_mismatch, suffix_common_path, max_common_path, filepath, \
    exif_datetime_original, exif_json \
    FROM media WHERE size > ?1 AND mime_type IN ('image', 'video') ORDER BY name";

/// Errors from the media store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// SQLite failure
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The occurrence list could not be encoded or decoded
    #[error("Invalid filepath JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored timestamp is not RFC 3339
    #[error("Invalid datetime for {name}: {value}")]
    InvalidDate {
        name: String,
        value: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Text form of `exif_datetime_original`; EXIF times carry no offset.
pub const EXIF_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rows written versus rows that already existed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertCounts {
    pub inserted: u64,
    pub existing: u64,
}

impl InsertCounts {
    fn tally(&mut self, changed: usize) {
        if changed == 0 {
            self.existing += 1;
        } else {
            self.inserted += 1;
        }
    }
}

/// One `media` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub name: String,
    pub size: u64,
    pub datetime: DateTime<Utc>,
    /// Top-level type: `image`, `audio`, `video` or `other`
    pub mime_type: String,
    pub mime_subtype: String,
    pub extension: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub count: usize,
    pub file_size_mismatch: bool,
    pub suffix_common_path: String,
    pub max_common_path: String,
    pub occurrences: Vec<Occurrence>,
    pub exif_datetime_original: Option<NaiveDateTime>,
    /// EXIF tag map, stored as JSON.
    pub exif_tags: Option<BTreeMap<String, String>>,
}

// Text columns decoded after the row is read.
struct StoredRow {
    row: MediaRow,
    datetime: String,
    filepath: String,
    exif_datetime: Option<String>,
    exif_json: Option<String>,
}

impl MediaRow {
    /// Build the row for `record`, running the path analysis.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Self {
        let analysis = common_path::resolve(&record.occurrences);
        let dims = record.metadata.dimensions;
        let exif = record.metadata.exif.as_ref();
        Self {
            name: record.name.clone(),
            size: record.size,
            datetime: record.modified,
            mime_type: record.classification.kind.as_str().to_string(),
            mime_subtype: record.classification.mime_subtype().to_string(),
            extension: record.classification.extension.clone(),
            width: dims.map(|(w, _)| w),
            height: dims.map(|(_, h)| h),
            count: record.occurrences.len(),
            file_size_mismatch: record.size_mismatch,
            suffix_common_path: analysis.common_suffix,
            max_common_path: analysis.common_ancestor,
            occurrences: record.occurrences.clone(),
            exif_datetime_original: exif.and_then(|e| e.datetime_original),
            exif_tags: exif.map(|e| e.tags.clone()),
        }
    }

    fn from_sql(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
        let size: i64 = row.get(1)?;
        let count: i64 = row.get(8)?;
        Ok(StoredRow {
            row: Self {
                name: row.get(0)?,
                size: u64::try_from(size).unwrap_or(0),
                datetime: DateTime::<Utc>::default(),
                mime_type: row.get(3)?,
                mime_subtype: row.get(4)?,
                extension: row.get(5)?,
                width: row.get(6)?,
                height: row.get(7)?,
                count: usize::try_from(count).unwrap_or(0),
                file_size_mismatch: row.get(9)?,
                suffix_common_path: row.get(10)?,
                max_common_path: row.get(11)?,
                occurrences: Vec::new(),
                exif_datetime_original: None,
                exif_tags: None,
            },
            datetime: row.get(2)?,
            filepath: row.get(12)?,
            exif_datetime: row.get(13)?,
            exif_json: row.get(14)?,
        })
    }
}

impl StoredRow {
    fn decode(self) -> StoreResult<MediaRow> {
        let Self {
            mut row,
            datetime,
            filepath,
            exif_datetime,
            exif_json,
        } = self;

        row.datetime = DateTime::parse_from_rfc3339(&datetime)
            .map_err(|_| StoreError::InvalidDate {
                name: row.name.clone(),
                value: datetime.clone(),
            })?
            .with_timezone(&Utc);
        if let Some(value) = exif_datetime {
            row.exif_datetime_original = Some(
                NaiveDateTime::parse_from_str(&value, EXIF_DATETIME_FORMAT).map_err(|_| {
                    StoreError::InvalidDate {
                        name: row.name.clone(),
                        value: value.clone(),
                    }
                })?,
            );
        }
        row.occurrences = serde_json::from_str(&filepath)?;
        row.exif_tags = exif_json.as_deref().map(serde_json::from_str).transpose()?;
        Ok(row)
    }
}

fn sql_size(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

/// SQLite database of scanned media.
pub struct MediaStore {
    conn: Connection,
}

impl MediaStore {
    /// Open or create the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot
    /// be created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.configure_pragmas()?;
        store.init_schema()?;
        log::debug!("Opened media store at {}", path.display());
        Ok(store)
    }

    /// In-memory store, used by tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn configure_pragmas(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert one `media` row per record.
    ///
    /// Rows (path analysis and JSON encoding) are prepared on the rayon
    /// pool; the inserts run in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any insert fails; nothing is
    /// committed in that case.
    pub fn write_records(&mut self, index: &FileIndex) -> StoreResult<InsertCounts> {
        let records: Vec<&FileRecord> = index.iter().collect();
        let rows = records
            .par_iter()
            .map(|record| {
                let row = MediaRow::from_record(record);
                let filepath = serde_json::to_string(&row.occurrences)?;
                let exif_json = row.exif_tags.as_ref().map(serde_json::to_string).transpose()?;
                Ok::<_, StoreError>((row, filepath, exif_json))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let mut counts = InsertCounts::default();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_MEDIA)?;
            for (row, filepath, exif_json) in &rows {
                let changed = stmt.execute(params![
                    row.name,
                    sql_size(row.size),
                    row.datetime.to_rfc3339(),
                    row.mime_type,
                    row.mime_subtype,
                    row.extension,
                    row.width,
                    row.height,
                    i64::try_from(row.count).unwrap_or(i64::MAX),
                    row.file_size_mismatch,
                    row.suffix_common_path,
                    row.max_common_path,
                    filepath,
                    row.exif_datetime_original
                        .map(|dt| dt.format(EXIF_DATETIME_FORMAT).to_string()),
                    exif_json,
                ])?;
                counts.tally(changed);
            }
        }
        tx.commit()?;

        log::info!(
            "Media rows: {} new, {} already present",
            counts.inserted,
            counts.existing
        );
        Ok(counts)
    }

    /// Insert one `duplicates` row per path of every duplicate set.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is committed then.
    pub fn write_duplicates(&mut self, index: &FileIndex) -> StoreResult<InsertCounts> {
        let mut counts = InsertCounts::default();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_DUPLICATE)?;
            for record in index.duplicates() {
                let datetime = record.modified.to_rfc3339();
                for occurrence in &record.occurrences {
                    let changed = stmt.execute(params![
                        datetime,
                        record.name,
                        sql_size(occurrence.size),
                        occurrence.path,
                    ])?;
                    counts.tally(changed);
                }
            }
        }
        tx.commit()?;

        log::info!(
            "Duplicate rows: {} new, {} already present",
            counts.inserted,
            counts.existing
        );
        Ok(counts)
    }

    /// Image and video rows larger than `min_size` bytes, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is malformed.
    pub fn load_media(&self, min_size: u64) -> StoreResult<Vec<MediaRow>> {
        let mut stmt = self.conn.prepare(SELECT_MEDIA)?;
        let raw = stmt
            .query_map(params![sql_size(min_size)], MediaRow::from_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter().map(StoredRow::decode).collect()
    }

    /// Number of rows in `media`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn media_count(&self) -> StoreResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Number of rows in `duplicates`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn duplicate_count(&self) -> StoreResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM duplicates", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}
