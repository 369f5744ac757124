use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{debug, warn};

use super::error::{DbError, Result};
use super::reader::{QueryOptions, QueryReader};

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// The kinds of on-disk database this tool can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// A plain ECDb file, read-write capable.
    EcDb,
    /// A point-in-time iModel snapshot. Always read-only.
    Snapshot,
    /// A standalone iModel not attached to any hub.
    Standalone,
    /// A local briefcase that can pull and push changesets.
    Briefcase,
    /// Any other SQLite file. No ECSql support.
    Sqlite,
}

impl StoreKind {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("ecdb") => StoreKind::EcDb,
            Some("bim") => StoreKind::Standalone,
            _ => StoreKind::Sqlite,
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            StoreKind::Sqlite => Capabilities {
                query_language: false,
                schema_introspection: false,
                incremental_sync: false,
            },
            StoreKind::Briefcase => Capabilities {
                query_language: true,
                schema_introspection: true,
                incremental_sync: true,
            },
            StoreKind::EcDb | StoreKind::Snapshot | StoreKind::Standalone => Capabilities {
                query_language: true,
                schema_introspection: true,
                incremental_sync: false,
            },
        }
    }

    /// The open modes offered when prompting for this kind of file.
    pub fn open_modes(self) -> &'static [OpenMode] {
        match self {
            StoreKind::EcDb => &[OpenMode::ReadOnly, OpenMode::ReadWrite, OpenMode::FileUpgrade],
            StoreKind::Snapshot => &[OpenMode::ReadOnly],
            _ => &[OpenMode::ReadOnly, OpenMode::ReadWrite],
        }
    }

    /// Writable handles of these kinds hold an exclusive file lock until closed.
    fn locks_exclusively(self) -> bool {
        matches!(self, StoreKind::Standalone | StoreKind::Briefcase)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::EcDb => "ECDb",
            StoreKind::Snapshot => "snapshot",
            StoreKind::Standalone => "standalone",
            StoreKind::Briefcase => "briefcase",
            StoreKind::Sqlite => "SQLite",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
    /// Read-write, upgrading the file format when necessary.
    FileUpgrade,
}

impl OpenMode {
    pub fn is_read_only(self) -> bool {
        self == OpenMode::ReadOnly
    }

    pub fn label(self) -> &'static str {
        match self {
            OpenMode::ReadOnly => "Open in read-only mode",
            OpenMode::ReadWrite => "Open in read-write mode",
            OpenMode::FileUpgrade => {
                "Open in read-write mode and upgrade the file format if necessary"
            }
        }
    }
}

/// What a handle can do. Fixed when the handle is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub query_language: bool,
    pub schema_introspection: bool,
    pub incremental_sync: bool,
}

/// One row of the schema inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaInfo {
    pub name: String,
    pub alias: String,
    pub version: String,
}

#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    conn: Option<Connection>,
    read_only: bool,
    capabilities: Capabilities,
}

impl Store {
    fn open(path: &Path, kind: StoreKind, mode: OpenMode) -> Result<Self> {
        check_sqlite_header(path)?;

        let read_only = mode.is_read_only() || kind == StoreKind::Snapshot;
        let access = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(path, flags).map_err(|e| DbError::io(path, e))?;

        if kind.locks_exclusively() && !read_only {
            conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| DbError::io(path, e))?;
        }

        // Touch the schema so a corrupt or encrypted file fails here rather than on first query.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| DbError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            conn: Some(conn),
            read_only,
            capabilities: kind.capabilities(),
        })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(DbError::Closed)
    }

    fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| DbError::io(&self.path, e)),
            None => Ok(()),
        }
    }
}

fn check_sqlite_header(path: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| DbError::io(path, e))?;
    let mut header = [0u8; 16];
    file.read_exact(&mut header)
        .map_err(|_| DbError::io(path, "file is too small to be a database"))?;
    if &header != SQLITE_HEADER {
        return Err(DbError::io(path, "not a recognized database file"));
    }
    Ok(())
}

/// An open session against one database file.
///
/// Each variant wraps the same storage plumbing; what differs between them is
/// captured in [`Capabilities`] and in the checks each operation makes.
#[derive(Debug)]
pub enum DbHandle {
    EcDb(Store),
    Snapshot(Store),
    Standalone(Store),
    Briefcase(Store),
    Sqlite(Store),
}

impl DbHandle {
    pub fn open(path: &Path, kind: StoreKind, mode: OpenMode) -> Result<Self> {
        let store = Store::open(path, kind, mode)?;
        debug!(path = %path.display(), %kind, ?mode, "opened database");
        Ok(match kind {
            StoreKind::EcDb => DbHandle::EcDb(store),
            StoreKind::Snapshot => DbHandle::Snapshot(store),
            StoreKind::Standalone => DbHandle::Standalone(store),
            StoreKind::Briefcase => DbHandle::Briefcase(store),
            StoreKind::Sqlite => DbHandle::Sqlite(store),
        })
    }

    /// Opens `path` after asking `choose_mode` how to open it.
    ///
    /// Returns `Ok(None)` when the chooser gives no answer (the user backed out).
    pub fn open_with<F>(path: &Path, kind: StoreKind, choose_mode: F) -> Result<Option<Self>>
    where
        F: FnOnce(StoreKind, &[OpenMode]) -> Option<OpenMode>,
    {
        let modes = kind.open_modes();
        let mode = if modes.len() == 1 {
            Some(modes[0])
        } else {
            choose_mode(kind, modes)
        };

        match mode {
            Some(mode) => Self::open(path, kind, mode).map(Some),
            None => {
                debug!(path = %path.display(), "open cancelled");
                Ok(None)
            }
        }
    }

    fn store(&self) -> &Store {
        match self {
            DbHandle::EcDb(s)
            | DbHandle::Snapshot(s)
            | DbHandle::Standalone(s)
            | DbHandle::Briefcase(s)
            | DbHandle::Sqlite(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut Store {
        match self {
            DbHandle::EcDb(s)
            | DbHandle::Snapshot(s)
            | DbHandle::Standalone(s)
            | DbHandle::Briefcase(s)
            | DbHandle::Sqlite(s) => s,
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            DbHandle::EcDb(_) => StoreKind::EcDb,
            DbHandle::Snapshot(_) => StoreKind::Snapshot,
            DbHandle::Standalone(_) => StoreKind::Standalone,
            DbHandle::Briefcase(_) => StoreKind::Briefcase,
            DbHandle::Sqlite(_) => StoreKind::Sqlite,
        }
    }

    pub fn path(&self) -> &Path {
        &self.store().path
    }

    pub fn is_open(&self) -> bool {
        self.store().conn.is_some()
    }

    pub fn is_read_only(&self) -> bool {
        self.store().read_only
    }

    pub fn capabilities(&self) -> Capabilities {
        self.store().capabilities
    }

    pub fn supports_query_language(&self) -> bool {
        self.capabilities().query_language
    }

    pub fn supports_schema_introspection(&self) -> bool {
        self.capabilities().schema_introspection
    }

    pub fn supports_incremental_sync(&self) -> bool {
        self.capabilities().incremental_sync
    }

    /// Prepares `query` and returns a reader that can be drained into a [`ResultSet`].
    ///
    /// [`ResultSet`]: super::value::ResultSet
    pub fn execute(
        &self,
        query: &str,
        params: &[SqlValue],
        options: QueryOptions,
    ) -> Result<QueryReader<'_>> {
        let conn = self.store().conn()?;
        if !self.supports_query_language() {
            return Err(DbError::query(query, "ECSql is not supported by this DB type."));
        }
        debug!(query, limit = ?options.limit, "executing query");
        QueryReader::prepare(conn, query, params, options)
    }

    /// Looks up the name of the class with the given id, if the file knows it.
    pub fn class_name(&self, class_id: i64) -> Result<Option<String>> {
        let sql = "SELECT Name FROM ec_Class WHERE Id = ?1 LIMIT 1";
        let conn = self.store().conn()?;
        if !self.supports_schema_introspection() {
            return Err(DbError::query(sql, "class lookup is not supported by this DB type."));
        }
        conn.query_row(sql, [class_id], |row| row.get::<_, String>(0))
            .optional()
            .map_err(|e| DbError::query(sql, e))
    }

    /// Lists the schemas stored in the file.
    pub fn schemas(&self) -> Result<Vec<SchemaInfo>> {
        let sql = "SELECT Name, Alias, VersionDigit1, VersionDigit2, VersionDigit3 \
                   FROM ec_Schema ORDER BY Name";
        let conn = self.store().conn()?;
        if !self.supports_schema_introspection() {
            return Err(DbError::query(sql, "schemas are not supported by this DB type."));
        }
        let mut stmt = conn.prepare(sql).map_err(|e| DbError::query(sql, e))?;
        let schemas = stmt
            .query_map([], |row| {
                let major: i64 = row.get(2)?;
                let write: i64 = row.get::<_, Option<i64>>(3)?.unwrap_or(0);
                let minor: i64 = row.get::<_, Option<i64>>(4)?.unwrap_or(0);
                Ok(SchemaInfo {
                    name: row.get(0)?,
                    alias: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    version: format!("{:02}.{:02}.{:02}", major, write, minor),
                })
            })
            .map_err(|e| DbError::query(sql, e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DbError::query(sql, e))?;
        Ok(schemas)
    }

    /// Closes the handle. Closing an already closed handle does nothing.
    pub fn close(&mut self) -> Result<()> {
        let was_open = self.is_open();
        self.store_mut().close()?;
        if was_open {
            debug!(path = %self.path().display(), "closed database");
        }
        Ok(())
    }
}

impl Drop for DbHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close database");
        }
    }
}
