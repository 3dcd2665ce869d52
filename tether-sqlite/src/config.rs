//! SQLite configuration.

use std::path::{Path, PathBuf};

use crate::error::{SqliteError, SqliteResult};

/// SQLite database configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Database location.
    pub path: DatabasePath,
    /// Enforce `REFERENCES` clauses.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Synchronous mode.
    pub synchronous: SynchronousMode,
    /// Journal mode.
    pub journal_mode: JournalMode,
}

/// Database path configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Display form of the path.
    pub fn display(&self) -> String {
        match self {
            Self::Memory => ":memory:".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite synchronous mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynchronousMode {
    /// No syncs at all.
    Off,
    /// Sync at critical moments.
    #[default]
    Normal,
    /// Sync on every commit.
    Full,
    /// Full, plus the directory after unlinking a journal.
    Extra,
}

impl SynchronousMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }

    fn parse(value: &str) -> SqliteResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(Self::Off),
            "normal" | "1" => Ok(Self::Normal),
            "full" | "2" => Ok(Self::Full),
            "extra" | "3" => Ok(Self::Extra),
            other => Err(SqliteError::config(format!(
                "unknown synchronous mode '{}'",
                other
            ))),
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// Delete the rollback journal after each transaction.
    #[default]
    Delete,
    /// Truncate the journal instead of deleting it.
    Truncate,
    /// Keep the journal file and zero its header.
    Persist,
    /// Keep the journal in memory.
    Memory,
    /// Write-ahead logging.
    Wal,
    /// No journal.
    Off,
}

impl JournalMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }

    fn parse(value: &str) -> SqliteResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "truncate" => Ok(Self::Truncate),
            "persist" => Ok(Self::Persist),
            "memory" => Ok(Self::Memory),
            "wal" => Ok(Self::Wal),
            "off" => Ok(Self::Off),
            other => Err(SqliteError::config(format!(
                "unknown journal mode '{}'",
                other
            ))),
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            synchronous: SynchronousMode::Normal,
            journal_mode: JournalMode::Delete,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> SqliteResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(SqliteError::config(format!(
            "option '{}' expects a boolean, got '{}'",
            key, value
        ))),
    }
}

impl SqliteConfig {
    /// Create a new configuration for an in-memory database.
    pub fn memory() -> Self {
        Self {
            path: DatabasePath::Memory,
            journal_mode: JournalMode::Memory,
            ..Default::default()
        }
    }

    /// Create a new configuration for a file-based database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a connection URL into configuration.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` or `:memory:` - In-memory database
    /// - `sqlite://path/to/db.sqlite` - File-based database
    /// - `sqlite:path/to/db.sqlite` - Short form
    /// - `file:path/to/db.sqlite` - URI form
    /// - `Data Source=path/to/db.sqlite` - Connection-string form
    /// - `path/to/db.sqlite` - Bare path
    ///
    /// Options follow a `?` (or `;` for the connection-string form):
    /// `foreign_keys`, `busy_timeout`, `synchronous`, `journal_mode`, and
    /// `mode=memory`.
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url_str = url.as_ref().trim();

        if url_str == "sqlite::memory:" || url_str == ":memory:" {
            return Ok(Self::memory());
        }

        let (location, options) = if let Some(rest) = strip_data_source(url_str) {
            match rest.split_once(';') {
                Some((path, options)) => (path.trim(), Some(options)),
                None => (rest.trim(), None),
            }
        } else {
            let rest = url_str
                .strip_prefix("sqlite://")
                .or_else(|| url_str.strip_prefix("sqlite:"))
                .or_else(|| url_str.strip_prefix("file:"))
                .unwrap_or(url_str);
            match rest.split_once('?') {
                Some((path, options)) => (path, Some(options)),
                None => (rest, None),
            }
        };

        if location.is_empty() {
            return Err(SqliteError::config(format!(
                "database path is required in '{}'",
                url_str
            )));
        }

        let mut config = if location == ":memory:" {
            Self::memory()
        } else {
            Self::file(location)
        };

        let pairs = options
            .into_iter()
            .flat_map(|options| options.split(['&', ';']))
            .map(str::trim)
            .filter(|pair| !pair.is_empty());

        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(SqliteError::config(format!("malformed option '{}'", pair)));
            };
            let (key, value) = (key.trim(), value.trim());
            match key.to_ascii_lowercase().as_str() {
                "mode" if value == "memory" => config = config.path(DatabasePath::Memory),
                "foreign_keys" | "foreign keys" => config.foreign_keys = parse_bool(key, value)?,
                "busy_timeout" | "default timeout" => {
                    let ms = value.parse().map_err(|_| {
                        SqliteError::config(format!("busy_timeout expects milliseconds, got '{}'", value))
                    })?;
                    config.busy_timeout_ms = Some(ms);
                }
                "synchronous" => config.synchronous = SynchronousMode::parse(value)?,
                "journal_mode" | "journal mode" => config.journal_mode = JournalMode::parse(value)?,
                _ => {}
            }
        }

        Ok(config)
    }

    /// Get a display form of the database location.
    pub fn path_str(&self) -> String {
        self.path.display()
    }

    /// Generate the initialization SQL run on every new connection.
    pub fn init_sql(&self) -> String {
        let mut sql = String::new();

        sql.push_str(&format!(
            "PRAGMA foreign_keys = {};\n",
            if self.foreign_keys { "ON" } else { "OFF" }
        ));

        sql.push_str(&format!(
            "PRAGMA journal_mode = {};\n",
            self.journal_mode.as_pragma()
        ));

        sql.push_str(&format!(
            "PRAGMA synchronous = {};\n",
            self.synchronous.as_pragma()
        ));

        if let Some(timeout) = self.busy_timeout_ms {
            sql.push_str(&format!("PRAGMA busy_timeout = {};\n", timeout));
        }

        sql
    }

    /// Set the database path.
    pub fn path(mut self, path: DatabasePath) -> Self {
        if path.is_memory() {
            self.journal_mode = JournalMode::Memory;
        }
        self.path = path;
        self
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Set the synchronous mode.
    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Set the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}

fn strip_data_source(url: &str) -> Option<&str> {
    let (key, rest) = url.split_once('=')?;
    if key.trim().eq_ignore_ascii_case("data source") {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_memory() {
        let config = SqliteConfig::memory();
        assert!(config.path.is_memory());
        assert_eq!(config.path_str(), ":memory:");
        assert_eq!(config.journal_mode, JournalMode::Memory);
    }

    #[test]
    fn test_config_from_url_memory() {
        assert!(SqliteConfig::from_url("sqlite::memory:").unwrap().path.is_memory());
        assert!(SqliteConfig::from_url(":memory:").unwrap().path.is_memory());
        assert!(SqliteConfig::from_url("sqlite::memory:?foreign_keys=off").is_ok());
        assert!(
            SqliteConfig::from_url("file:shared?mode=memory")
                .unwrap()
                .path
                .is_memory()
        );
    }

    #[test]
    fn test_config_from_url_file_forms() {
        let expected = DatabasePath::File(PathBuf::from("helloapp.db"));
        for url in [
            "sqlite://helloapp.db",
            "sqlite:helloapp.db",
            "file:helloapp.db",
            "Data Source=helloapp.db",
            "data source = helloapp.db",
            "helloapp.db",
        ] {
            assert_eq!(SqliteConfig::from_url(url).unwrap().path, expected, "{}", url);
        }
    }

    #[test]
    fn test_config_from_url_with_options() {
        let config = SqliteConfig::from_url(
            "sqlite://./test.db?foreign_keys=false&busy_timeout=10000&synchronous=full&journal_mode=wal",
        )
        .unwrap();

        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, Some(10000));
        assert_eq!(config.synchronous, SynchronousMode::Full);
        assert_eq!(config.journal_mode, JournalMode::Wal);
    }

    #[test]
    fn test_data_source_options() {
        let config = SqliteConfig::from_url("Data Source=app.db;Foreign Keys=True;Default Timeout=250").unwrap();
        assert_eq!(config.path, DatabasePath::File(PathBuf::from("app.db")));
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, Some(250));
    }

    #[test]
    fn test_invalid_urls_are_rejected() {
        assert!(matches!(
            SqliteConfig::from_url("sqlite://"),
            Err(SqliteError::Config(_))
        ));
        assert!(SqliteConfig::from_url("Data Source=").is_err());
        assert!(SqliteConfig::from_url("app.db?journal_mode=fast").is_err());
        assert!(SqliteConfig::from_url("app.db?busy_timeout=soon").is_err());
        assert!(SqliteConfig::from_url("app.db?foreign_keys").is_err());
    }

    #[test]
    fn test_init_sql() {
        let sql = SqliteConfig::file("app.db").init_sql();

        assert!(sql.contains("foreign_keys = ON"));
        assert!(sql.contains("journal_mode = DELETE"));
        assert!(sql.contains("synchronous = NORMAL"));
        assert!(sql.contains("busy_timeout = 5000"));

        let sql = SqliteConfig::memory().foreign_keys(false).init_sql();
        assert!(sql.contains("foreign_keys = OFF"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = SqliteConfig::file("app.db")
            .foreign_keys(false)
            .busy_timeout(3000)
            .synchronous(SynchronousMode::Full)
            .journal_mode(JournalMode::Wal);

        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, Some(3000));
        assert_eq!(config.synchronous, SynchronousMode::Full);
        assert_eq!(config.journal_mode, JournalMode::Wal);
    }
}
