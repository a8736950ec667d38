use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::{info, instrument};

/// One app's storefront metadata in one country.
///
/// `(app_id, country)` is the natural key but nothing enforces it; the same
/// `app_id` recurs once per country partition.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRow {
    pub app_id: i64,
    pub name: Option<String>,
    /// Storefront price in the country's currency (minor units / 100).
    pub price: f64,
    /// `price` converted into the reference currency.
    pub price_jpy: i64,
    pub genres: String,
    pub release_date: Option<String>,
    pub recommendations: i64,
    pub developers: String,
    pub publishers: String,
    pub platforms: String,
    pub required_age: i64,
    pub is_free: bool,
    pub country: String,
}

/// Persistent bag of canonical rows. Ingestion replaces it wholesale.
pub trait RowStore {
    /// Overwrite the entire table with `rows`. Zero rows leaves an empty table.
    fn replace_all(&mut self, rows: &[GameRow]) -> Result<usize>;
    /// Every persisted row, unfiltered.
    fn load_all(&self) -> Result<Vec<GameRow>>;
}

const CREATE_GAMES: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    app_id          INTEGER NOT NULL,
    name            TEXT,
    price           REAL    NOT NULL DEFAULT 0,
    price_jpy       INTEGER NOT NULL DEFAULT 0,
    genres          TEXT    NOT NULL DEFAULT '',
    release_date    TEXT,
    recommendations INTEGER NOT NULL DEFAULT 0,
    developers      TEXT    NOT NULL DEFAULT '',
    publishers      TEXT    NOT NULL DEFAULT '',
    platforms       TEXT    NOT NULL DEFAULT '',
    required_age    INTEGER NOT NULL DEFAULT 0,
    is_free         INTEGER NOT NULL DEFAULT 0,
    country         TEXT    NOT NULL
);
"#;

const INSERT_GAME: &str = "INSERT INTO games (app_id, name, price, price_jpy, genres, release_date, \
     recommendations, developers, publishers, platforms, required_age, is_free, country) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

const SELECT_GAMES: &str = "SELECT app_id, name, price, price_jpy, genres, release_date, \
     recommendations, developers, publishers, platforms, required_age, is_free, country \
     FROM games ORDER BY rowid";

/// SQLite-backed row store (single `games` table).
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create db directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
        conn.busy_timeout(std::time::Duration::from_secs(3))?;
        Self::from_connection(conn)
    }

    /// Open a store that must already exist; never creates the file or its directory.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("sqlite db {} does not exist; run `ingest` first", path.display());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
        conn.busy_timeout(std::time::Duration::from_secs(3))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_GAMES)
            .context("failed to ensure games table")?;
        Ok(Self { conn })
    }

    /// Row counts per country, ordered by country code.
    pub fn country_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT country, COUNT(*) FROM games GROUP BY country ORDER BY country")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl RowStore for SqliteStore {
    fn replace_all(&mut self, rows: &[GameRow]) -> Result<usize> {
        // A failure anywhere before commit drops the transaction and rolls back,
        // so the previous table stays intact.
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM games", [])
            .context("failed to clear games table")?;
        {
            let mut stmt = tx.prepare(INSERT_GAME)?;
            for row in rows {
                stmt.execute(params![
                    row.app_id,
                    row.name,
                    row.price,
                    row.price_jpy,
                    row.genres,
                    row.release_date,
                    row.recommendations,
                    row.developers,
                    row.publishers,
                    row.platforms,
                    row.required_age,
                    row.is_free,
                    row.country,
                ])
                .with_context(|| {
                    format!("failed to insert app {} ({})", row.app_id, row.country)
                })?;
            }
        }
        tx.commit().context("failed to commit games replacement")?;
        info!(rows = rows.len(), "games table replaced");
        Ok(rows.len())
    }

    fn load_all(&self) -> Result<Vec<GameRow>> {
        let mut stmt = self.conn.prepare(SELECT_GAMES)?;
        let mapped = stmt.query_map([], |r| {
            Ok(GameRow {
                app_id: r.get(0)?,
                name: r.get(1)?,
                price: r.get(2)?,
                price_jpy: r.get(3)?,
                genres: r.get(4)?,
                release_date: r.get(5)?,
                recommendations: r.get(6)?,
                developers: r.get(7)?,
                publishers: r.get(8)?,
                platforms: r.get(9)?,
                required_age: r.get(10)?,
                is_free: r.get(11)?,
                country: r.get(12)?,
            })
        })?;
        let mut out = Vec::new();
        for row in mapped {
            out.push(row.context("failed to decode games row")?);
        }
        Ok(out)
    }
}

/// In-process store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Vec<GameRow>,
}

impl RowStore for MemoryStore {
    fn replace_all(&mut self, rows: &[GameRow]) -> Result<usize> {
        self.rows = rows.to_vec();
        Ok(self.rows.len())
    }

    fn load_all(&self) -> Result<Vec<GameRow>> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
pub(crate) fn sample_row(app_id: i64, country: &str) -> GameRow {
    GameRow {
        app_id,
        name: Some(format!("Game {app_id}")),
        price: 0.0,
        price_jpy: 0,
        genres: String::new(),
        release_date: None,
        recommendations: 0,
        developers: String::new(),
        publishers: String::new(),
        platforms: String::new(),
        required_age: 0,
        is_free: false,
        country: country.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich_row() -> GameRow {
        GameRow {
            price: 19.99,
            price_jpy: 2998,
            genres: "Action, Indie".into(),
            release_date: Some("21 Aug, 2012".into()),
            recommendations: 1200,
            developers: "Valve".into(),
            publishers: "Valve".into(),
            platforms: "windows, linux".into(),
            required_age: 17,
            is_free: true,
            ..sample_row(730, "us")
        }
    }

    #[test]
    fn sqlite_store_preserves_every_column() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let rows = vec![rich_row(), sample_row(10, "jp")];
        assert_eq!(store.replace_all(&rows).unwrap(), 2);
        assert_eq!(store.load_all().unwrap(), rows);
    }

    #[test]
    fn replace_drops_previous_contents() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .replace_all(&[sample_row(1, "jp"), sample_row(2, "jp")])
            .unwrap();
        store.replace_all(&[sample_row(3, "us")]).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].app_id, 3);
    }

    #[test]
    fn empty_replace_and_fresh_load_are_valid() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load_all().unwrap().is_empty());
        store.replace_all(&[sample_row(1, "jp")]).unwrap();
        assert_eq!(store.replace_all(&[]).unwrap(), 0);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn duplicates_are_tolerated() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .replace_all(&[sample_row(1, "jp"), sample_row(1, "jp")])
            .unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);
        assert_eq!(store.country_counts().unwrap(), vec![("jp".to_string(), 2)]);
    }

    #[test]
    fn existing_open_refuses_missing_file() {
        let dir = std::env::temp_dir().join(format!("steam_db_missing_{}", std::process::id()));
        let path = dir.join("games.db");
        let err = SqliteStore::open_existing(&path).err().unwrap();
        assert!(err.to_string().contains("does not exist"), "{err}");
        assert!(!path.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn existing_open_reads_an_ingested_file() {
        let dir = std::env::temp_dir().join(format!("steam_db_existing_{}", std::process::id()));
        let path = dir.join("games.db");
        SqliteStore::open(&path)
            .unwrap()
            .replace_all(&[sample_row(7, "kr")])
            .unwrap();
        let store = SqliteStore::open_existing(&path).unwrap();
        assert_eq!(store.country_counts().unwrap(), vec![("kr".to_string(), 1)]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::default();
        store.replace_all(&[rich_row()]).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![rich_row()]);
    }
}
