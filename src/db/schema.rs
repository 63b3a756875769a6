use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

pub const LINKS_TABLE: &str = "links";

/// Creates the `links` table and its indexes when the table is absent.
///
/// Returns `true` when the schema was created by this call.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<bool> {
    let exists = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [LINKS_TABLE],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .is_some();

    if exists {
        return Ok(false);
    }

    conn.execute_batch(
        r#"
        CREATE TABLE links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            favicon TEXT NOT NULL,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX idx_links_url ON links(url);
        CREATE INDEX idx_links_is_favorite ON links(is_favorite);
        "#,
    )?;

    debug!("Created links table");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_creates_table_and_indexes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(init_schema(&conn).unwrap());

        let indexes: Vec<(String, i64)> = conn
            .prepare("SELECT name, \"unique\" FROM pragma_index_list('links') ORDER BY name")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .filter_map(Result::ok)
            .collect();

        assert!(indexes.contains(&("idx_links_url".to_string(), 1)));
        assert!(indexes.contains(&("idx_links_is_favorite".to_string(), 0)));
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(init_schema(&conn).unwrap());
        assert!(!init_schema(&conn).unwrap());
    }
}
