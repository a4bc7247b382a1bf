use tokio_rusqlite::{Connection, Result, rusqlite};
use tracing::info;

/// Current schema version.  Bump this whenever the schema changes and add a
/// corresponding migration arm in `run_migrations`.
const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema and run any pending migrations.
pub async fn create_tables(conn: &Connection) -> Result<()> {
    create_schema(conn).await?;
    run_migrations(conn).await?;
    Ok(())
}

/// Create all tables for a brand-new database (version 1 schema).
async fn create_schema(conn: &Connection) -> Result<()> {
    conn.call(|conn: &mut rusqlite::Connection| {
        // Referential integrity between posts and their dependents is
        // enforced per-connection.  Deletion still goes through the
        // application-level cascade (children first) rather than
        // ON DELETE CASCADE, so every removal crosses the authorization
        // boundary and shows up in the logs.
        conn.execute_batch("PRAGMA foreign_keys = ON")?;

        // Users table — one row per registered principal.  The plaintext
        // password never reaches this table; password_hash is a
        // self-describing Argon2id PHC string.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                name          TEXT    NOT NULL,
                email         TEXT    NOT NULL UNIQUE,
                password_hash TEXT    NOT NULL,
                created_at    INTEGER NOT NULL,
                updated_at    INTEGER NOT NULL
            )",
            [],
        )?;

        // Posts — top-level resources, owned by exactly one user.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS posts (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                title      TEXT    NOT NULL,
                body       TEXT    NOT NULL DEFAULT '',
                owner_id   INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id)
            )",
            [],
        )?;

        // Comments — dependents of a post; may not outlive it.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS comments (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                body       TEXT    NOT NULL,
                owner_id   INTEGER NOT NULL,
                post_id    INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (post_id)  REFERENCES posts(id)
            )",
            [],
        )?;

        // Reactions — one per (user, post); toggled on and off.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS reactions (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id   INTEGER NOT NULL,
                post_id    INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (post_id)  REFERENCES posts(id),
                UNIQUE(owner_id, post_id)
            )",
            [],
        )?;

        // --- Indexes --------------------------------------------------------
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_posts_owner        ON posts(owner_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_comments_post      ON comments(post_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_comments_owner     ON comments(owner_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reactions_post     ON reactions(post_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reactions_owner    ON reactions(owner_id)",
            [],
        )?;

        Ok(())
    })
    .await
}

/// Bring an existing database up to `SCHEMA_VERSION`.
async fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version: u32 = conn
        .call(|conn| {
            let version =
                conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))?;
            Ok(version)
        })
        .await?;

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    info!(
        "Database schema at version {}, migrating to {}…",
        current_version, SCHEMA_VERSION
    );

    // Add future migration arms here:
    // if current_version < 2 { ... }

    conn.call(|conn| {
        conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
        Ok(())
    })
    .await?;

    info!("Schema version set to {}.", SCHEMA_VERSION);

    Ok(())
}

/// Open or create the database and ensure the schema is up to date.
pub async fn open_database(path: &str) -> Result<Connection> {
    let conn = if path == ":memory:" {
        Connection::open_in_memory().await?
    } else {
        Connection::open(path).await?
    };
    create_tables(&conn).await?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creates_cleanly() {
        let conn = open_database(":memory:").await.unwrap();

        let tables: Vec<String> = conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok::<_, tokio_rusqlite::Error>(names)
            })
            .await
            .unwrap();

        for expected in ["users", "posts", "comments", "reactions"] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn create_tables_is_idempotent() {
        let conn = open_database(":memory:").await.unwrap();
        create_tables(&conn).await.unwrap();
        create_tables(&conn).await.unwrap();
    }
}
