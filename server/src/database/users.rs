use tokio_rusqlite::{Connection, OptionalExtension, Result, params, rusqlite};

use crate::database::utils::get_timestamp;

/// Public view of a user — everything except the credential.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Auth view of a user — includes the stored hash, never serialized.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Insert a new user and return its id.
pub async fn create_user(conn: &Connection, new_user: NewUser) -> Result<i64> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        conn.execute(
            "INSERT INTO users (name, email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![new_user.name, new_user.email, new_user.password_hash, now],
        )?;

        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Get a user's public record by id.
pub async fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<UserRecord>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = ?1",
        )?;

        let user = stmt
            .query_row(params![user_id], |row: &rusqlite::Row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })
            .optional()?;

        Ok(user)
    })
    .await
}

/// Get user authentication data by email (login path).
pub async fn get_user_auth(conn: &Connection, email: String) -> Result<Option<UserAuth>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt =
            conn.prepare("SELECT id, name, email, password_hash FROM users WHERE email = ?1")?;

        let user = stmt
            .query_row(params![email], |row: &rusqlite::Row| {
                Ok(UserAuth {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                })
            })
            .optional()?;

        Ok(user)
    })
    .await
}

/// Check whether an email is already registered.
pub async fn email_taken(conn: &Connection, email: String) -> Result<bool> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare("SELECT 1 FROM users WHERE email = ?1")?;
        let exists = stmt
            .query_row(params![email], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    })
    .await
}

/// Update a user's display name.  Returns false when the user is gone.
pub async fn update_user_name(conn: &Connection, user_id: i64, name: String) -> Result<bool> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        let changed = conn.execute(
            "UPDATE users SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now, user_id],
        )?;
        Ok(changed > 0)
    })
    .await
}

/// Page through registered users, newest first (admin listing).
pub async fn list_users(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<UserRecord>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT id, name, email, created_at, updated_at
             FROM   users
             ORDER  BY id DESC
             LIMIT  ?1 OFFSET ?2",
        )?;

        let users = stmt
            .query_map(params![limit, offset], |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<UserRecord>, rusqlite::Error>>()?;

        Ok(users)
    })
    .await
}

pub async fn count_users(conn: &Connection) -> Result<i64> {
    conn.call(|conn: &mut rusqlite::Connection| {
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    })
    .await
}
