use tokio_rusqlite::{Connection, OptionalExtension, Result, params, rusqlite};

use crate::database::utils::get_timestamp;

/// Toggle a user's reaction on a post.
///
/// Returns `true` when the post is now liked by the user, `false` when the
/// toggle removed an existing reaction.  The UNIQUE(owner_id, post_id)
/// constraint keeps this a strict on/off switch.
pub async fn toggle_reaction(conn: &Connection, owner_id: i64, post_id: i64) -> Result<bool> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        let existing: Option<i64> = conn
            .prepare("SELECT id FROM reactions WHERE owner_id = ?1 AND post_id = ?2")?
            .query_row(params![owner_id, post_id], |row| row.get(0))
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute("DELETE FROM reactions WHERE id = ?1", params![id])?;
                Ok(false)
            }
            None => {
                conn.execute(
                    "INSERT INTO reactions (owner_id, post_id, created_at) VALUES (?1, ?2, ?3)",
                    params![owner_id, post_id, now],
                )?;
                Ok(true)
            }
        }
    })
    .await
}

/// Whether the user currently reacts to the post.
pub async fn has_reaction(conn: &Connection, owner_id: i64, post_id: i64) -> Result<bool> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare("SELECT 1 FROM reactions WHERE owner_id = ?1 AND post_id = ?2")?;
        let exists = stmt
            .query_row(params![owner_id, post_id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create::open_database;
    use crate::database::{posts, users};

    async fn seed(conn: &Connection) -> (i64, i64) {
        let user = users::create_user(
            conn,
            users::NewUser {
                name: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "$argon2id$fake".to_string(),
            },
        )
        .await
        .unwrap();

        let post = posts::create_post(
            conn,
            posts::NewPost {
                title: "t".to_string(),
                body: "b".to_string(),
                owner_id: user,
            },
        )
        .await
        .unwrap();

        (user, post)
    }

    #[tokio::test]
    async fn toggle_flips_state() {
        let conn = open_database(":memory:").await.unwrap();
        let (bob, post) = seed(&conn).await;

        assert!(toggle_reaction(&conn, bob, post).await.unwrap());
        assert!(has_reaction(&conn, bob, post).await.unwrap());

        assert!(!toggle_reaction(&conn, bob, post).await.unwrap());
        assert!(!has_reaction(&conn, bob, post).await.unwrap());

        // And back on again.
        assert!(toggle_reaction(&conn, bob, post).await.unwrap());
    }
}
