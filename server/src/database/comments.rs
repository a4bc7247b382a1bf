use tokio_rusqlite::{Connection, OptionalExtension, Result, params, rusqlite};

use crate::database::utils::get_timestamp;

#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: i64,
    pub body: String,
    pub owner_id: i64,
    pub post_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub body: String,
    pub owner_id: i64,
    pub post_id: i64,
}

/// Insert a comment and return its id.  Callers verify the parent post
/// exists first; the FK constraint backstops them.
pub async fn create_comment(conn: &Connection, new_comment: NewComment) -> Result<i64> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        conn.execute(
            "INSERT INTO comments (body, owner_id, post_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![new_comment.body, new_comment.owner_id, new_comment.post_id, now],
        )?;

        Ok(conn.last_insert_rowid())
    })
    .await
}

pub async fn get_comment(conn: &Connection, comment_id: i64) -> Result<Option<CommentRecord>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT id, body, owner_id, post_id, created_at FROM comments WHERE id = ?1",
        )?;

        let comment = stmt
            .query_row(params![comment_id], |row: &rusqlite::Row| {
                Ok(CommentRecord {
                    id: row.get(0)?,
                    body: row.get(1)?,
                    owner_id: row.get(2)?,
                    post_id: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .optional()?;

        Ok(comment)
    })
    .await
}

/// Page through a post's comments, oldest first.
pub async fn list_post_comments(
    conn: &Connection,
    post_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<CommentRecord>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT id, body, owner_id, post_id, created_at
             FROM   comments
             WHERE  post_id = ?1
             ORDER  BY id ASC
             LIMIT  ?2 OFFSET ?3",
        )?;

        let comments = stmt
            .query_map(params![post_id, limit, offset], |row| {
                Ok(CommentRecord {
                    id: row.get(0)?,
                    body: row.get(1)?,
                    owner_id: row.get(2)?,
                    post_id: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<CommentRecord>, rusqlite::Error>>()?;

        Ok(comments)
    })
    .await
}

/// Delete a single comment (a leaf — nothing depends on it, so no cascade).
/// Returns false when the comment was already gone.
pub async fn delete_comment(conn: &Connection, comment_id: i64) -> Result<bool> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let changed = conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
        Ok(changed > 0)
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
                name: "alice".to_string(),
                email: "alice@example.com".to_string(),
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
    async fn comment_lifecycle() {
        let conn = open_database(":memory:").await.unwrap();
        let (user, post) = seed(&conn).await;

        let id = create_comment(
            &conn,
            NewComment {
                body: "first!".to_string(),
                owner_id: user,
                post_id: post,
            },
        )
        .await
        .unwrap();

        let comment = get_comment(&conn, id).await.unwrap().unwrap();
        assert_eq!(comment.body, "first!");
        assert_eq!(comment.post_id, post);

        assert!(delete_comment(&conn, id).await.unwrap());
        assert!(get_comment(&conn, id).await.unwrap().is_none());
        // Second delete is a no-op.
        assert!(!delete_comment(&conn, id).await.unwrap());
    }

    #[tokio::test]
    async fn listing_is_oldest_first_and_scoped() {
        let conn = open_database(":memory:").await.unwrap();
        let (user, post) = seed(&conn).await;

        for i in 0..3 {
            create_comment(
                &conn,
                NewComment {
                    body: format!("c{i}"),
                    owner_id: user,
                    post_id: post,
                },
            )
            .await
            .unwrap();
        }

        let page = list_post_comments(&conn, post, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].body, "c0");

        assert!(
            list_post_comments(&conn, post + 1, 10, 0)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
