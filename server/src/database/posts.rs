use tokio_rusqlite::{Connection, OptionalExtension, Result, params, rusqlite};

use crate::database::utils::get_timestamp;

#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub owner_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A post plus its dependent-row counts, the shape list/detail endpoints
/// return.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub post: PostRecord,
    pub comment_count: i64,
    pub reaction_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub owner_id: i64,
}

fn post_from_row(row: &rusqlite::Row) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Insert a new post and return its id.
pub async fn create_post(conn: &Connection, new_post: NewPost) -> Result<i64> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        conn.execute(
            "INSERT INTO posts (title, body, owner_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![new_post.title, new_post.body, new_post.owner_id, now],
        )?;

        Ok(conn.last_insert_rowid())
    })
    .await
}

pub async fn get_post(conn: &Connection, post_id: i64) -> Result<Option<PostRecord>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT id, title, body, owner_id, created_at, updated_at
             FROM   posts WHERE id = ?1",
        )?;

        let post = stmt
            .query_row(params![post_id], post_from_row)
            .optional()?;

        Ok(post)
    })
    .await
}

/// Single post with dependent counts, for the detail endpoint.
pub async fn get_post_with_counts(
    conn: &Connection,
    post_id: i64,
) -> Result<Option<PostSummary>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, p.body, p.owner_id, p.created_at, p.updated_at,
                    (SELECT COUNT(*) FROM comments  WHERE comments.post_id  = p.id),
                    (SELECT COUNT(*) FROM reactions WHERE reactions.post_id = p.id)
             FROM   posts p WHERE p.id = ?1",
        )?;

        let summary = stmt
            .query_row(params![post_id], |row| {
                Ok(PostSummary {
                    post: post_from_row(row)?,
                    comment_count: row.get(6)?,
                    reaction_count: row.get(7)?,
                })
            })
            .optional()?;

        Ok(summary)
    })
    .await
}

/// Ownership snapshot: just the owner column, for the guard.
pub async fn post_owner(conn: &Connection, post_id: i64) -> Result<Option<i64>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare("SELECT owner_id FROM posts WHERE id = ?1")?;
        let owner = stmt
            .query_row(params![post_id], |row| row.get(0))
            .optional()?;
        Ok(owner)
    })
    .await
}

/// Page through posts, newest first, each with its dependent counts.
///
/// Counts come from correlated subqueries — one statement, no N+1.
pub async fn list_posts(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<PostSummary>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, p.body, p.owner_id, p.created_at, p.updated_at,
                    (SELECT COUNT(*) FROM comments  WHERE comments.post_id  = p.id),
                    (SELECT COUNT(*) FROM reactions WHERE reactions.post_id = p.id)
             FROM   posts p
             ORDER  BY p.id DESC
             LIMIT  ?1 OFFSET ?2",
        )?;

        let posts = stmt
            .query_map(params![limit, offset], |row| {
                Ok(PostSummary {
                    post: post_from_row(row)?,
                    comment_count: row.get(6)?,
                    reaction_count: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<PostSummary>, rusqlite::Error>>()?;

        Ok(posts)
    })
    .await
}

pub async fn count_posts(conn: &Connection) -> Result<i64> {
    conn.call(|conn: &mut rusqlite::Connection| {
        let count = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count)
    })
    .await
}

/// Update title and body.  Returns false when the post is gone.
pub async fn update_post(
    conn: &Connection,
    post_id: i64,
    title: String,
    body: String,
) -> Result<bool> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        let changed = conn.execute(
            "UPDATE posts SET title = ?1, body = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, body, now, post_id],
        )?;
        Ok(changed > 0)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create::open_database;
    use crate::database::{comments, reactions, users};

    async fn seed_user(conn: &Connection, email: &str) -> i64 {
        users::create_user(
            conn,
            users::NewUser {
                name: "user".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$fake".to_string(),
            },
        )
        .await
        .unwrap()
    }

    async fn seed_post(conn: &Connection, owner_id: i64, title: &str) -> i64 {
        create_post(
            conn,
            NewPost {
                title: title.to_string(),
                body: "body".to_string(),
                owner_id,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_get_update_post() {
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice@example.com").await;
        let id = seed_post(&conn, alice, "hello").await;

        let post = get_post(&conn, id).await.unwrap().unwrap();
        assert_eq!(post.title, "hello");
        assert_eq!(post.owner_id, alice);

        assert!(
            update_post(&conn, id, "hi".to_string(), "edited".to_string())
                .await
                .unwrap()
        );
        let post = get_post(&conn, id).await.unwrap().unwrap();
        assert_eq!(post.title, "hi");
        assert_eq!(post.body, "edited");

        assert!(
            !update_post(&conn, id + 99, "x".to_string(), "y".to_string())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn owner_snapshot() {
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice@example.com").await;
        let id = seed_post(&conn, alice, "hello").await;

        assert_eq!(post_owner(&conn, id).await.unwrap(), Some(alice));
        assert_eq!(post_owner(&conn, id + 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn listing_carries_dependent_counts() {
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice@example.com").await;
        let bob = seed_user(&conn, "bob@example.com").await;

        let p1 = seed_post(&conn, alice, "first").await;
        let _p2 = seed_post(&conn, alice, "second").await;

        comments::create_comment(
            &conn,
            comments::NewComment {
                body: "nice".to_string(),
                owner_id: bob,
                post_id: p1,
            },
        )
        .await
        .unwrap();
        reactions::toggle_reaction(&conn, bob, p1).await.unwrap();

        let list = list_posts(&conn, 10, 0).await.unwrap();
        assert_eq!(list.len(), 2);
        // Newest first.
        assert_eq!(list[0].post.title, "second");
        assert_eq!(list[0].comment_count, 0);

        assert_eq!(list[1].post.id, p1);
        assert_eq!(list[1].comment_count, 1);
        assert_eq!(list[1].reaction_count, 1);

        let detail = get_post_with_counts(&conn, p1).await.unwrap().unwrap();
        assert_eq!(detail.comment_count, 1);
        assert_eq!(detail.reaction_count, 1);
    }
}
