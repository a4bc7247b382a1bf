//! Multi-entity deletions.
//!
//! Deleting a post (or a whole user) touches several tables.  Each cascade
//! is an explicit ordered list of [`CascadeStep`]s — children always before
//! parents — executed inside one transaction.  Either every step commits or
//! none does; concurrent readers never observe a half-deleted tree.
//!
//! The connection runs closures one at a time, so two cascades can never
//! interleave; when both target the same resource, exactly one succeeds and
//! the other sees [`CascadeError::NotFound`].

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_rusqlite::{Connection, params, rusqlite};
use tracing::{debug, info, warn};

/// Upper bound on a single cascade.  When the deadline passes mid-cascade
/// the open transaction is interrupted and rolled back in full — nothing
/// partial ever persists — and the caller gets a retryable error.
pub const CASCADE_DEADLINE: Duration = Duration::from_secs(5);

/// Progress-handler polling interval, in SQLite VM instructions.
const DEADLINE_CHECK_OPS: i32 = 1000;

#[derive(Debug, Error)]
pub enum CascadeError {
    /// The root entity does not exist (already deleted, or never did).
    #[error("resource not found")]
    NotFound,

    /// A step failed; the whole cascade was rolled back.  Retryable.
    #[error("transaction failed: {0}")]
    Transaction(tokio_rusqlite::Error),

    /// The deadline passed; the whole cascade was rolled back.  Retryable.
    #[error("cascade deadline exceeded; transaction rolled back")]
    DeadlineExceeded,
}

/// One child-table deletion inside a cascade.  `sql` takes the scope id
/// (post id or user id) as `?1`.
struct CascadeStep {
    entity: &'static str,
    sql: &'static str,
}

/// Deleting a post: dependents first, the post row itself last.
const POST_CASCADE: &[CascadeStep] = &[
    CascadeStep {
        entity: "comments",
        sql: "DELETE FROM comments WHERE post_id = ?1",
    },
    CascadeStep {
        entity: "reactions",
        sql: "DELETE FROM reactions WHERE post_id = ?1",
    },
    CascadeStep {
        entity: "posts",
        sql: "DELETE FROM posts WHERE id = ?1",
    },
];

/// Deleting a user, phase one: rows the user authored under other people's
/// posts.  Phase two replays [`POST_CASCADE`] for each post the user owns,
/// then removes the user row.
const USER_AUTHORED_CASCADE: &[CascadeStep] = &[
    CascadeStep {
        entity: "comments",
        sql: "DELETE FROM comments WHERE owner_id = ?1",
    },
    CascadeStep {
        entity: "reactions",
        sql: "DELETE FROM reactions WHERE owner_id = ?1",
    },
];

/// Delete a post together with its comments and reactions.
pub async fn delete_post(conn: &Connection, post_id: i64) -> Result<(), CascadeError> {
    let deleted = conn
        .call(move |conn: &mut rusqlite::Connection| {
            let deleted = with_deadline(conn, |conn| {
                let tx = conn.transaction()?;

                if !row_exists(&tx, "SELECT 1 FROM posts WHERE id = ?1", post_id)? {
                    return Ok(false);
                }

                run_steps(&tx, POST_CASCADE, post_id)?;
                tx.commit()?;
                Ok(true)
            })?;
            Ok(deleted)
        })
        .await
        .map_err(map_cascade_err)?;

    if deleted {
        info!("Post {} deleted with dependents", post_id);
        Ok(())
    } else {
        Err(CascadeError::NotFound)
    }
}

/// Delete a user together with everything they own:
/// their comments and reactions anywhere, every post they own (each with its
/// own dependents), and finally the user row.
pub async fn delete_user(conn: &Connection, user_id: i64) -> Result<(), CascadeError> {
    let deleted = conn
        .call(move |conn: &mut rusqlite::Connection| {
            let deleted = with_deadline(conn, |conn| {
                let tx = conn.transaction()?;

                if !row_exists(&tx, "SELECT 1 FROM users WHERE id = ?1", user_id)? {
                    return Ok(false);
                }

                run_steps(&tx, USER_AUTHORED_CASCADE, user_id)?;

                let post_ids: Vec<i64> = {
                    let mut stmt = tx.prepare("SELECT id FROM posts WHERE owner_id = ?1")?;
                    let ids = stmt
                        .query_map(params![user_id], |row| row.get(0))?
                        .collect::<std::result::Result<Vec<i64>, rusqlite::Error>>()?;
                    ids
                };

                for post_id in post_ids {
                    run_steps(&tx, POST_CASCADE, post_id)?;
                }

                tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
                tx.commit()?;
                Ok(true)
            })?;
            Ok(deleted)
        })
        .await
        .map_err(map_cascade_err)?;

    if deleted {
        info!("User {} deleted with owned content", user_id);
        Ok(())
    } else {
        Err(CascadeError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn run_steps(
    tx: &rusqlite::Transaction<'_>,
    steps: &[CascadeStep],
    scope_id: i64,
) -> rusqlite::Result<()> {
    for step in steps {
        let removed = tx.execute(step.sql, params![scope_id])?;
        debug!("Cascade removed {} row(s) from {}", removed, step.entity);
    }
    Ok(())
}

fn row_exists(
    tx: &rusqlite::Transaction<'_>,
    sql: &str,
    id: i64,
) -> rusqlite::Result<bool> {
    use tokio_rusqlite::OptionalExtension;
    Ok(tx.query_row(sql, params![id], |_| Ok(())).optional()?.is_some())
}

/// Run `f` with a statement-level deadline.
///
/// SQLite's progress handler interrupts the running statement once the
/// deadline passes; the resulting error unwinds out of `f`, dropping the
/// uncommitted transaction, which rolls it back.
fn with_deadline<T>(
    conn: &mut rusqlite::Connection,
    f: impl FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
    let deadline = Instant::now() + CASCADE_DEADLINE;
    conn.progress_handler(DEADLINE_CHECK_OPS, Some(move || Instant::now() >= deadline));

    let result = f(conn);

    conn.progress_handler(0, None::<fn() -> bool>);
    result
}

fn map_cascade_err(err: tokio_rusqlite::Error) -> CascadeError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(e, _)) = &err {
        if e.code == rusqlite::ErrorCode::OperationInterrupted {
            warn!("Cascade interrupted at deadline; rolled back");
            return CascadeError::DeadlineExceeded;
        }
    }
    CascadeError::Transaction(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create::open_database;
    use crate::database::{comments, posts, reactions, users};

    async fn seed_user(conn: &Connection, name: &str, email: &str) -> i64 {
        users::create_user(
            conn,
            users::NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$fake".to_string(),
            },
        )
        .await
        .unwrap()
    }

    async fn seed_post(conn: &Connection, owner_id: i64) -> i64 {
        posts::create_post(
            conn,
            posts::NewPost {
                title: "post".to_string(),
                body: "body".to_string(),
                owner_id,
            },
        )
        .await
        .unwrap()
    }

    async fn seed_comment(conn: &Connection, owner_id: i64, post_id: i64) -> i64 {
        comments::create_comment(
            conn,
            comments::NewComment {
                body: "comment".to_string(),
                owner_id,
                post_id,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn post_cascade_removes_dependents_and_nothing_else() {
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice", "alice@example.com").await;
        let bob = seed_user(&conn, "bob", "bob@example.com").await;

        let doomed = seed_post(&conn, alice).await;
        let survivor = seed_post(&conn, alice).await;

        let doomed_comment = seed_comment(&conn, bob, doomed).await;
        let survivor_comment = seed_comment(&conn, bob, survivor).await;
        reactions::toggle_reaction(&conn, bob, doomed).await.unwrap();
        reactions::toggle_reaction(&conn, bob, survivor).await.unwrap();

        delete_post(&conn, doomed).await.unwrap();

        assert!(posts::get_post(&conn, doomed).await.unwrap().is_none());
        assert!(
            comments::get_comment(&conn, doomed_comment)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!reactions::has_reaction(&conn, bob, doomed).await.unwrap());

        // The sibling post and its dependents are untouched.
        assert!(posts::get_post(&conn, survivor).await.unwrap().is_some());
        assert!(
            comments::get_comment(&conn, survivor_comment)
                .await
                .unwrap()
                .is_some()
        );
        assert!(reactions::has_reaction(&conn, bob, survivor).await.unwrap());
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let conn = open_database(":memory:").await.unwrap();
        assert!(matches!(
            delete_post(&conn, 12345).await,
            Err(CascadeError::NotFound)
        ));
    }

    #[tokio::test]
    async fn concurrent_double_delete_resolves_to_one_winner() {
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice", "alice@example.com").await;
        let post = seed_post(&conn, alice).await;
        seed_comment(&conn, alice, post).await;

        let (a, b) = tokio::join!(delete_post(&conn, post), delete_post(&conn, post));

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let not_founds = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(CascadeError::NotFound)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(not_founds, 1);

        // Either way the post and its dependents are gone.
        assert!(posts::get_post(&conn, post).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_cascade_scenario() {
        // alice owns P1 with two comments and one reaction from bob.
        // Deleting alice removes P1 and every dependent; bob survives.
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice", "alice@example.com").await;
        let bob = seed_user(&conn, "bob", "bob@example.com").await;

        let p1 = seed_post(&conn, alice).await;
        let c1 = seed_comment(&conn, bob, p1).await;
        let c2 = seed_comment(&conn, bob, p1).await;
        reactions::toggle_reaction(&conn, bob, p1).await.unwrap();

        delete_user(&conn, alice).await.unwrap();

        assert!(users::get_user_by_id(&conn, alice).await.unwrap().is_none());
        assert!(posts::get_post(&conn, p1).await.unwrap().is_none());
        assert!(comments::get_comment(&conn, c1).await.unwrap().is_none());
        assert!(comments::get_comment(&conn, c2).await.unwrap().is_none());
        assert!(!reactions::has_reaction(&conn, bob, p1).await.unwrap());

        // bob's principal record is untouched.
        assert!(users::get_user_by_id(&conn, bob).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn user_cascade_keeps_content_the_user_only_commented_on() {
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice", "alice@example.com").await;
        let bob = seed_user(&conn, "bob", "bob@example.com").await;

        let bobs_post = seed_post(&conn, bob).await;
        let alices_comment = seed_comment(&conn, alice, bobs_post).await;
        let bobs_comment = seed_comment(&conn, bob, bobs_post).await;
        reactions::toggle_reaction(&conn, alice, bobs_post).await.unwrap();

        delete_user(&conn, alice).await.unwrap();

        // bob's post stays; alice's traces on it are gone.
        assert!(posts::get_post(&conn, bobs_post).await.unwrap().is_some());
        assert!(
            comments::get_comment(&conn, alices_comment)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            comments::get_comment(&conn, bobs_comment)
                .await
                .unwrap()
                .is_some()
        );
        assert!(!reactions::has_reaction(&conn, alice, bobs_post).await.unwrap());
    }

    #[tokio::test]
    async fn failed_step_rolls_back_everything() {
        let conn = open_database(":memory:").await.unwrap();
        let alice = seed_user(&conn, "alice", "alice@example.com").await;
        let post = seed_post(&conn, alice).await;
        let comment = seed_comment(&conn, alice, post).await;

        // Sabotage the middle step: with the reactions table gone the
        // cascade fails after comments were deleted inside the transaction.
        conn.call(|conn: &mut rusqlite::Connection| {
            conn.execute_batch("DROP TABLE reactions")?;
            Ok::<_, tokio_rusqlite::Error>(())
        })
        .await
        .unwrap();

        let result = delete_post(&conn, post).await;
        assert!(matches!(result, Err(CascadeError::Transaction(_))));

        // Nothing partial persisted: the comment deleted by step one is back.
        assert!(posts::get_post(&conn, post).await.unwrap().is_some());
        assert!(comments::get_comment(&conn, comment).await.unwrap().is_some());
    }
}
