//! Ownership-based access control.
//!
//! Pure, side-effect-free policy checks: callers fetch a resource snapshot,
//! the guard answers yes/no.  No IO, no shared mutable state — safe to run
//! concurrently on every request without locking.

use tracing::warn;

/// What the principal is trying to do to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
}

/// Ownership snapshot of one resource, taken before a mutation.
///
/// `parent_owner_id` is set for dependent resources (a comment's parent is
/// its post); `None` for top-level resources and principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipView {
    pub owner_id: i64,
    pub parent_owner_id: Option<i64>,
}

impl OwnershipView {
    pub fn owned_by(owner_id: i64) -> Self {
        Self {
            owner_id,
            parent_owner_id: None,
        }
    }

    pub fn dependent(owner_id: i64, parent_owner_id: i64) -> Self {
        Self {
            owner_id,
            parent_owner_id: Some(parent_owner_id),
        }
    }
}

/// Decide whether `principal_id` may perform `action` on `resource`.
///
/// Rules (the ownership model is the only policy in scope):
///   - reads of public resources are unrestricted;
///   - update/delete require `resource.owner_id == principal_id`;
///   - deleting a *dependent* resource is additionally allowed to the owner
///     of its parent (a post owner may delete any comment on their post).
///
/// `resource` is `None` when the resource does not exist.  A missing
/// resource is denied exactly like a wrong owner, so a caller probing for
/// existence learns nothing from the answer.  Callers must keep that
/// property when mapping the denial to a response: one flat
/// `NOT_AUTHORIZED`, whatever the underlying cause.
pub fn can(principal_id: i64, action: Action, resource: Option<&OwnershipView>) -> bool {
    let Some(resource) = resource else {
        // Reads don't consult the guard for existence; everything else is a
        // flat denial indistinguishable from wrong ownership.
        return matches!(action, Action::Read);
    };

    match action {
        Action::Read => true,
        Action::Update => resource.owner_id == principal_id,
        Action::Delete => {
            resource.owner_id == principal_id
                || resource.parent_owner_id == Some(principal_id)
        }
    }
}

/// Gate for the administrative user-listing endpoint.
///
/// A deliberately minimal placeholder: equality against a shared secret
/// presented out-of-band (query parameter), not a token claim.  Isolated
/// here so a real role system can replace it without touching call sites.
/// When no secret is configured the endpoint denies everything.
pub fn admin_listing_allowed(presented: Option<&str>, configured: Option<&str>) -> bool {
    match (presented, configured) {
        (Some(p), Some(c)) if !c.is_empty() && p == c => true,
        (_, None) => {
            warn!("Admin listing requested but no admin secret is configured");
            false
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    const CAROL: i64 = 3;

    #[test]
    fn anyone_reads_public_resources() {
        let post = OwnershipView::owned_by(ALICE);
        assert!(can(ALICE, Action::Read, Some(&post)));
        assert!(can(BOB, Action::Read, Some(&post)));
    }

    #[test]
    fn only_owner_updates() {
        let post = OwnershipView::owned_by(ALICE);
        assert!(can(ALICE, Action::Update, Some(&post)));
        assert!(!can(BOB, Action::Update, Some(&post)));
    }

    #[test]
    fn only_owner_deletes_top_level() {
        let post = OwnershipView::owned_by(ALICE);
        assert!(can(ALICE, Action::Delete, Some(&post)));
        assert!(!can(BOB, Action::Delete, Some(&post)));
    }

    #[test]
    fn comment_deletable_by_author_or_post_owner() {
        // Comment authored by BOB on CAROL's post.
        let comment = OwnershipView::dependent(BOB, CAROL);

        assert!(can(BOB, Action::Delete, Some(&comment)));
        assert!(can(CAROL, Action::Delete, Some(&comment)));
        assert!(!can(ALICE, Action::Delete, Some(&comment)));
    }

    #[test]
    fn parent_ownership_grants_delete_only() {
        // Post owner may remove a comment but not edit it.
        let comment = OwnershipView::dependent(BOB, CAROL);
        assert!(!can(CAROL, Action::Update, Some(&comment)));
    }

    #[test]
    fn missing_resource_denied_like_wrong_owner() {
        assert!(!can(ALICE, Action::Update, None));
        assert!(!can(ALICE, Action::Delete, None));
        // Same answer as a wrong-owner denial — no existence leak.
        let post = OwnershipView::owned_by(BOB);
        assert_eq!(
            can(ALICE, Action::Delete, None),
            can(ALICE, Action::Delete, Some(&post))
        );
    }

    #[test]
    fn admin_secret_must_match() {
        assert!(admin_listing_allowed(Some("hunter2"), Some("hunter2")));
        assert!(!admin_listing_allowed(Some("wrong"), Some("hunter2")));
        assert!(!admin_listing_allowed(None, Some("hunter2")));
    }

    #[test]
    fn unconfigured_admin_secret_denies_everything() {
        assert!(!admin_listing_allowed(Some("anything"), None));
        assert!(!admin_listing_allowed(Some(""), Some("")));
        assert!(!admin_listing_allowed(None, None));
    }
}
