//! Role-based authorization.
//!
//! A `Policy` is one rule; a `Gate` ORs several of them. Handlers ask a gate
//! twice: once before touching storage (collection level, no resource) and
//! once after the target row has been loaded (object level). Evaluation is a
//! pure function of the principal, the HTTP method and the resource.

use axum::http::Method;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, AppResult},
    models::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Safe methods only.
    ReadOnly,
    /// Admin role or staff flag.
    IsAdmin,
    /// Moderator role, regardless of ownership.
    IsModerator,
    /// Any authenticated user; object access only to the resource's author.
    IsAuthor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    fn from_bool(allowed: bool) -> Self {
        if allowed { Decision::Allow } else { Decision::Deny }
    }

    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// The object under an object-level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub author_id: Uuid,
}

impl Resource {
    pub fn authored_by(author_id: Uuid) -> Self {
        Self { author_id }
    }
}

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn is_admin(principal: Option<&AuthUser>) -> bool {
    principal.is_some_and(|user| user.role == Role::Admin || user.is_staff)
}

fn is_moderator(principal: Option<&AuthUser>) -> bool {
    principal.is_some_and(|user| user.role == Role::Moderator)
}

fn collection_grant(policy: Policy, principal: Option<&AuthUser>, method: &Method) -> bool {
    match policy {
        Policy::ReadOnly => is_safe_method(method),
        Policy::IsAdmin => is_admin(principal),
        Policy::IsModerator => is_moderator(principal),
        Policy::IsAuthor => principal.is_some(),
    }
}

fn object_grant(
    policy: Policy,
    principal: Option<&AuthUser>,
    method: &Method,
    resource: &Resource,
) -> bool {
    match policy {
        Policy::ReadOnly => is_safe_method(method),
        Policy::IsAdmin => is_admin(principal),
        Policy::IsModerator => is_moderator(principal),
        Policy::IsAuthor => principal.is_some_and(|user| user.id == resource.author_id),
    }
}

/// evaluate
///
/// Without a resource only the collection-level rule applies. With one, the
/// object-level rule is consulted only if the collection-level rule granted.
pub fn evaluate(
    policy: Policy,
    principal: Option<&AuthUser>,
    method: &Method,
    resource: Option<&Resource>,
) -> Decision {
    if !collection_grant(policy, principal, method) {
        return Decision::Deny;
    }
    match resource {
        None => Decision::Allow,
        Some(resource) => Decision::from_bool(object_grant(policy, principal, method, resource)),
    }
}

/// Gate
///
/// OR-composition of policies guarding one family of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate(pub &'static [Policy]);

/// Titles, categories and genres.
pub const CATALOG_GATE: Gate = Gate(&[Policy::ReadOnly, Policy::IsAdmin]);

/// Reviews and comments.
pub const CONTENT_GATE: Gate = Gate(&[
    Policy::ReadOnly,
    Policy::IsAdmin,
    Policy::IsModerator,
    Policy::IsAuthor,
]);

/// User management.
pub const USERS_GATE: Gate = Gate(&[Policy::IsAdmin]);

impl Gate {
    pub fn evaluate(
        &self,
        principal: Option<&AuthUser>,
        method: &Method,
        resource: Option<&Resource>,
    ) -> Decision {
        let allowed = self
            .0
            .iter()
            .any(|&policy| evaluate(policy, principal, method, resource).is_allowed());
        Decision::from_bool(allowed)
    }

    /// Like `evaluate`, but as an error: anonymous callers get 401, known
    /// callers 403.
    pub fn check(
        &self,
        principal: Option<&AuthUser>,
        method: &Method,
        resource: Option<&Resource>,
    ) -> AppResult<()> {
        match self.evaluate(principal, method, resource) {
            Decision::Allow => Ok(()),
            Decision::Deny if principal.is_none() => Err(ApiError::Unauthorized),
            Decision::Deny => {
                tracing::debug!(method = %method, "authorization denied");
                Err(ApiError::Forbidden)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
            is_staff: false,
        }
    }

    #[test]
    fn read_only_grants_safe_methods_to_anyone() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert_eq!(evaluate(Policy::ReadOnly, None, &method, None), Decision::Allow);
        }
        for method in [Method::POST, Method::PATCH, Method::PUT, Method::DELETE] {
            assert_eq!(evaluate(Policy::ReadOnly, None, &method, None), Decision::Deny);
        }
    }

    #[test]
    fn admin_policy_accepts_role_or_staff_flag() {
        let admin = user(Role::Admin);
        let staff = AuthUser {
            is_staff: true,
            ..user(Role::User)
        };
        let plain = user(Role::User);
        assert!(evaluate(Policy::IsAdmin, Some(&admin), &Method::DELETE, None).is_allowed());
        assert!(evaluate(Policy::IsAdmin, Some(&staff), &Method::DELETE, None).is_allowed());
        assert!(!evaluate(Policy::IsAdmin, Some(&plain), &Method::DELETE, None).is_allowed());
        assert!(!evaluate(Policy::IsAdmin, None, &Method::GET, None).is_allowed());
    }

    #[test]
    fn author_policy_needs_matching_author_at_object_level() {
        let author = user(Role::User);
        let other = user(Role::User);
        let resource = Resource::authored_by(author.id);

        assert!(evaluate(Policy::IsAuthor, Some(&other), &Method::PATCH, None).is_allowed());
        assert!(
            evaluate(Policy::IsAuthor, Some(&author), &Method::PATCH, Some(&resource))
                .is_allowed()
        );
        assert!(
            !evaluate(Policy::IsAuthor, Some(&other), &Method::PATCH, Some(&resource))
                .is_allowed()
        );
        assert!(!evaluate(Policy::IsAuthor, None, &Method::PATCH, Some(&resource)).is_allowed());
    }

    #[test]
    fn catalog_gate_is_admin_only_for_writes() {
        let plain = user(Role::User);
        let moderator = user(Role::Moderator);
        let admin = user(Role::Admin);

        assert!(CATALOG_GATE.evaluate(None, &Method::GET, None).is_allowed());
        assert!(!CATALOG_GATE.evaluate(Some(&plain), &Method::POST, None).is_allowed());
        assert!(!CATALOG_GATE.evaluate(Some(&moderator), &Method::POST, None).is_allowed());
        assert!(CATALOG_GATE.evaluate(Some(&admin), &Method::POST, None).is_allowed());
    }

    #[test]
    fn content_gate_lets_moderator_delete_someone_elses_review() {
        let author = user(Role::User);
        let stranger = user(Role::User);
        let moderator = user(Role::Moderator);
        let review = Resource::authored_by(author.id);

        assert_eq!(
            CONTENT_GATE.evaluate(Some(&stranger), &Method::DELETE, Some(&review)),
            Decision::Deny
        );
        assert_eq!(
            CONTENT_GATE.evaluate(Some(&moderator), &Method::DELETE, Some(&review)),
            Decision::Allow
        );
        assert_eq!(
            CONTENT_GATE.evaluate(Some(&author), &Method::DELETE, Some(&review)),
            Decision::Allow
        );
    }

    #[test]
    fn content_gate_lets_any_authenticated_user_create() {
        let plain = user(Role::User);
        assert!(CONTENT_GATE.evaluate(Some(&plain), &Method::POST, None).is_allowed());
        assert!(!CONTENT_GATE.evaluate(None, &Method::POST, None).is_allowed());
    }

    #[test]
    fn users_gate_denies_reads_to_non_admins() {
        let moderator = user(Role::Moderator);
        assert!(!USERS_GATE.evaluate(Some(&moderator), &Method::GET, None).is_allowed());
        assert!(USERS_GATE.evaluate(Some(&user(Role::Admin)), &Method::GET, None).is_allowed());
    }

    #[test]
    fn check_distinguishes_anonymous_from_forbidden() {
        let plain = user(Role::User);
        assert!(matches!(
            CATALOG_GATE.check(None, &Method::POST, None),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            CATALOG_GATE.check(Some(&plain), &Method::POST, None),
            Err(ApiError::Forbidden)
        ));
        assert!(CATALOG_GATE.check(Some(&plain), &Method::GET, None).is_ok());
    }
}
