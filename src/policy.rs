//! Ownership policy.
//!
//! Every permission decision in the service is made here, from three inputs: the
//! authenticated identity, the owner field stored on the target resource, and the
//! requested action. Nothing is cached; handlers call `authorize` on every request
//! after loading the current row.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{Course, Instructor, Trace},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Patch,
    Delete,
}

impl Action {
    pub fn is_mutation(self) -> bool {
        matches!(self, Action::Update | Action::Patch | Action::Delete)
    }

    fn verb(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "access",
            Action::Update => "update",
            Action::Patch => "patch",
            Action::Delete => "delete",
        }
    }
}

/// The resource instance a decision is made about. `User` carries only the target
/// id, since a user's owner is the user itself.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Course(&'a Course),
    Instructor(&'a Instructor),
    User(Uuid),
    Trace(&'a Trace),
    /// Creation targets: no stored row exists yet.
    NewCourse,
    NewInstructor,
    NewTrace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts a denial into the `Forbidden` API error.
    pub fn into_result(self) -> ApiResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(ApiError::Forbidden(reason)),
        }
    }
}

/// authorize
///
/// The decision table. Referential checks (instructor or course existence) are not
/// pure and stay with the caller.
pub fn authorize(identity: &AuthUser, resource: Resource<'_>, action: Action) -> Decision {
    match resource {
        // Any authenticated identity may create; it becomes the owner.
        Resource::NewCourse | Resource::NewInstructor | Resource::NewTrace => Decision::Allow,

        Resource::Course(course) => {
            if !action.is_mutation() || identity.id == course.owner_user_id {
                Decision::Allow
            } else {
                Decision::Deny(format!(
                    "Only the owner can {} this course",
                    action.verb()
                ))
            }
        }

        // Instructors carry no owner check: any authenticated identity may change one.
        Resource::Instructor(_) => Decision::Allow,

        Resource::User(target) => {
            if identity.id == target {
                Decision::Allow
            } else {
                Decision::Deny(format!(
                    "You can only {} your own user data",
                    action.verb()
                ))
            }
        }

        // Likewise any authenticated identity may read or delete any trace.
        Resource::Trace(_) => Decision::Allow,
    }
}

/// Shorthand used by handlers: decide and convert a denial into `Forbidden`.
pub fn ensure(identity: &AuthUser, resource: Resource<'_>, action: Action) -> ApiResult<()> {
    let decision = authorize(identity, resource, action);
    if let Decision::Deny(reason) = &decision {
        tracing::info!(user_id = %identity.id, ?action, reason = %reason, "authorization denied");
    }
    decision.into_result()
}
