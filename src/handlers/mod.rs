//! HTTP handlers, one module per resource.
//!
//! Every handler follows the same order: authenticate (via the `AuthUser` extractor),
//! load the current row, ask the ownership policy, then mutate. Failures are returned
//! as `ApiError` and rendered by its `IntoResponse` impl.

pub mod courses;
pub mod instructors;
pub mod traces;
pub mod users;

use crate::error::{ApiError, ApiResult};

/// Rejects blank required text fields with a 400.
pub(crate) fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}
