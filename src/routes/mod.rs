/// Router Module Index
///
/// Routes are split by access level. The split is enforced with a router layer, so a
/// protected endpoint cannot be exposed by forgetting a check in its handler.

/// Routes reachable without credentials: registration, health and read-only lookups.
pub mod public;

/// Routes wrapped in the Basic-auth middleware. Handlers receive a resolved `AuthUser`.
pub mod authenticated;
