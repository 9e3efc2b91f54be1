/// Router Module Index
///
/// Routes are split by who may reach them. The split is enforced with router
/// layers, so an endpoint registered in the wrong module is visibly wrong.
/// Every router here is mounted under `/api/v1`.

/// Read endpoints and the signup/token flow. No credentials required.
pub mod public;

/// Mutating catalog and content endpoints plus `/users/me`.
/// Wrapped in the authentication middleware; handlers apply the role gates.
pub mod authenticated;

/// User management, admin role or staff flag only.
pub mod admin;
