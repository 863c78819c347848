/// Router Module Index
///
/// Splits the API by guard: routes any client may call, and routes that require a
/// verified bearer token. Role and ownership checks run inside the authenticated
/// handlers through the extractors in `policy`.

/// Routes accessible to all clients (anonymous, read-only, plus signup/login).
pub mod public;

/// Routes behind the access-control middleware.
pub mod authenticated;
