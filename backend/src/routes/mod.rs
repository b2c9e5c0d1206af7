//! Router modules, split by access level.
//!
//! `public` needs no principal. `authenticated` and `admin` are mounted behind the
//! auth middleware in `create_router`; role checks beyond authentication are made by
//! the policy inside the core service, never by the router.

/// Health check and registration.
pub mod public;

/// Course and profile routes for any authenticated principal.
pub mod authenticated;

/// Nested under `/admin`. SUPERADMIN only.
pub mod admin;
