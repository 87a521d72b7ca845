//! # Tenancy Server
//!
//! HTTP surface over [`tenancy_org::OrganizationService`].
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/health` | store reachability (public) |
//! | GET | `/auth/me` | current user or `null` (public) |
//! | POST | `/auth/logout` | end the session (public) |
//! | POST, GET | `/organizations` | create, list own |
//! | PUT | `/organizations/active` | set the session's active organization |
//! | GET | `/organizations/by-slug/{slug}` | read by slug |
//! | GET, PUT, DELETE | `/organizations/{org_id}` | read, rename, delete |
//! | POST | `/organizations/{org_id}/leave` | leave |
//! | POST | `/organizations/{org_id}/transfer` | transfer ownership |
//! | GET | `/organizations/{org_id}/members` | roster |
//! | PUT, DELETE | `/organizations/{org_id}/members/{user_id}` | change role, remove |
//! | POST, GET | `/organizations/{org_id}/invitations` | invite, list |
//! | DELETE | `/organizations/{org_id}/invitations/{invite_id}` | cancel |
//! | GET | `/invitations` | pending invitations for the caller |
//! | POST | `/invitations/{token}/accept` | accept |
//! | POST | `/invitations/{token}/decline` | decline |
//!
//! Every other route requires a session (cookie or `Bearer` token).

pub mod auth;
pub mod config;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::build_router;
pub use state::{build_state, AppState};
