//! tally-passkey-axum - HTTP surface for the Tally passkey ceremonies
//!
//! Mount [`router()`] under your passkey path prefix:
//!
//! ```no_run
//! use axum::Router;
//!
//! let app: Router = Router::new().nest("/passkey", tally_passkey_axum::router());
//! ```
//!
//! Ceremony binding is cookie-based: the start handlers set the
//! `webauthn_session` cookie, the finish handlers consume it. Protected
//! routes authenticate through the [`AuthUser`] extractor and the
//! general `session_id` cookie.

mod cookies;
mod error;
mod passkey;
mod session;

pub use passkey::router;
pub use session::AuthUser;

// Store initialization belongs to the binary; re-exported so consumers
// need only this crate.
pub use tally_passkey::init;
