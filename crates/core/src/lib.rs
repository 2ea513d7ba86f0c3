//! Domain rules for the gatekeep authentication authority.
//!
//! Everything in this crate is pure: no database, no network, no global
//! clock. Time-dependent rules take `now` explicitly so the lifecycle of
//! login tokens and sessions can be exercised deterministically.

pub mod clock;
pub mod crypto;
pub mod device;
pub mod error;
pub mod ids;
pub mod login_token;
pub mod session;
pub mod types;
pub mod validation;
