//! Domain models for the press release portal.
//!
//! These are the core types shared across all crates.

pub mod account;
pub mod endorsement;
pub mod invite_code;
pub mod press_release;
