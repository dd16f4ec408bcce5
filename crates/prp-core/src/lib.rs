//! PRP Core — Shared types, traits, and error definitions for the press
//! release portal.

pub mod error;
pub mod identity;
pub mod models;
pub mod repository;
