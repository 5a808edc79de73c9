//! Core types for Archiva

mod access;
mod user;

pub use access::*;
pub use user::*;
