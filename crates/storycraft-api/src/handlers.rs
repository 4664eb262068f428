//! Request handlers.

pub mod auth;
pub mod credits;
pub mod health;
pub mod videos;

pub use auth::*;
pub use credits::*;
pub use health::*;
pub use videos::*;
