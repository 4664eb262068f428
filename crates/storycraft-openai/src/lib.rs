//! Client for the OpenAI video generation API.
//!
//! The backend depends on exactly three provider operations: submit a
//! prompt, query the status of a submitted video, and download the
//! finished bytes. Everything else (status vocabulary folding included)
//! lives in [`types`].

pub mod client;
pub mod error;
pub mod types;

pub use client::{OpenAiClient, OpenAiConfig};
pub use error::{OpenAiError, OpenAiResult};
pub use types::{CreatedVideo, RemoteStatus, VideoStatus};
