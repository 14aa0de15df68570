//! frontpush library.
//!
//! Finds content files changed between two commits and sends Webpushr
//! push notifications for the ones that ask for it.

pub mod changeset;
pub mod cli;
pub mod config;
pub mod content;
pub mod dispatch;
pub mod error;
pub mod notify;

pub use error::Error;
