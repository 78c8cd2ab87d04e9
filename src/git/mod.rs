//! Git command wrappers and mirror workspace management.
//!
//! All operations shell out to the `git` binary using `tokio::process::Command`
//! for non-blocking execution. Destination credentials travel only inside the
//! remote URL; anything git echoes back is redacted before it reaches an error
//! message or a log line.

pub mod commands;
pub mod workspace;
