//! Command implementations for the CLI.

/// The encode run: configuration, collaborators and the batch.
pub mod encode;
