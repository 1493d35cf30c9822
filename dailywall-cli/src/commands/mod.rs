//! Subcommand implementations.

pub mod compare;
pub mod fingerprint;
pub mod scan;
pub mod select;
pub mod simulate;
