//! CLI subcommand implementations for the defacewatch binary.

pub mod check;
pub mod doctor;
pub mod serve;
