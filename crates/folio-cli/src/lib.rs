//! folio CLI library
//!
//! Argument parsing, the local session gate, subcommand handlers and output
//! rendering for the `folio` binary.

pub mod cli;
pub mod commands;
pub mod gate;
pub mod output;
