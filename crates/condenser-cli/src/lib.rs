//! `condenser` command-line front end.

pub mod args;
pub mod output;
pub mod runner;

pub use args::Args;
pub use runner::{process_file, run, SessionJob};
