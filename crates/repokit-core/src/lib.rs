pub mod branch_diff;
pub mod config;
pub mod error;
pub mod git;
pub mod io;
pub mod marketplace;
pub mod parse;
pub mod paths;
pub mod source;
pub mod status_report;
pub mod stripe;
pub mod webhook;
pub mod worktree;
pub mod xcode;

pub use error::{RepokitError, Result};
