//! Construct-tree synthesis of CI workflow definitions.
//!
//! Build an [`domain::App`], add stacks, workflows and jobs to it, then
//! synthesize the tree into workflow documents.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
