//! Clients for the external programs that `gitbetter` wraps.
//!
//! - [`executor`]: Spawning child processes, output modes and argument tokenizing
//! - [`git`]: One method per git subcommand plus convenience operations built on them
//! - [`github`]: Repository management via the GitHub CLI
//!
//! Both clients go through the [`executor::Executor`] trait so that tests can
//! swap in a mock instead of spawning real processes.

pub mod executor;
pub mod git;
pub mod github;
