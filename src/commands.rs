//! Shell commands that need more than a single call into a client.
//!
//! Each submodule adds `cmd_*` methods to [`App`](crate::App).

mod branches;
mod remote;
mod shell;
mod staging;

use anyhow::Result;
use clap::Parser;

pub use shell::system_shell_args;

use crate::clients::executor::tokenize;

/// Parse a command's argument string with clap.
///
/// Usage errors and `--help` are written to `stdout` and yield `None`.
fn parse_args<T: Parser>(args: &str, stdout: &mut impl std::io::Write) -> Result<Option<T>> {
    match T::try_parse_from(tokenize(args)?) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            write!(stdout, "{}", err.render())?;
            Ok(None)
        }
    }
}
