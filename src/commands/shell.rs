use anyhow::Context;
use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::app::COMMANDS;
use crate::app::Outcome;
use crate::clients::executor::Executor;
use crate::clients::executor::OutputMode;
use crate::clients::executor::tokenize;

/// Arguments that make the system shell run `line`.
pub fn system_shell_args(line: &str) -> Vec<String> {
    let flag = if cfg!(windows) { "/C" } else { "-c" };
    vec![flag.to_string(), line.to_string()]
}

impl<E: Executor> App<E> {
    pub fn unrecognized_command_behavior(&self) -> String {
        let behavior = if self.execute_unrecognized {
            "Execute in system shell"
        } else {
            "Print unknown syntax error"
        };
        format!("Unrecognized command behavior: {}", behavior)
    }

    pub fn cmd_help(&self, topic: &str, stdout: &mut impl std::io::Write) -> Result<Outcome> {
        if topic.is_empty() {
            writeln!(stdout, "Documented commands (type help <topic>):")?;
            let width = COMMANDS.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, about) in COMMANDS {
                writeln!(stdout, "  {} {}", format!("{:<width$}", name).cyan(), about)?;
            }
            writeln!(stdout)?;
            writeln!(stdout, "{}", self.unrecognized_command_behavior())?;
            if self.execute_unrecognized {
                writeln!(
                    stdout,
                    "^Essentially makes this shell function as a super-shell of whatever shell you launched gitbetter from.^"
                )?;
            }
        } else if let Some((_, about)) = COMMANDS.iter().find(|(name, _)| *name == topic) {
            writeln!(stdout, "{}", about)?;
        } else {
            writeln!(stdout, "*** No help on {}", topic)?;
        }
        writeln!(stdout)?;

        Ok(Outcome::Done)
    }

    pub fn cmd_toggle_unrecognized(&mut self, stdout: &mut impl std::io::Write) -> Result<Outcome> {
        self.execute_unrecognized = !self.execute_unrecognized;
        writeln!(stdout, "{}", self.unrecognized_command_behavior())?;
        Ok(Outcome::Done)
    }

    /// Change the process's working directory. Clients created by
    /// [`App::new`] follow it.
    pub fn cmd_cd(&self, path: &str) -> Result<Outcome> {
        let path = tokenize(path)?.join(" ");
        std::env::set_current_dir(&path)
            .with_context(|| format!("Cannot change directory to {:?}", path))?;
        Ok(Outcome::Done)
    }

    pub async fn cmd_sys(&self, line: &str) -> Result<Outcome> {
        let result = self
            .system_shell
            .run(OutputMode::Passthrough, system_shell_args(line))
            .await?;
        Ok(Outcome::Ran(result))
    }

    /// Run `line` in the system shell, or reject it when that's switched off.
    pub async fn cmd_unrecognized(
        &self,
        line: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<Outcome> {
        if self.execute_unrecognized {
            return self.cmd_sys(line).await;
        }
        writeln!(stdout, "{} {}", "*** Unknown syntax:".yellow(), line)?;
        Ok(Outcome::Done)
    }
}
