use std::io::BufRead as _;
use std::io::IsTerminal as _;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;
use tracing::debug;

use crate::clients::executor::CommandResult;
use crate::clients::executor::Executor;
use crate::clients::executor::ProcessExecutor;
use crate::clients::git::Git;
use crate::clients::github::Github;
use crate::clients::github::Visibility;
use crate::config::Config;

/// Shell commands and their help text, in the order `help` lists them.
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "List commands, or show help for one: help [command]. Alias: ?"),
    (
        "toggle_unrecognized_command_behavior",
        "Toggle between running unrecognized lines in the system shell and rejecting them.",
    ),
    ("cd", "Change the working directory."),
    ("sys", "Run the rest of the line in the system shell."),
    ("git", "Run git with the given arguments."),
    ("add", "Stage files; all files when none are given. -r searches subfolders."),
    ("commit", ">>> git commit {args}"),
    ("push", ">>> git push {args}"),
    ("pull", ">>> git pull {args}"),
    ("status", ">>> git status {args}"),
    ("merge", ">>> git merge {args}"),
    ("tag", ">>> git tag {args}"),
    ("new_repo", "Create a new repository with 'main' as its default branch."),
    ("new_branch", "Create a branch and switch to it."),
    (
        "new_gh_remote",
        "Create a GitHub repository from this one and push it. Private unless --public.",
    ),
    ("initcommit", "Stage all files and commit them as 'Initial commit'."),
    ("undo", "Discard unstaged changes."),
    ("commitf", "Stage and commit files: commitf [files...] -m <message> [-r]"),
    ("commitall", "Stage and commit all files with the given message."),
    ("switch", "Switch to a branch."),
    ("add_url", "Add a remote origin url and push the main branch to it."),
    ("push_new", "Push a new branch to origin and track it."),
    ("branches", "List local and remote branches."),
    ("loggy", "Show the history as a compact graph with changed files."),
    ("amend", "Stage files (all when none given) and amend the last commit. -r searches subfolders."),
    ("delete_branch", "Delete a local branch: delete_branch <branch> [-r to also delete it on origin]"),
    ("merge_to", "Merge the current branch into the given branch (default 'main')."),
    ("ignore", "Append the given patterns to .gitignore."),
    ("make_private", "Make the GitHub repository private. Owner defaults to origin's owner."),
    ("make_public", "Make the GitHub repository public. Owner defaults to origin's owner."),
    ("delete_gh_repo", "Delete the GitHub repository. Owner defaults to origin's owner."),
    ("quit", "Leave the shell. Alias: exit"),
];

/// What happened to a dispatched line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An external program ran.
    Ran(CommandResult),
    /// Handled without running an external program.
    Done,
    /// The shell should stop.
    Quit,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Ran(result) => result.exit_code().unwrap_or(0),
            Self::Done | Self::Quit => 0,
        }
    }

    /// Exit status for the process.
    ///
    /// Only the low byte of an exit status survives, so a summed code such as
    /// 256 or a negative signal code would read as success. Those map to 1.
    pub fn process_status(&self) -> i32 {
        match self.exit_code() {
            code if code != 0 && code & 0xff == 0 => 1,
            code => code,
        }
    }
}

pub struct App<E = ProcessExecutor> {
    pub config: Config,
    pub git: Git<E>,
    pub gh: Github<E>,
    pub(crate) system_shell: E,
    pub(crate) execute_unrecognized: bool,
}

impl App {
    /// App working in (and following) the process's current directory.
    pub fn new(config: Config) -> Self {
        let dir = PathBuf::from(".");
        let git = Git::new(&config.git_program, dir.clone());
        let gh = Github::new(&config.gh_program, dir.clone());
        let system_shell = ProcessExecutor::new(config.shell_program.clone(), dir);
        Self::with_clients(config, git, gh, system_shell)
    }
}

impl<E: Executor> App<E> {
    pub fn with_clients(config: Config, git: Git<E>, gh: Github<E>, system_shell: E) -> Self {
        let execute_unrecognized = config.execute_unrecognized;
        Self {
            config,
            git,
            gh,
            system_shell,
            execute_unrecognized,
        }
    }

    pub fn prompt(&self) -> String {
        let cwd = std::env::current_dir().unwrap_or_default();
        format!("gitbetter::{}>", cwd.display())
    }

    /// Run one line of shell input.
    ///
    /// The first word names the command and the rest of the line is its
    /// argument string. Lines that don't name a command go to
    /// [`App::cmd_unrecognized`].
    pub async fn dispatch(
        &mut self,
        line: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<Outcome> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Outcome::Done);
        }
        let (name, args) = match line.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (line, ""),
        };
        debug!(command = name, args, "dispatching");

        match name {
            "help" | "?" => self.cmd_help(args, stdout),
            "toggle_unrecognized_command_behavior" => self.cmd_toggle_unrecognized(stdout),
            "cd" => self.cmd_cd(args),
            "sys" => self.cmd_sys(args).await,
            "quit" | "exit" => Ok(Outcome::Quit),
            "git" => self.git.execute(args).await.map(Outcome::Ran),
            "add" => self.cmd_add(args, stdout).await,
            "commit" => self.git.commit(args).await.map(Outcome::Ran),
            "push" => self.git.push(args).await.map(Outcome::Ran),
            "pull" => self.git.pull(args).await.map(Outcome::Ran),
            "status" => self.git.status(args).await.map(Outcome::Ran),
            "merge" => self.git.merge(args).await.map(Outcome::Ran),
            "tag" => self.git.tag(args).await.map(Outcome::Ran),
            "new_repo" => self.git.new_repo().await.map(Outcome::Ran),
            "new_branch" => self.git.create_new_branch(args).await.map(Outcome::Ran),
            "new_gh_remote" => self.cmd_new_gh_remote(args, stdout).await,
            "initcommit" => self.git.initial_commit().await.map(Outcome::Ran),
            "undo" => self.git.undo().await.map(Outcome::Ran),
            "commitf" => self.cmd_commitf(args, stdout).await,
            "commitall" => self.cmd_commitall(args).await,
            "switch" => self.git.switch_branch(args).await.map(Outcome::Ran),
            "add_url" => self.cmd_add_url(args).await,
            "push_new" => self.git.push_new_branch(args).await.map(Outcome::Ran),
            "branches" => self.git.list_branches().await.map(Outcome::Ran),
            "loggy" => self.git.loggy().await.map(Outcome::Ran),
            "amend" => self.cmd_amend(args, stdout).await,
            "delete_branch" => self.cmd_delete_branch(args, stdout).await,
            "merge_to" => self.cmd_merge_to(args).await,
            "ignore" => self.cmd_ignore(args).await,
            "make_private" => self.cmd_change_visibility(args, Visibility::Private).await,
            "make_public" => self.cmd_change_visibility(args, Visibility::Public).await,
            "delete_gh_repo" => self.cmd_delete_gh_repo(args).await,
            _ => self.cmd_unrecognized(line, stdout).await,
        }
    }

    /// Run one command given as separate words, as a shell would pass them
    /// on a command line.
    ///
    /// The words are quoted back into a single line, so a word containing
    /// spaces stays one argument.
    pub async fn dispatch_args(
        &mut self,
        words: &[String],
        stdout: &mut impl std::io::Write,
    ) -> Result<Outcome> {
        let line = shlex::try_join(words.iter().map(String::as_str))
            .context("Cannot quote command line arguments")?;
        self.dispatch(&line, stdout).await
    }

    /// Read and dispatch lines until `quit` or end of input.
    ///
    /// A failing command is reported on `stderr` and the loop carries on.
    pub async fn cmd_loop(
        &mut self,
        stdout: &mut impl std::io::Write,
        stderr: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(stdout, "Starting gitbetter...")?;
        writeln!(stdout, "Enter 'help' or '?' for command help.")?;

        let interactive = std::io::stdin().is_terminal();
        while let Some(line) = self.read_line(interactive)? {
            match self.dispatch(&line, stdout).await {
                Ok(Outcome::Quit) => break,
                Ok(_) => {}
                Err(err) => writeln!(stderr, "{} {:#}", "error:".red(), err)?,
            }
        }

        Ok(())
    }

    fn read_line(&self, interactive: bool) -> Result<Option<String>> {
        if interactive {
            let read = Input::<String>::new()
                .with_prompt(self.prompt())
                .allow_empty(true)
                .interact_text();
            return match read {
                Ok(line) => Ok(Some(line)),
                Err(err) if is_end_of_input(&err) => Ok(None),
                Err(err) => Err(err.into()),
            };
        }

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Ctrl-C and Ctrl-D at the prompt end the session instead of failing it.
fn is_end_of_input(err: &dialoguer::Error) -> bool {
    let dialoguer::Error::IO(err) = err;
    matches!(
        err.kind(),
        std::io::ErrorKind::Interrupted | std::io::ErrorKind::UnexpectedEof
    )
}
