use std::path::Path;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use walkdir::WalkDir;

use super::parse_args;
use crate::App;
use crate::app::Outcome;
use crate::clients::executor::Executor;
use crate::clients::executor::tokenize;

#[derive(Parser, Debug)]
#[command(name = "add", no_binary_name = true)]
#[command(about = "Stage files; all files when none are given")]
struct AddArgs {
    /// Files to stage
    files: Vec<String>,
    /// Search subfolders for file names that aren't in the working directory
    #[arg(short, long)]
    recursive: bool,
}

#[derive(Parser, Debug)]
#[command(name = "commitf", no_binary_name = true)]
#[command(about = "Stage and commit files")]
struct CommitFilesArgs {
    /// Files to stage and commit
    files: Vec<String>,
    /// The commit message to use
    #[arg(short, long)]
    message: String,
    /// Search subfolders for file names that aren't in the working directory
    #[arg(short, long)]
    recursive: bool,
}

#[derive(Parser, Debug)]
#[command(name = "amend", no_binary_name = true)]
#[command(about = "Stage files (all when none are given) and amend the last commit")]
struct AmendArgs {
    /// Files to stage
    files: Vec<String>,
    /// Search subfolders for file names that aren't in the working directory
    #[arg(short, long)]
    recursive: bool,
}

impl<E: Executor> App<E> {
    pub async fn cmd_add(&self, args: &str, stdout: &mut impl std::io::Write) -> Result<Outcome> {
        let Some(args) = parse_args::<AddArgs>(args, stdout)? else {
            return Ok(Outcome::Done);
        };
        if args.files.is_empty() {
            return Ok(Outcome::Ran(self.git.add_all().await?));
        }

        let Some(files) = self.resolve_files(args.files, args.recursive, stdout)? else {
            return Ok(Outcome::Done);
        };
        Ok(Outcome::Ran(self.git.add_files(&files).await?))
    }

    pub async fn cmd_commitf(
        &self,
        args: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<Outcome> {
        let Some(args) = parse_args::<CommitFilesArgs>(args, stdout)? else {
            return Ok(Outcome::Done);
        };
        let Some(files) = self.resolve_files(args.files, args.recursive, stdout)? else {
            return Ok(Outcome::Done);
        };
        Ok(Outcome::Ran(
            self.git.commit_files(&files, &args.message).await?,
        ))
    }

    /// Stage and commit everything. The message may be quoted or left bare;
    /// bare words are joined with single spaces.
    pub async fn cmd_commitall(&self, message: &str) -> Result<Outcome> {
        let message = tokenize(message)?.join(" ");
        Ok(Outcome::Ran(self.git.commit_all(&message).await?))
    }

    pub async fn cmd_amend(&self, args: &str, stdout: &mut impl std::io::Write) -> Result<Outcome> {
        let Some(args) = parse_args::<AmendArgs>(args, stdout)? else {
            return Ok(Outcome::Done);
        };
        if args.files.is_empty() {
            return Ok(Outcome::Ran(self.git.amend::<&str>(&[]).await?));
        }

        let Some(files) = self.resolve_files(args.files, args.recursive, stdout)? else {
            return Ok(Outcome::Done);
        };
        Ok(Outcome::Ran(self.git.amend(&files).await?))
    }

    /// Add patterns to the ignore file. Quote a pattern that contains spaces.
    pub async fn cmd_ignore(&self, patterns: &str) -> Result<Outcome> {
        let patterns = tokenize(patterns)?;
        self.git.ignore(&patterns).await?;
        Ok(Outcome::Done)
    }

    /// Apply `--recursive` to a list of file names.
    ///
    /// Returns `None` when names were given but none of them could be found,
    /// so that nothing gets staged by accident.
    fn resolve_files(
        &self,
        names: Vec<String>,
        recursive: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<Option<Vec<String>>> {
        if !recursive || names.is_empty() {
            return Ok(Some(names));
        }
        let files = find_files(&names, self.git.dir(), stdout)?;
        Ok(if files.is_empty() { None } else { Some(files) })
    }
}

/// Resolve file names relative to `root`.
///
/// Names that exist under `root` are kept as they are. Any other name is
/// looked up in every subfolder and replaced by all matches.
fn find_files(
    names: &[String],
    root: &Path,
    stdout: &mut impl std::io::Write,
) -> Result<Vec<String>> {
    let mut files = vec![];
    for name in names {
        if root.join(name).exists() {
            files.push(name.clone());
            continue;
        }

        let matches: Vec<String> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name().to_str() != Some(".git"))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_str() == Some(name.as_str()))
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .ok()
                    .map(|path| path.display().to_string())
            })
            .collect();

        if matches.is_empty() {
            writeln!(
                stdout,
                "{} Could not find any files with name {}",
                "WARNING:".yellow(),
                name
            )?;
        }
        files.extend(matches);
    }

    Ok(files)
}
