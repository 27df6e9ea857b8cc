use anyhow::Result;
use clap::Parser;

use super::parse_args;
use crate::App;
use crate::app::Outcome;
use crate::clients::executor::Executor;

/// Branch `merge_to` merges into when none is given.
const DEFAULT_TARGET_BRANCH: &str = "main";

#[derive(Parser, Debug)]
#[command(name = "delete_branch", no_binary_name = true)]
#[command(about = "Delete a branch")]
struct DeleteBranchArgs {
    /// The name of the branch to delete
    branch: String,
    /// Also delete the branch on origin and its remote-tracking branch
    #[arg(short, long)]
    remote: bool,
}

impl<E: Executor> App<E> {
    pub async fn cmd_delete_branch(
        &self,
        args: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<Outcome> {
        let Some(args) = parse_args::<DeleteBranchArgs>(args, stdout)? else {
            return Ok(Outcome::Done);
        };
        let result = self.git.delete_branch(&args.branch, !args.remote).await?;
        Ok(Outcome::Ran(result))
    }

    pub async fn cmd_merge_to(&self, target: &str) -> Result<Outcome> {
        let target = if target.is_empty() {
            DEFAULT_TARGET_BRANCH
        } else {
            target
        };
        Ok(Outcome::Ran(self.git.merge_to(target).await?))
    }
}
