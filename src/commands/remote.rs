use anyhow::Result;
use clap::Parser;
use tracing::info;

use super::parse_args;
use crate::App;
use crate::app::Outcome;
use crate::clients::executor::Executor;
use crate::clients::github::Visibility;

#[derive(Parser, Debug)]
#[command(name = "new_gh_remote", no_binary_name = true)]
#[command(about = "Create a GitHub repository from the current one and push it")]
struct NewRemoteArgs {
    /// Make the new repository public instead of private
    #[arg(long)]
    public: bool,
}

impl<E: Executor> App<E> {
    pub async fn cmd_new_gh_remote(
        &self,
        args: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<Outcome> {
        let Some(args) = parse_args::<NewRemoteArgs>(args, stdout)? else {
            return Ok(Outcome::Done);
        };
        let visibility = Visibility::from_public(args.public);
        Ok(Outcome::Ran(self.gh.create_remote_from_cwd(visibility).await?))
    }

    /// Add `url` as origin and push main to it.
    pub async fn cmd_add_url(&self, url: &str) -> Result<Outcome> {
        let added = self.git.add_remote_url(url, "origin").await?;
        let pushed = self.git.push("-u origin main").await?;
        Ok(Outcome::Ran(added + pushed))
    }

    pub async fn cmd_change_visibility(
        &self,
        owner: &str,
        visibility: Visibility,
    ) -> Result<Outcome> {
        let (owner, name) = self.remote_repo(owner).await?;
        info!(%owner, %name, %visibility, "changing repository visibility");
        let result = self.gh.change_visibility(&owner, &name, visibility).await?;
        Ok(Outcome::Ran(result))
    }

    pub async fn cmd_delete_gh_repo(&self, owner: &str) -> Result<Outcome> {
        let (owner, name) = self.remote_repo(owner).await?;
        info!(%owner, %name, "deleting repository");
        Ok(Outcome::Ran(self.gh.delete_remote(&owner, &name).await?))
    }

    /// Owner and name of the repository behind origin. A non-empty `owner`
    /// replaces the one in the URL.
    async fn remote_repo(&self, owner: &str) -> Result<(String, String)> {
        let (origin_owner, name) = self.git.origin_owner_and_repo_name().await?;
        let owner = if owner.is_empty() {
            origin_owner
        } else {
            owner.to_string()
        };
        Ok((owner, name))
    }
}
