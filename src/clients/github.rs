use std::fmt::Display;
use std::path::PathBuf;

use anyhow::Result;
use tracing::instrument;

use super::executor::CommandResult;
use super::executor::Executor;
use super::executor::ModeGuard;
use super::executor::OutputMode;
use super::executor::OutputSettings;
use super::executor::ProcessExecutor;

// -----------------------------------------------------------------------------
// Types

/// GitHub client.
///
/// Calls the GitHub CLI, which must already be installed and authenticated.
pub struct Github<E = ProcessExecutor> {
    executor: E,
    output: OutputSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn from_public(public: bool) -> Self {
        if public { Self::Public } else { Self::Private }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// Github impl

impl Github {
    pub fn new(program: &str, dir: impl Into<PathBuf>) -> Self {
        Self::with_executor(ProcessExecutor::new(program, dir))
    }
}

impl<E: Executor> Github<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            output: OutputSettings::default(),
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output.get()
    }

    pub fn set_output_mode(&self, mode: OutputMode) {
        self.output.set(mode);
    }

    /// Capture output until the returned guard goes out of scope.
    pub fn capture_output(&self) -> ModeGuard<'_> {
        self.output.scoped(OutputMode::Capture)
    }

    async fn repo(&self, args: &[&str]) -> Result<CommandResult> {
        let mut argv = vec!["repo".to_string()];
        argv.extend(args.iter().map(|arg| arg.to_string()));
        self.executor.run(self.output.get(), argv).await
    }

    /// Create an empty repository called `name` on GitHub.
    #[instrument(skip(self))]
    pub async fn create_remote(&self, name: &str, visibility: Visibility) -> Result<CommandResult> {
        let flag = format!("--{}", visibility);
        self.repo(&["create", name, flag.as_str()]).await
    }

    /// Create a GitHub repository from the repository in the working
    /// directory, add it as origin and push.
    #[instrument(skip(self))]
    pub async fn create_remote_from_cwd(&self, visibility: Visibility) -> Result<CommandResult> {
        let flag = format!("--{}", visibility);
        self.repo(&["create", "--source", ".", flag.as_str(), "--push"])
            .await
    }

    #[instrument(skip(self))]
    pub async fn change_visibility(
        &self,
        owner: &str,
        name: &str,
        visibility: Visibility,
    ) -> Result<CommandResult> {
        let repo = format!("{}/{}", owner, name);
        self.repo(&[
            "edit",
            repo.as_str(),
            "--visibility",
            visibility.as_str(),
            "--accept-visibility-change-consequences",
        ])
        .await
    }

    pub async fn make_private(&self, owner: &str, name: &str) -> Result<CommandResult> {
        self.change_visibility(owner, name, Visibility::Private).await
    }

    pub async fn make_public(&self, owner: &str, name: &str) -> Result<CommandResult> {
        self.change_visibility(owner, name, Visibility::Public).await
    }

    /// Delete `owner/name` on GitHub without asking for confirmation.
    #[instrument(skip(self))]
    pub async fn delete_remote(&self, owner: &str, name: &str) -> Result<CommandResult> {
        let repo = format!("{}/{}", owner, name);
        self.repo(&["delete", repo.as_str(), "--yes"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::executor::MockExecutor;

    fn expect_args(expected: &'static [&'static str]) -> MockExecutor {
        let mut mock = MockExecutor::new();
        mock.expect_run()
            .withf(move |mode, args| *mode == OutputMode::Passthrough && *args == expected)
            .times(1)
            .returning(|_, _| Ok(CommandResult::Completed { exit_code: 0 }));
        mock
    }

    #[tokio::test]
    async fn test_create_remote() {
        let gh = Github::with_executor(expect_args(&["repo", "create", "demo", "--private"]));
        gh.create_remote("demo", Visibility::from_public(false))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_remote_from_cwd() {
        let gh = Github::with_executor(expect_args(&[
            "repo", "create", "--source", ".", "--public", "--push",
        ]));
        gh.create_remote_from_cwd(Visibility::Public).await.unwrap();
    }

    #[tokio::test]
    async fn test_make_public() {
        let gh = Github::with_executor(expect_args(&[
            "repo",
            "edit",
            "jnb/demo",
            "--visibility",
            "public",
            "--accept-visibility-change-consequences",
        ]));
        gh.make_public("jnb", "demo").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_remote() {
        let gh = Github::with_executor(expect_args(&["repo", "delete", "jnb/demo", "--yes"]));
        let result = gh.delete_remote("jnb", "demo").await.unwrap();
        assert_eq!(result.exit_code(), Some(0));
    }

    #[tokio::test]
    async fn test_capture_output_is_scoped() {
        let mut mock = MockExecutor::new();
        mock.expect_run()
            .withf(|mode, _| *mode == OutputMode::Capture)
            .times(1)
            .returning(|_, _| {
                Ok(CommandResult::Captured {
                    text: String::new(),
                })
            });

        let gh = Github::with_executor(mock);
        {
            let _capture = gh.capture_output();
            gh.delete_remote("jnb", "demo").await.unwrap();
        }
        assert_eq!(gh.output_mode(), OutputMode::Passthrough);
    }
}
