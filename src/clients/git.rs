use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use regex::Regex;
use tokio::io::AsyncWriteExt as _;
use tracing::instrument;
use url::Url;

use super::executor::CommandResult;
use super::executor::Executor;
use super::executor::ModeGuard;
use super::executor::OutputMode;
use super::executor::OutputSettings;
use super::executor::ProcessExecutor;
use super::executor::quote;
use super::executor::tokenize;

/// Prefix `git branch` puts in front of the checked out branch.
const ACTIVE_BRANCH_MARKER: char = '*';

/// File that [`Git::ignore`] appends to.
pub const IGNORE_FILE: &str = ".gitignore";

/// Matches scp-style remotes such as `git@github.com:owner/repo.git`.
static SCP_LIKE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^@/]+@)?[^:/]+:(?P<path>[^/].*)$").expect("static regex is valid")
});

// -----------------------------------------------------------------------------
// Types

/// Git client.
///
/// Every method forwards to the `git` executable. What a method returns
/// depends on the client's [`OutputMode`] at the time of the call.
pub struct Git<E = ProcessExecutor> {
    executor: E,
    dir: PathBuf,
    output: OutputSettings,
}

// -----------------------------------------------------------------------------
// Subcommands

/// Generates one method per git subcommand from a table of
/// `method => "literal"` pairs.
macro_rules! subcommands {
    ($($method:ident => $literal:literal),* $(,)?) => {
        /// Every git subcommand with a dedicated method on [`Git`].
        pub const SUBCOMMANDS: &[&str] = &[$($literal),*];

        #[allow(clippy::should_implement_trait)]
        impl<E: Executor> Git<E> {
            $(
                #[doc = concat!("`git ", $literal, " {args}`")]
                pub async fn $method(&self, args: &str) -> Result<CommandResult> {
                    self.subcommand($literal, args).await
                }
            )*
        }
    };
}

subcommands! {
    add => "add",
    am => "am",
    annotate => "annotate",
    archive => "archive",
    bisect => "bisect",
    blame => "blame",
    branch => "branch",
    bugreport => "bugreport",
    bundle => "bundle",
    checkout => "checkout",
    cherry_pick => "cherry-pick",
    citool => "citool",
    clean => "clean",
    clone => "clone",
    commit => "commit",
    config => "config",
    count_objects => "count-objects",
    describe => "describe",
    diagnose => "diagnose",
    diff => "diff",
    difftool => "difftool",
    fast_export => "fast-export",
    fast_import => "fast-import",
    fetch => "fetch",
    filter_branch => "filter-branch",
    format_patch => "format-patch",
    fsck => "fsck",
    gc => "gc",
    gitk => "gitk",
    gitweb => "gitweb",
    grep => "grep",
    gui => "gui",
    help => "help",
    init => "init",
    instaweb => "instaweb",
    log => "log",
    maintenance => "maintenance",
    merge => "merge",
    merge_tree => "merge-tree",
    mergetool => "mergetool",
    mv => "mv",
    notes => "notes",
    pack_refs => "pack-refs",
    prune => "prune",
    pull => "pull",
    push => "push",
    range_diff => "range-diff",
    rebase => "rebase",
    reflog => "reflog",
    remote => "remote",
    repack => "repack",
    replace => "replace",
    request_pull => "request-pull",
    rerere => "rerere",
    reset => "reset",
    restore => "restore",
    revert => "revert",
    rm => "rm",
    scalar => "scalar",
    shortlog => "shortlog",
    show => "show",
    show_branch => "show-branch",
    sparse_checkout => "sparse-checkout",
    stash => "stash",
    status => "status",
    submodule => "submodule",
    switch => "switch",
    tag => "tag",
    verify_commit => "verify-commit",
    verify_tag => "verify-tag",
    version => "version",
    whatchanged => "whatchanged",
    worktree => "worktree",
}

// -----------------------------------------------------------------------------
// Git impl

impl Git {
    /// Client running `program` inside `dir`.
    pub fn new(program: &str, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self::with_executor(ProcessExecutor::new(program, dir.clone()), dir)
    }
}

impl<E: Executor> Git<E> {
    pub fn with_executor(executor: E, dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            dir: dir.into(),
            output: OutputSettings::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
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

    /// Run `git {command}`.
    pub async fn execute(&self, command: &str) -> Result<CommandResult> {
        let args = tokenize(command)?;
        self.executor.run(self.output.get(), args).await
    }

    async fn subcommand(&self, name: &str, args: &str) -> Result<CommandResult> {
        let mut argv = vec![name.to_string()];
        argv.extend(tokenize(args)?);
        self.executor.run(self.output.get(), argv).await
    }

    async fn commit_with_message(&self, message: &str) -> Result<CommandResult> {
        self.commit(&format!("-m {}", quote(message)?)).await
    }

    // -------------------------------------------------------------------------
    // Convenience

    /// `git init -b main`
    pub async fn new_repo(&self) -> Result<CommandResult> {
        self.init("-b main").await
    }

    /// Compact graph of the history with the files each commit touched.
    pub async fn loggy(&self) -> Result<CommandResult> {
        self.log("--oneline --name-only --abbrev-commit --graph").await
    }

    /// Stage all modified and untracked files.
    pub async fn add_all(&self) -> Result<CommandResult> {
        self.add(".").await
    }

    /// Stage `paths`.
    ///
    /// Paths are joined with spaces without any quoting, so a path containing
    /// a space is staged as two separate paths.
    pub async fn add_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<CommandResult> {
        self.add(&join_paths(paths)).await
    }

    /// Stage `paths` and commit them with `message`.
    #[instrument(skip_all)]
    pub async fn commit_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        message: &str,
    ) -> Result<CommandResult> {
        let staged = self.add_files(paths).await?;
        Ok(staged + self.commit_with_message(message).await?)
    }

    /// Stage everything and commit it with `message`.
    #[instrument(skip_all)]
    pub async fn commit_all(&self, message: &str) -> Result<CommandResult> {
        let staged = self.add_all().await?;
        Ok(staged + self.commit_with_message(message).await?)
    }

    /// Stage everything and commit it as "Initial commit".
    #[instrument(skip_all)]
    pub async fn initial_commit(&self) -> Result<CommandResult> {
        self.commit_all("Initial commit").await
    }

    /// Stage `paths` (everything when empty) and fold them into the last
    /// commit without touching its message.
    #[instrument(skip_all)]
    pub async fn amend<P: AsRef<Path>>(&self, paths: &[P]) -> Result<CommandResult> {
        let staged = if paths.is_empty() {
            self.add_all().await?
        } else {
            self.add_files(paths).await?
        };
        Ok(staged + self.commit("--amend --no-edit").await?)
    }

    /// `git remote add {name} {url}`
    pub async fn add_remote_url(&self, url: &str, name: &str) -> Result<CommandResult> {
        self.remote(&format!("add {} {}", name, url)).await
    }

    /// Push a branch that doesn't exist on origin yet and track it.
    pub async fn push_new_branch(&self, branch: &str) -> Result<CommandResult> {
        self.push(&format!("-u origin {}", branch)).await
    }

    /// Name of the checked out branch, or an empty string if there is none.
    #[instrument(skip_all)]
    pub async fn current_branch(&self) -> Result<String> {
        let _capture = self.capture_output();
        let listing = self.branch("").await?.into_text().unwrap_or_default();
        Ok(parse_current_branch(&listing))
    }

    /// Local and remote branches with their upstreams and tip commits.
    pub async fn list_branches(&self) -> Result<CommandResult> {
        self.branch("-vva").await
    }

    pub async fn switch_branch(&self, branch: &str) -> Result<CommandResult> {
        self.checkout(branch).await
    }

    /// Create `branch` from the current commit and switch to it.
    pub async fn create_new_branch(&self, branch: &str) -> Result<CommandResult> {
        self.checkout(&format!("-b {}", branch)).await
    }

    /// Delete the local `branch`, and unless `local_only` is set also the
    /// branch on origin along with its remote-tracking branch.
    #[instrument(skip(self))]
    pub async fn delete_branch(&self, branch: &str, local_only: bool) -> Result<CommandResult> {
        let local = self.branch(&format!("--delete {}", branch)).await?;
        if local_only {
            return Ok(local);
        }
        Ok(local + self.push(&format!("origin --delete {}", branch)).await?)
    }

    /// Merge the current branch into `target`, leaving `target` checked out.
    #[instrument(skip(self))]
    pub async fn merge_to(&self, target: &str) -> Result<CommandResult> {
        let current = self.current_branch().await?;
        if current.is_empty() {
            bail!("Cannot merge: no branch is checked out");
        }
        let switched = self.switch_branch(target).await?;
        Ok(switched + self.merge(&current).await?)
    }

    /// Discard unstaged changes in the working tree.
    pub async fn undo(&self) -> Result<CommandResult> {
        self.checkout(".").await
    }

    pub async fn rename_file(&self, from: &str, to: &str) -> Result<CommandResult> {
        self.mv(&format!("{} {}", from, to)).await
    }

    /// Stop tracking `paths` but keep them on disk.
    pub async fn untrack<P: AsRef<Path>>(&self, paths: &[P]) -> Result<CommandResult> {
        self.rm(&format!("--cached {}", join_paths(paths))).await
    }

    /// `git remote get-url origin`
    pub async fn origin_url(&self) -> Result<CommandResult> {
        self.remote("get-url origin").await
    }

    /// Owner and repository name taken from the origin URL.
    #[instrument(skip_all)]
    pub async fn origin_owner_and_repo_name(&self) -> Result<(String, String)> {
        let url = {
            let _capture = self.capture_output();
            self.origin_url().await?.into_text().unwrap_or_default()
        };
        parse_owner_and_repo(url.trim())
    }

    /// Append `patterns`, one per line, to the ignore file in the client's
    /// directory.
    pub async fn ignore<S: AsRef<str>>(&self, patterns: &[S]) -> Result<()> {
        let patterns = patterns
            .iter()
            .map(|pattern| pattern.as_ref())
            .collect::<Vec<&str>>()
            .join("\n");
        let path = self.dir.join(IGNORE_FILE);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(format!("\n{}", patterns).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Parsing

fn join_paths<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|path| path.as_ref().display().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_current_branch(listing: &str) -> String {
    listing
        .lines()
        .find_map(|line| line.strip_prefix(ACTIVE_BRANCH_MARKER))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest).to_string())
        .unwrap_or_default()
}

/// Split a remote URL into owner and repository name.
///
/// Accepts URLs like:
/// - git@github.com:owner/repo.git
/// - https://github.com/owner/repo.git
/// - ssh://git@github.com/owner/repo
pub fn parse_owner_and_repo(url: &str) -> Result<(String, String)> {
    if url.is_empty() {
        bail!("No git remote 'origin' configured");
    }

    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => SCP_LIKE_URL
            .captures(url)
            .map(|captures| captures["path"].to_string())
            .with_context(|| format!("Could not parse remote URL: {}", url))?,
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut segments = path.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("Remote URL is not of the form <host>/<owner>/<repo>: {}", url),
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use super::*;
    use crate::clients::executor::MockExecutor;

    fn completed(exit_code: i32) -> CommandResult {
        CommandResult::Completed { exit_code }
    }

    fn captured(text: &str) -> CommandResult {
        CommandResult::Captured {
            text: text.to_string(),
        }
    }

    fn expect_call(
        mock: &mut MockExecutor,
        seq: &mut Sequence,
        mode: OutputMode,
        expected: &[&str],
        result: CommandResult,
    ) {
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        mock.expect_run()
            .withf(move |m, args| *m == mode && *args == expected)
            .times(1)
            .in_sequence(seq)
            .returning(move |_, _| Ok(result.clone()));
    }

    #[tokio::test]
    async fn test_subcommand_prepends_literal() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        use OutputMode::Passthrough;
        expect_call(&mut mock, &mut seq, Passthrough, &["status"], completed(0));
        expect_call(
            &mut mock,
            &mut seq,
            Passthrough,
            &["commit", "-m", "hello world"],
            completed(0),
        );
        expect_call(&mut mock, &mut seq, Passthrough, &["cherry-pick", "abc123"], completed(1));
        expect_call(&mut mock, &mut seq, Passthrough, &["log", "--oneline"], completed(0));

        let git = Git::with_executor(mock, ".");
        assert_eq!(git.status("").await.unwrap(), completed(0));
        assert_eq!(
            git.commit(r#"-m "hello world""#).await.unwrap(),
            completed(0)
        );
        assert_eq!(git.cherry_pick("abc123").await.unwrap(), completed(1));
        assert_eq!(git.execute("log --oneline").await.unwrap(), completed(0));
    }

    #[tokio::test]
    async fn test_unbalanced_quotes_never_spawn() {
        let git = Git::with_executor(MockExecutor::new(), ".");
        assert!(git.commit(r#"-m "oops"#).await.is_err());
    }

    #[test]
    fn test_subcommand_table() {
        assert_eq!(SUBCOMMANDS.len(), 73);
        assert!(SUBCOMMANDS.contains(&"cherry-pick"));
        assert!(SUBCOMMANDS.contains(&"sparse-checkout"));
    }

    #[tokio::test]
    async fn test_commit_files_sums_exit_codes() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        use OutputMode::Passthrough;
        expect_call(&mut mock, &mut seq, Passthrough, &["add", "a.txt", "b.txt"], completed(1));
        expect_call(
            &mut mock,
            &mut seq,
            Passthrough,
            &["commit", "-m", "add two files"],
            completed(0),
        );

        let git = Git::with_executor(mock, ".");
        let result = git
            .commit_files(&["a.txt", "b.txt"], "add two files")
            .await
            .unwrap();
        assert_eq!(result, completed(1));
    }

    #[tokio::test]
    async fn test_initial_commit() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        use OutputMode::Passthrough;
        expect_call(&mut mock, &mut seq, Passthrough, &["add", "."], completed(0));
        expect_call(
            &mut mock,
            &mut seq,
            Passthrough,
            &["commit", "-m", "Initial commit"],
            completed(0),
        );

        let git = Git::with_executor(mock, ".");
        assert_eq!(git.initial_commit().await.unwrap(), completed(0));
    }

    #[tokio::test]
    async fn test_amend_without_paths_stages_everything() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        use OutputMode::Passthrough;
        expect_call(&mut mock, &mut seq, Passthrough, &["add", "."], completed(0));
        expect_call(
            &mut mock,
            &mut seq,
            Passthrough,
            &["commit", "--amend", "--no-edit"],
            completed(0),
        );

        let git = Git::with_executor(mock, ".");
        assert_eq!(git.amend::<&str>(&[]).await.unwrap(), completed(0));
    }

    #[tokio::test]
    async fn test_current_branch_forces_capture() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        expect_call(
            &mut mock,
            &mut seq,
            OutputMode::Capture,
            &["branch"],
            captured("  feature\n* main\n"),
        );

        let git = Git::with_executor(mock, ".");
        assert_eq!(git.current_branch().await.unwrap(), "main");
        assert_eq!(git.output_mode(), OutputMode::Passthrough);
    }

    #[tokio::test]
    async fn test_current_branch_restores_mode_on_error() {
        let mut mock = MockExecutor::new();
        mock.expect_run()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("spawn failed")));

        let git = Git::with_executor(mock, ".");
        assert!(git.current_branch().await.is_err());
        assert_eq!(git.output_mode(), OutputMode::Passthrough);
    }

    #[tokio::test]
    async fn test_delete_branch_remote() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        use OutputMode::Passthrough;
        expect_call(
            &mut mock,
            &mut seq,
            Passthrough,
            &["branch", "--delete", "feature"],
            completed(0),
        );
        expect_call(
            &mut mock,
            &mut seq,
            Passthrough,
            &["push", "origin", "--delete", "feature"],
            completed(1),
        );

        let git = Git::with_executor(mock, ".");
        assert_eq!(git.delete_branch("feature", false).await.unwrap(), completed(1));
    }

    #[tokio::test]
    async fn test_merge_to() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        expect_call(
            &mut mock,
            &mut seq,
            OutputMode::Capture,
            &["branch"],
            captured("* feature\n  main\n"),
        );
        expect_call(
            &mut mock,
            &mut seq,
            OutputMode::Passthrough,
            &["checkout", "main"],
            completed(0),
        );
        expect_call(
            &mut mock,
            &mut seq,
            OutputMode::Passthrough,
            &["merge", "feature"],
            completed(0),
        );

        let git = Git::with_executor(mock, ".");
        assert_eq!(git.merge_to("main").await.unwrap(), completed(0));
    }

    #[tokio::test]
    async fn test_origin_owner_and_repo_name() {
        let mut mock = MockExecutor::new();
        let mut seq = Sequence::new();
        expect_call(
            &mut mock,
            &mut seq,
            OutputMode::Capture,
            &["remote", "get-url", "origin"],
            captured("git@github.com:jnb/test_repo.git\n"),
        );

        let git = Git::with_executor(mock, ".");
        let (owner, repo) = git.origin_owner_and_repo_name().await.unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("jnb", "test_repo"));
    }

    #[test]
    fn test_parse_current_branch() {
        assert_eq!(parse_current_branch("* main\n"), "main");
        assert_eq!(parse_current_branch("  a\n  b\n"), "");
        assert_eq!(parse_current_branch(""), "");
    }

    #[test]
    fn test_parse_owner_and_repo() {
        let cases = [
            "https://github.com/owner/repo",
            "https://github.com/owner/repo.git",
            "git@github.com:owner/repo.git",
            "ssh://git@github.com/owner/repo.git",
        ];
        for url in cases {
            let (owner, repo) = parse_owner_and_repo(url).unwrap();
            assert_eq!(owner, "owner", "{url}");
            assert_eq!(repo, "repo", "{url}");
        }
    }

    #[test]
    fn test_parse_owner_and_repo_rejects_garbage() {
        assert!(parse_owner_and_repo("").is_err());
        assert!(parse_owner_and_repo("/srv/git/repo.git").is_err());
        assert!(parse_owner_and_repo("https://example.com/group/sub/repo.git").is_err());
    }

    #[tokio::test]
    async fn test_ignore_appends_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let git = Git::with_executor(MockExecutor::new(), dir.path());

        git.ignore(&["*.log", "target/"]).await.unwrap();
        git.ignore(&["build"]).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join(IGNORE_FILE)).unwrap();
        assert_eq!(contents, "\n*.log\ntarget/\nbuild");
    }
}
