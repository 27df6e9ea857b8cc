use std::path::Path;

use gitbetter::CommandResult;
use gitbetter::OutputMode;
use gitbetter::clients::git::Git;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const OK: CommandResult = CommandResult::Completed { exit_code: 0 };

/// Creates a git repository with `main` as its default branch in the given
/// directory and returns a client for it.
///
/// Sets the basic git config needed for commits. The directory should
/// already exist.
pub async fn create_git_repo(dir: &Path) -> anyhow::Result<Git> {
    let git = Git::new("git", dir);
    {
        // Keep setup noise out of the test output
        let _capture = git.capture_output();
        git.new_repo().await?;
        git.config(r#"user.name "Test User""#).await?;
        git.config("user.email test@example.com").await?;
        git.config("commit.gpgsign false").await?;
    }
    anyhow::ensure!(dir.join(".git").is_dir(), "git init failed");
    anyhow::ensure!(git.output_mode() == OutputMode::Passthrough);

    Ok(git)
}

/// Creates a repository holding a single committed file `a.txt`.
pub async fn create_committed_repo(dir: &Path) -> anyhow::Result<Git> {
    let git = create_git_repo(dir).await?;
    tokio::fs::write(dir.join("a.txt"), "a\n").await?;
    anyhow::ensure!(git.initial_commit().await? == OK, "initial commit failed");
    Ok(git)
}

/// Runs `git {args}` with output captured and returns the text.
pub async fn captured(git: &Git, args: &str) -> anyhow::Result<String> {
    let _capture = git.capture_output();
    let result = git.execute(args).await?;
    result
        .into_text()
        .ok_or_else(|| anyhow::anyhow!("expected captured output"))
}

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}
