use std::io::Write as _;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use gitbetter::App;
use gitbetter::Config;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "gitbetter")]
#[command(about = "A shell for git and the GitHub CLI with shortcuts for everyday workflows", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive shell (the default)
    Shell,
    /// Run a single shell line and exit with its exit code
    Run {
        /// The command and its arguments, e.g. `commitf a.txt -m "message"`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        line: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    let mut app = App::new(Config::load()?);

    match cli.command {
        Some(Commands::Run { line }) => {
            let mut stdout = std::io::stdout();
            let outcome = app.dispatch_args(&line, &mut stdout).await?;
            stdout.flush()?;
            std::process::exit(outcome.process_status());
        }
        Some(Commands::Shell) | None => {
            app.cmd_loop(&mut std::io::stdout(), &mut std::io::stderr())
                .await?
        }
    }

    Ok(())
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?;
    tracing_subscriber::fmt()
        .with_timer(timer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
