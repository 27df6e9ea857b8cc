pub mod clients;

mod app;
pub mod commands;
pub mod config;

// Re-export App and Config from modules
pub use app::App;
pub use app::COMMANDS;
pub use app::Outcome;
pub use clients::executor::CommandResult;
pub use clients::executor::LaunchError;
pub use clients::executor::OutputMode;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
