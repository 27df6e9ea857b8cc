use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

pub const GIT_PROGRAM_VAR: &str = "GITBETTER_GIT";
pub const GH_PROGRAM_VAR: &str = "GITBETTER_GH";
pub const SHELL_PROGRAM_VAR: &str = "GITBETTER_SHELL";
pub const EXECUTE_UNRECOGNIZED_VAR: &str = "GITBETTER_EXECUTE_UNRECOGNIZED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Version control program, `git` unless overridden.
    pub git_program: String,
    /// GitHub CLI program, `gh` unless overridden.
    pub gh_program: String,
    /// Program that runs lines the shell doesn't recognize.
    pub shell_program: String,
    /// Whether unrecognized lines are handed to `shell_program`.
    pub execute_unrecognized: bool,
}

impl Config {
    /// Load config from the environment
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source, falling back to defaults for
    /// missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let execute_unrecognized = match lookup(EXECUTE_UNRECOGNIZED_VAR) {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("Invalid value for {}", EXECUTE_UNRECOGNIZED_VAR))?,
            None => defaults.execute_unrecognized,
        };

        Ok(Self {
            git_program: lookup(GIT_PROGRAM_VAR).unwrap_or(defaults.git_program),
            gh_program: lookup(GH_PROGRAM_VAR).unwrap_or(defaults.gh_program),
            shell_program: lookup(SHELL_PROGRAM_VAR).unwrap_or(defaults.shell_program),
            execute_unrecognized,
        })
    }

    /// Default system shell for the current platform
    pub fn default_shell_program() -> String {
        if cfg!(windows) { "cmd" } else { "sh" }.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_program: "git".to_string(),
            gh_program: "gh".to_string(),
            shell_program: Self::default_shell_program(),
            execute_unrecognized: true,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {:?}", other),
    }
}
