use clap::ValueHint;

use std::path::PathBuf;

#[derive(clap::Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Path to the config file.
    ///
    /// By default, newsdesk looks for a file named `newsdesk.toml` in the following directories
    /// (in order):
    ///
    /// - `./` (the current directory)
    /// - `/etc`
    #[arg(
        short,
        env = "NEWSDESK_CONFIG",
        value_hint(ValueHint::FilePath)
    )]
    pub config_path: Option<PathBuf>,

    /// Address the reader API binds to.
    #[arg(long, env = "NEWSDESK_BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// Path to the database file holding bookmarks.
    #[arg(long, env = "NEWSDESK_DB", value_hint(ValueHint::FilePath))]
    pub db_path: Option<PathBuf>,

    /// API key for the text insight service (summaries and search suggestions).
    #[arg(long, env = "NEWSDESK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl Args {
    pub fn parse() -> Self {
        clap::Parser::parse()
    }
}
