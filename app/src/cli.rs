use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line surface. Everything that shapes *how the bridge runs* lives
/// here; everything that shapes *what it bridges* (orgs, brokers, routes)
/// lives in the YAML document pointed to by `--config`.
#[derive(Debug, Parser)]
#[command(name = "eventbridge", version, about)]
pub struct UserArgs {
    /// Path to the application configuration document.
    #[arg(long, short = 'c')]
    pub config: PathBuf,

    #[command(flatten)]
    pub log: LogArgs,

    /// Swallow downstream publish failures instead of shutting down.
    #[arg(long, default_value_t = false)]
    pub ignore_sink_errors: bool,

    /// Tolerate replay marker store connection failures by degrading reads
    /// to "no marker" and dropping writes, instead of failing the source.
    #[arg(long, default_value_t = false)]
    pub ignore_replay_network_errors: bool,

    /// Upper bound, in seconds, on a source's open handshake.
    #[arg(long, default_value_t = 30)]
    pub connection_timeout_secs: u64,

    /// OAuth2 login host used by every configured org.
    #[arg(long, default_value = "https://login.salesforce.com")]
    pub login_url: String,

    /// Salesforce REST/CometD API version.
    #[arg(long, default_value = "59.0")]
    pub api_version: String,
}

impl UserArgs {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

#[derive(Debug, Parser)]
pub struct LogArgs {
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}
