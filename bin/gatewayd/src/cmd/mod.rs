//! Built-in `gatewayd` commands.
use clap::Parser;
use clap::Subcommand;

pub mod server;

/// Brokered query gateway for a document database with changefeed support.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the gatewayd configuration file to use.
    #[arg(short = 'c', long = "config", default_value_t = String::from("gatewayd.yaml"))]
    pub config: String,

    /// Name of the configured service to run, e.g. `services.<name>` in the config file.
    #[arg(short = 's', long = "service", default_value_t = String::from("default"))]
    pub service: String,

    /// Select the gatewayd command to run. Defaults to `server` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Select the gatewayd command to run.
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Run the query mediator server.
    #[command(alias = "run")]
    Server,
}
