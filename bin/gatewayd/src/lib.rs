//! Combine configuration loading, logging and the Query Mediator into a runnable process.
use anyhow::Result;
use clap::Parser;

mod cmd;
mod init;

pub use self::cmd::Cli;

/// Initialise the gatewayd process and invoke the selected command.
pub async fn execute(cli: Cli, conf: gateway_conf::Conf) -> Result<()> {
    match cli.command.clone().unwrap_or(cmd::Command::Server) {
        cmd::Command::Server => cmd::server::run(cli, conf).await,
    }
}

/// Initialise the async runtime for the process and invoke [`execute`].
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let conf = gateway_conf::load(&cli.config)?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed tokio runtime initialisation")
        .block_on(execute(cli, conf))
}
