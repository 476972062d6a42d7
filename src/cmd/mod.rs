//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], or [`validate`]. Each handler
//! lives in its own submodule.

pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::CheckpointError;

pub async fn dispatch(cli: Cli) -> Result<(), CheckpointError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  checkpoint v{version}\n\n  \
         No command provided. To get started:\n\n    \
         checkpoint init                   Generate a starter config\n    \
         checkpoint run                    Start the server (auto-detects ./checkpoint.yaml)\n    \
         checkpoint run -c groups.yaml     Start with a specific config file\n    \
         checkpoint --help                 See all commands and options\n"
    );
}
