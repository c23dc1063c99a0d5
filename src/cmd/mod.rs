//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], [`validate`], or [`health`].
//! Each handler lives in its own submodule.

pub mod health;
pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::GatewayError;

pub async fn dispatch(cli: Cli) -> Result<(), GatewayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("TOLLGATE_GIT_SHORT");
    let profile = env!("TOLLGATE_BUILD_PROFILE");
    println!(
        "\n  tollgate v{version} ({commit}, {profile}): HTTP gateway\n\n  \
         No command provided. To get started:\n\n    \
         tollgate init                   Generate a starter config\n    \
         tollgate run                    Start the gateway (auto-detects ./tollgate.yaml)\n    \
         tollgate run -c gateway.yaml    Start with a specific config file\n    \
         tollgate --help                 See all commands and options\n"
    );
}
