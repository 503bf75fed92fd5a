//! Developer tasks for the REAL backend.
//!
//! Run with `cargo run -p xtask -- <command>`.

use std::process::ExitCode;

use clap::Parser;

mod dynamodb;
mod prelude;

use prelude::Output;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Developer tasks for the REAL backend")]
struct Cli {
    /// Only print errors
    #[arg(long, global = true)]
    silent: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Provision the DynamoDB table the server stores into
    Dynamodb(dynamodb::DynamodbCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let out = Output::new(cli.silent);

    let result = match cli.command {
        Command::Dynamodb(command) => dynamodb::run(command, &out).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.error(err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_silent_is_global() {
        let cli = Cli::try_parse_from(["xtask", "dynamodb", "status", "--silent"]).unwrap();
        assert!(cli.silent);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(Cli::try_parse_from(["xtask", "dynamodb", "seed"]).is_err());
    }
}
