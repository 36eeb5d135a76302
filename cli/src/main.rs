//! metalctl - bare-metal device lifecycle and remote command execution

use std::process::ExitCode;

use clap::Parser;

use metalctl::cli::Cli;
use metalctl::{logging, output};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    let json = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            match output::json::format_error(&message, output::json::error_code(&e)) {
                Ok(obj) if json => println!("{obj}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}
