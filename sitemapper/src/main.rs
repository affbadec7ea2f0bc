use colored::Colorize;
use sitemapper::{command_argument_builder, exit_code, handle_crawl};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = command_argument_builder().get_matches();

    match handle_crawl(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}
