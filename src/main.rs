// Copyright 2026 DefaceWatch Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use defacewatch::cli;

#[derive(Parser)]
#[command(
    name = "defacewatch",
    about = "Web defacement watchdog: hybrid page-text extraction and a lightweight text classifier",
    version,
    after_help = "Run 'defacewatch <command> --help' for details on each command."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Interface to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,
    },
    /// Check one URL: extract its text and classify it
    Check {
        /// URL to check (scheme optional, http:// is assumed)
        url: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { host, port } => cli::serve::run(&host, port).await,
        Commands::Check { url, json } => cli::check::run(&url, json).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "defacewatch", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
