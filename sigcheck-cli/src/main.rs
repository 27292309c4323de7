//! Sigcheck CLI - signature authenticity scanning tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;
use utils::Context;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  65  Invalid input (form validation failed)
  66  Cannot read input file or record not found
  69  Scan service or backend unavailable (network, timeout)
  74  Result could not be stored
  75  A scan is already in progress
  76  Malformed response from a service
  77  Not signed in or authentication rejected
  78  Missing or invalid configuration";

#[derive(Parser)]
#[command(name = "sigcheck")]
#[command(author, version, about = "Signature authenticity scanning", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Use an in-memory backend and mock scanner (no network)
    #[arg(long, global = true)]
    mock: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Where the signed-in session is kept
    #[arg(
        long,
        global = true,
        env = "SIGCHECK_SESSION_FILE",
        default_value = ".sigcheck-session.json"
    )]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account; a 6-digit code is emailed for confirmation
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "SIGCHECK_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        confirm_password: String,

        /// Agree to the terms and conditions
        #[arg(long)]
        accept_terms: bool,
    },

    /// Confirm an account with the emailed code
    VerifyOtp {
        #[arg(long)]
        email: String,

        #[arg(long)]
        code: String,
    },

    /// Send a new confirmation code
    ResendOtp {
        #[arg(long)]
        email: String,
    },

    /// Sign in with email and password
    Signin {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SIGCHECK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the saved session
    Signout,

    /// Show the signed-in user
    Whoami,

    /// Create a signature record from an original and a scanned image
    New {
        #[arg(long)]
        title: String,

        #[arg(long)]
        author: String,

        /// Reference signature image
        #[arg(long, value_name = "FILE")]
        original: PathBuf,

        /// Signature image to check
        #[arg(long, value_name = "FILE")]
        scanned: PathBuf,
    },

    /// List your signature records, newest first
    List,

    /// Show a signature record and its latest result
    Show {
        #[arg(value_name = "ID")]
        id: i64,
    },

    /// Scan a signature record and store the result
    Scan {
        #[arg(value_name = "ID")]
        id: i64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a similarity index without contacting any service
    Classify {
        #[arg(value_name = "SCORE", allow_hyphen_values = true)]
        score: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sigcheck=debug" } else { "sigcheck=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Classify { score } = &cli.command {
        return commands::classify::execute(score);
    }

    let ctx = Context::build(cli.mock, cli.session_file)?;
    match cli.command {
        Commands::Signup {
            name,
            email,
            password,
            confirm_password,
            accept_terms,
        } => {
            commands::account::signup(&ctx, name, email, password, confirm_password, accept_terms)
                .await
        }
        Commands::VerifyOtp { email, code } => {
            commands::account::verify_otp(&ctx, &email, &code).await
        }
        Commands::ResendOtp { email } => commands::account::resend_otp(&ctx, &email).await,
        Commands::Signin { email, password } => {
            commands::account::signin(&ctx, &email, &password).await
        }
        Commands::Signout => commands::account::signout(&ctx).await,
        Commands::Whoami => commands::account::whoami(&ctx).await,
        Commands::New {
            title,
            author,
            original,
            scanned,
        } => commands::records::create(&ctx, title, author, original, scanned).await,
        Commands::List => commands::records::list(&ctx).await,
        Commands::Show { id } => commands::records::show(&ctx, id).await,
        Commands::Scan { id, json } => commands::scan::execute(&ctx, id, json).await,
        Commands::Classify { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(e) => ExitCode::from_anyhow(&e),
    };
    if let Some(message) = &exit.message {
        eprintln!("{} {message}", "Error:".red().bold());
    }
    std::process::exit(exit.code);
}
