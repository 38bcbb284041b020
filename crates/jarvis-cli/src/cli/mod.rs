//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use jarvis_client::api::ResumeFormat;
use jarvis_client::{ApiClient, Config, SessionEvent, SessionStore};
use tokio::sync::broadcast;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

/// Printed whenever the session can no longer be used.
pub const LOGIN_HINT: &str = "Session expired. Run `jarvis login` to sign in again.";

#[derive(Parser)]
#[command(name = "jarvis")]
#[command(version)]
#[command(about = "JARVIS job-search assistant API client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the API base URL
    #[arg(long, env = "JARVIS_API_URL", global = true)]
    api_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(flatten)]
    Api(ApiCommands),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Commands that talk to the API.
#[derive(clap::Subcommand)]
enum ApiCommands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        /// Password (read from stdin if omitted)
        #[arg(long, env = "JARVIS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Only verify the credentials; the saved session is left untouched
        #[arg(long)]
        ephemeral: bool,
    },
    /// Create an account and store its session
    Register {
        #[arg(long)]
        email: String,
        /// Password (read from stdin if omitted)
        #[arg(long, env = "JARVIS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Send an authenticated GET and print the JSON response
    Get {
        /// Path relative to the API base URL, e.g. /api/jobs/3
        #[arg(value_name = "PATH")]
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
    /// Job listings
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Job applications
    Applications {
        #[command(subcommand)]
        command: ApplicationCommands,
    },
    /// Outreach email
    Emails {
        #[command(subcommand)]
        command: EmailCommands,
    },
    /// Generated resumes
    Resumes {
        #[command(subcommand)]
        command: ResumeCommands,
    },
}

#[derive(clap::Subcommand)]
enum JobCommands {
    /// List saved jobs
    List {
        /// Filter as key=value (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
}

#[derive(clap::Subcommand)]
enum ApplicationCommands {
    /// Show application pipeline statistics
    Stats,
}

#[derive(clap::Subcommand)]
enum EmailCommands {
    /// Show sent/received email statistics
    Stats,
}

#[derive(clap::Subcommand)]
enum ResumeCommands {
    /// List resumes
    List,
    /// Download a rendered resume
    Download {
        #[arg(value_name = "RESUME_ID")]
        id: i64,
        /// pdf or docx
        #[arg(long, default_value = "pdf")]
        format: ResumeFormat,
        /// Output file (default: resume-<id>.<format>)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("JARVIS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // Ignore the error if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn build_client(api_url: Option<&str>, sessions: SessionStore) -> Result<ApiClient> {
    let mut config = Config::load().context("load config")?;
    if let Some(url) = api_url {
        config.api_url = Config::new(url)?.api_url;
    }
    debug!(api_url = %config.api_url, timeout = ?config.request_timeout, "Resolved config");
    ApiClient::new(config, sessions)
}

/// Tells the user when the client dropped their stored credentials.
fn report_expiry(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Expired {
            eprintln!("Stored credentials were cleared.");
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, api_url } = cli;

    match command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
        },
        Commands::Api(command) => {
            // An ephemeral login must not touch the saved session.
            let sessions = if matches!(command, ApiCommands::Login { ephemeral: true, .. }) {
                SessionStore::in_memory()
            } else {
                SessionStore::with_default_location()
            };
            let client = build_client(api_url.as_deref(), sessions)?;
            let mut events = client.subscribe();
            let result = run_api_command(&client, command).await;
            report_expiry(&mut events);
            result
        }
    }
}

async fn run_api_command(client: &ApiClient, command: ApiCommands) -> Result<()> {
    match command {
        ApiCommands::Login {
            email,
            password,
            ephemeral,
        } => commands::auth::login(client, &email, password, !ephemeral).await,
        ApiCommands::Register { email, password } => {
            commands::auth::register(client, &email, password).await
        }
        ApiCommands::Logout => commands::auth::logout(client),
        ApiCommands::Whoami => commands::auth::whoami(client).await,
        ApiCommands::Get { path, query } => commands::resources::get(client, &path, query).await,
        ApiCommands::Jobs { command } => match command {
            JobCommands::List { query } => commands::resources::list_jobs(client, &query).await,
        },
        ApiCommands::Applications { command } => match command {
            ApplicationCommands::Stats => commands::resources::application_stats(client).await,
        },
        ApiCommands::Emails { command } => match command {
            EmailCommands::Stats => commands::resources::email_stats(client).await,
        },
        ApiCommands::Resumes { command } => match command {
            ResumeCommands::List => commands::resources::list_resumes(client).await,
            ResumeCommands::Download { id, format, output } => {
                commands::resources::download_resume(client, id, format, output).await
            }
        },
    }
}
