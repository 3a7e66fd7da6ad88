use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc;

use newscloud::auth::{AuthError, CredentialStore};
use newscloud::config::Config;
use newscloud::pipeline::{Pipeline, PipelineEvent, RunReport};

/// Get the config directory path (~/.config/newscloud/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newscloud"))
}

#[derive(Parser, Debug)]
#[command(name = "newscloud", about = "News portal word cloud generator")]
struct Args {
    /// Config file (default: ~/.config/newscloud/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account. Reads the password, then its confirmation, from stdin.
    Register { username: String },

    /// Check credentials. Reads the password from stdin.
    Login { username: String },

    /// Log in, scrape the news page and render the word cloud.
    Run {
        username: String,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Open the rendered image in the system viewer
        #[arg(long)]
        open: bool,
    },
}

/// Read one line from stdin as a secret, without the line ending.
fn read_secret(lines: &mut impl Iterator<Item = std::io::Result<String>>, prompt: &str) -> Result<SecretString> {
    eprint!("{prompt}: ");
    let line = lines
        .next()
        .transpose()
        .context("Failed to read from stdin")?
        .unwrap_or_default();
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn print_report(report: &RunReport) {
    println!("Analysis complete for {}", report.user);
    println!("  News items:  {}", report.item_count);
    println!("  Words kept:  {} ({} placed)", report.kept_words, report.placed_words);
    println!("  CSV export:  {}", report.export_path.display());
    println!("  Word cloud:  {}", report.image_path.display());
    if !report.top_words.is_empty() {
        println!("  Top words:");
        for entry in &report.top_words {
            println!("    {:<12} {}", entry.word, entry.count);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let base_dir = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir.clone());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let paths = config.data_paths(&base_dir);

    if !base_dir.exists() {
        std::fs::create_dir_all(&base_dir).context("Failed to create config directory")?;
    }

    let store = CredentialStore::open(&paths.credentials, config.hash_scheme);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    match args.command {
        Command::Register { username } => {
            let password = read_secret(&mut lines, "Password")?;
            let confirm = read_secret(&mut lines, "Confirm password")?;
            match store.register(&username, &password, &confirm) {
                Ok(()) => println!("Registered {username}. You can now log in."),
                Err(e @ AuthError::Storage(_)) => return Err(e).context("Registration failed"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Login { username } => {
            let password = read_secret(&mut lines, "Password")?;
            match store.login(&username, &password) {
                Ok(session) => println!("Welcome back, {}!", session.username()),
                Err(e @ AuthError::Storage(_)) => return Err(e).context("Login failed"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Run { username, json, open } => {
            let password = read_secret(&mut lines, "Password")?;
            let session = match store.login(&username, &password) {
                Ok(session) => session,
                Err(e @ AuthError::Storage(_)) => return Err(e).context("Login failed"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            };

            let pipeline =
                Pipeline::from_config(&config, &paths).context("Failed to set up pipeline")?;

            let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(8);
            let progress = tokio::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    if let PipelineEvent::StageStarted(stage) = event {
                        eprintln!("{stage}...");
                    }
                }
            });

            let result = pipeline.run(&session, Some(&event_tx)).await;
            drop(event_tx);
            let _ = progress.await;

            let report = result.context("Analysis failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            if open {
                if let Err(e) = open::that(&report.image_path) {
                    tracing::warn!(error = %e, path = %report.image_path.display(), "Failed to open word cloud");
                    eprintln!("Could not open {}: {e}", report.image_path.display());
                }
            }
        }
    }

    Ok(())
}
