//! Send one message through the configured SMTP routing.
//!
//! Usage:
//!   mailctl --config settings.yaml --to jane@example.com --subject "Build finished" --body "All green"
//!
//! Without `--config`, settings come from `SMTP_*` environment variables,
//! optionally loaded from a `.env` file. Prints the dispatch log and exits
//! non-zero when the message was not delivered.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use email_service::{EmailService, FileAttachment, FileSystemAttachment, RoutingConfig};
use logger_redacted::{init_tracing, LoggerConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mailctl")]
#[command(about = "Send an email through the primary and debug SMTP endpoints")]
struct Args {
    /// JSON or YAML settings file with an `SMTP` section
    #[arg(long, env = "MAILCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Recipient address
    #[arg(long)]
    to: String,

    /// Recipient display name
    #[arg(long, default_value = "")]
    to_name: String,

    #[arg(long)]
    subject: String,

    /// Message content; treated as HTML when it contains '<'
    #[arg(long, conflicts_with = "body_file", required_unless_present = "body_file")]
    body: Option<String>,

    /// Read the message content from a file
    #[arg(long)]
    body_file: Option<PathBuf>,

    /// CSS embedded in the head of HTML messages
    #[arg(long)]
    style: Option<String>,

    /// Reply-to address, defaults to the configured sender
    #[arg(long, requires = "reply_name")]
    reply_to: Option<String>,

    /// Reply-to display name, defaults to the configured friendly name
    #[arg(long)]
    reply_name: Option<String>,

    /// File to attach; repeat for several
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,

    /// Debug level logging with source locations
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let env_file = dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(
        &LoggerConfig::default()
            .verbose(args.verbose)
            .with_json(args.json_logs),
    )?;

    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = match &args.config {
        Some(path) => RoutingConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RoutingConfig::from_env().context("reading SMTP_* environment")?,
    };

    let content = match (&args.body, &args.body_file) {
        (Some(body), _) => body.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => anyhow::bail!("either --body or --body-file is required"),
    };

    let mut files: Vec<Box<dyn FileAttachment>> = Vec::with_capacity(args.attachments.len());
    for path in &args.attachments {
        let file = FileSystemAttachment::open(path)
            .await
            .with_context(|| format!("opening attachment {}", path.display()))?;
        files.push(Box::new(file));
    }

    let service = EmailService::smtp(config);
    let style = args.style.as_deref();

    let result = match (&args.reply_to, &args.reply_name) {
        (Some(address), Some(name)) => {
            service
                .send_with_reply_to(address, name, &args.to, &args.to_name, &args.subject, &content, style, &mut files)
                .await?
        }
        (None, Some(name)) => {
            service
                .send_as(name, &args.to, &args.to_name, &args.subject, &content, style, &mut files)
                .await?
        }
        _ => {
            service
                .send(&args.to, &args.to_name, &args.subject, &content, style, &mut files)
                .await?
        }
    };

    print!("{}", result.log_text);

    if result.success {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Message was not delivered");
        Ok(ExitCode::FAILURE)
    }
}
