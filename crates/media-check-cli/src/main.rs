mod settings;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use media_check_core::report::render::{export_report, load_report, render_report, OutputFormat};
use media_check_core::{
    build_client, BackendResponse, ChatError, ChatSession, CheckRequest, ComplianceChecker,
    ComplianceReport, ComplianceStatus, MediaStore, ReportSubject, ResponseTransformer,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "media-check",
    author,
    version,
    about = "Media compliance checker CLI"
)]
struct Cli {
    /// Config file with a `[backend]` table (TOML, YAML or JSON)
    #[arg(long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Output format for reports
    #[arg(long, value_enum, default_value_t = Format::Human, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Human,
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send content to the backend and print the compliance report
    Check {
        #[command(subcommand)]
        target: CheckTarget,

        #[command(flatten)]
        export: ExportArgs,
    },
    /// Build a report from a saved backend payload without contacting the backend
    Transform {
        /// Payload file (JSON or JSON5); reads stdin when omitted
        payload: Option<PathBuf>,

        /// File name recorded in the report metadata
        #[arg(long, default_value = "unknown")]
        file_name: String,

        /// File size in bytes recorded in the report metadata
        #[arg(long, default_value_t = 0)]
        file_size: u64,

        /// Media duration in seconds
        #[arg(long, value_parser = parse_duration_secs)]
        duration: Option<f64>,

        #[command(flatten)]
        export: ExportArgs,
    },
    /// Save media into a directory and chat with the assistant about it
    Chat {
        /// Directory the media is saved into and submitted to the backend
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,

        /// Media files to copy into the directory first
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,

        /// Text to save into the directory as `text-input.txt`
        #[arg(long)]
        text: Option<String>,
    },
    /// Render a previously exported report
    Show {
        report: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum CheckTarget {
    /// Check a video, audio, image or document file
    File {
        path: PathBuf,

        /// Media duration in seconds
        #[arg(long, value_parser = parse_duration_secs)]
        duration: Option<f64>,
    },
    /// Check a web page or YouTube video by URL
    Url { url: String },
    /// Check pasted text; reads stdin when omitted
    Text { text: Option<String> },
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Also write the report as JSON into this directory
    #[arg(long, value_name = "DIR", global = true)]
    export: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check { target, export } => {
            check(cli.config.as_deref(), target, cli.format, export.export.as_deref()).await?
        }
        Commands::Transform {
            payload,
            file_name,
            file_size,
            duration,
            export,
        } => {
            let subject = ReportSubject::new(file_name, file_size).with_duration(duration);
            transform(payload.as_deref(), &subject, cli.format, export.export.as_deref()).await?
        }
        Commands::Chat { dir, files, text } => {
            chat(cli.config.as_deref(), &dir, &files, text.as_deref()).await?
        }
        Commands::Show { report } => print_report(&load_report(&report)?, cli.format)?,
    }
    Ok(())
}

async fn check(
    config: Option<&Path>,
    target: CheckTarget,
    format: Format,
    export: Option<&Path>,
) -> Result<()> {
    let settings = settings::load_backend_settings(config)?;
    let checker = ComplianceChecker::new(build_client(&settings)?);
    let request = match target {
        CheckTarget::File { path, duration } => CheckRequest::File {
            path,
            duration_sec: duration,
        },
        CheckTarget::Url { url } => CheckRequest::Url { url },
        CheckTarget::Text { text } => CheckRequest::Text {
            text: match text {
                Some(text) => text,
                None => read_stdin().await?,
            },
        },
    };

    let report = match checker.check(&request).await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "compliance check failed");
            bail!(err.user_message());
        }
    };
    finish(&report, format, export)
}

async fn transform(
    payload: Option<&Path>,
    subject: &ReportSubject,
    format: Format,
    export: Option<&Path>,
) -> Result<()> {
    let raw = match payload {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read payload {}", path.display()))?,
        None => read_stdin().await?,
    };
    let response = BackendResponse::parse(&raw)?;
    let report = ResponseTransformer::new().transform(&response, subject);
    finish(&report, format, export)
}

async fn chat(
    config: Option<&Path>,
    dir: &Path,
    files: &[PathBuf],
    text: Option<&str>,
) -> Result<()> {
    let store = MediaStore::new(dir);
    for file in files {
        let saved = store.save_file(file).await?;
        println!("saved {} ({}, {} bytes)", saved.name, saved.kind.as_str(), saved.size);
    }
    if let Some(text) = text {
        let saved = store.save_text("text-input.txt", text).await?;
        println!("saved {} ({} bytes)", saved.name, saved.size);
    }

    let settings = settings::load_backend_settings(config)?;
    let client = build_client(&settings)?;
    let mut session = match ChatSession::open(client, store.base_path()).await {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "directory submission failed");
            bail!(err.user_message());
        }
    };
    for message in session.transcript() {
        println!("assistant> {}", message.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let next = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = next else { break };
        let line = line.trim();
        if matches!(line, "/quit" | "/exit") {
            break;
        }
        match session.send(line).await {
            Ok(reply) => println!("assistant> {}", reply.content),
            Err(ChatError::EmptyMessage) => continue,
            Err(ChatError::Transport(err)) => {
                error!(error = %err, "chat message failed");
                eprintln!("{}", err.user_message());
            }
        }
    }
    Ok(())
}

fn finish(report: &ComplianceReport, format: Format, export: Option<&Path>) -> Result<()> {
    print_report(report, format)?;
    if let Some(dir) = export {
        let path = export_report(report, dir)?;
        eprintln!("report written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &ComplianceReport, format: Format) -> Result<()> {
    match format {
        Format::Human => {
            println!("{}", badge(report.status()));
            print!("{}", render_report(report, OutputFormat::Human)?);
        }
        Format::Json => println!("{}", render_report(report, OutputFormat::Json)?),
        Format::Yaml => print!("{}", serde_yaml::to_string(report)?),
    }
    Ok(())
}

fn badge(status: ComplianceStatus) -> colored::ColoredString {
    let label = format!("[{}]", status.as_str().to_ascii_uppercase());
    match status {
        ComplianceStatus::Pass => label.green().bold(),
        ComplianceStatus::PartialFail => label.yellow().bold(),
        ComplianceStatus::Fail => label.red().bold(),
    }
}

fn parse_duration_secs(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("duration must be a finite, non-negative number (got `{raw}`)"));
    }
    Ok(secs)
}

async fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("failed to read stdin")?;
    Ok(buf)
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
