use anyhow::Result;
use clap::{Parser, ValueEnum};
use petlog_core::file_utils::{ChatEncoding, to_pretty_json, write_json_file};
use petlog_core::{merge_into_dataset, parse_chat_file};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "petlog",
    version = "0.1.0",
    about = "Extract pet grade, stats, attributes and routes from chat logs into JSON",
    long_about = None
)]
struct Cli {
    /// Chat log text file (e.g. chat.txt)
    chat: PathBuf,

    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Existing pets.json to merge the extracted pets into
    #[arg(long, value_name = "PETS_JSON")]
    merge: Option<PathBuf>,

    /// Text encoding of the chat log
    #[arg(long, value_enum, env = "PETLOG_ENCODING", default_value_t = EncodingArg::Utf8)]
    encoding: EncodingArg,

    /// Path to log file
    #[arg(long, env = "PETLOG_LOG_FILE", default_value = "/tmp/petlog.log")]
    log_file: PathBuf,

    /// Verbosity level (repeat for more verbose output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingArg {
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
    #[value(name = "euc-kr", alias = "cp949")]
    EucKr,
}

impl From<EncodingArg> for ChatEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Utf8 => ChatEncoding::Utf8,
            EncodingArg::EucKr => ChatEncoding::EucKr,
        }
    }
}

fn setup_logging(verbose: u8, log_file: &std::path::Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter_level = match verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(filter_level.into());

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(std::path::Path::new(".")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("petlog.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // stdout carries the JSON output, so terminal logging goes to stderr
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().with_writer(std::io::stderr).with_ansi(true))
        .with(fmt::Layer::new().with_writer(non_blocking).with_ansi(false));

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = setup_logging(cli.verbose, &cli.log_file)?;

    info!("Starting petlog");

    if !cli.chat.is_file() {
        anyhow::bail!("Chat log file not found: {}", cli.chat.display());
    }
    if let Some(merge_path) = &cli.merge {
        if !merge_path.is_file() {
            anyhow::bail!("Merge target pets.json not found: {}", merge_path.display());
        }
    }

    let pets = parse_chat_file(&cli.chat, cli.encoding.into())?;

    let result: Value = match &cli.merge {
        Some(merge_path) => {
            let (merged, summary) = merge_into_dataset(merge_path, &pets)?;
            info!(
                "Merge summary: {} updated, {} added, {} skipped",
                summary.updated, summary.added, summary.skipped
            );
            merged
        }
        // Default output is the extracted pets as a list sorted by name
        None => serde_json::to_value(pets.into_sorted())?,
    };

    match &cli.out {
        Some(out_path) => {
            write_json_file(out_path, &result)?;
            println!("Saved: {}", out_path.display());
        }
        None => {
            println!("{}", to_pretty_json(&result)?);
        }
    }

    info!("petlog finished");
    Ok(())
}
