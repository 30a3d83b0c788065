use clap::{Parser, Subcommand};
use kintone_bridge::normalize::Normalizer;
use kintone_bridge::services::config::Settings;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kintone-bridge",
    version,
    about = "MCP server exposing kintone records over stdio"
)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server on stdin/stdout (default)
    Serve,
    /// Validate the configuration and print a summary
    Check,
    /// Clean a string the way record text is cleaned before writes
    Normalize {
        /// Text to clean; read from stdin when omitted
        text: Option<String>,
    },
}

fn check() -> i32 {
    let settings = Settings::from_env();
    let kintone = match &settings.kintone {
        Ok(config) => serde_json::json!({
            "ok": true,
            "domain": config.domain,
            "auth": config.auth.method(),
            "timeout_ms": config.timeout.as_millis() as u64,
        }),
        Err(err) => serde_json::json!({"ok": false, "error": err}),
    };
    let summary = serde_json::json!({
        "kintone": kintone,
        "normalize_depth": settings.normalize_depth.as_str(),
        "snap_dropdowns": settings.snap_dropdowns,
        "warnings": settings.warnings,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_default()
    );
    if settings.kintone.is_ok() {
        0
    } else {
        1
    }
}

fn normalize(text: Option<String>) -> i32 {
    let input = match text {
        Some(text) => text,
        None => {
            let mut raw = Vec::new();
            if let Err(err) = std::io::stdin().read_to_end(&mut raw) {
                eprintln!("kintone-bridge: {}", err);
                return 1;
            }
            String::from_utf8_lossy(&raw).into_owned()
        }
    };
    let settings = Settings::from_env();
    let normalizer = Normalizer::default().with_depth(settings.normalize_depth);
    println!("{}", normalizer.normalize_text(&input));
    0
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            if let Err(err) = dotenvy::from_path(path) {
                eprintln!("kintone-bridge: cannot load {}: {}", path.display(), err);
                std::process::exit(2);
            }
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let code = match cli.command.unwrap_or(Command::Serve) {
        Command::Check => check(),
        Command::Normalize { text } => normalize(text),
        Command::Serve => match kintone_bridge::mcp::server::run_stdio().await {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("kintone-bridge: {}", err);
                1
            }
        },
    };
    std::process::exit(code);
}
