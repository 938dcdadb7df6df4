use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use common::config::Settings;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/taxi.toml";

/// Exit status when the run finished but some files failed.
const EXIT_PARTIAL_FAILURE: i32 = 2;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_path(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG)
}

async fn run_ingest(config_path: &str) -> anyhow::Result<i32> {
    let summary = ingest::run_ingest_pipeline(config_path)
        .await
        .with_context(|| format!("ingestion with config {} failed", config_path))?;

    Ok(if summary.has_failures() {
        EXIT_PARTIAL_FAILURE
    } else {
        0
    })
}

fn print_plan(config_path: &str) -> anyhow::Result<i32> {
    let settings = Settings::new(config_path)
        .with_context(|| format!("cannot load config {}", config_path))?;
    let files = ingest::plan_files(&settings)?;

    for (index, file) in files.iter().enumerate() {
        println!(
            "[{}/{}] {} -> {}",
            index + 1,
            files.len(),
            file.url,
            file.object_name
        );
    }
    Ok(0)
}

#[tokio::main]
async fn main() {
    let matches = Command::new("NYC Trip Data Ingestion")
        .version("1.0")
        .about("Downloads NYC TLC trip files and uploads them to a bucket")
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("ingest")
                .about("Download, decompress and upload every configured file")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("List the files a run would fetch and upload")
                .arg(config_arg()),
        )
        .get_matches();

    init_tracing(matches.get_flag("json-logs"));

    let result = match matches.subcommand() {
        Some(("ingest", ingest_matches)) => run_ingest(config_path(ingest_matches)).await,
        Some(("plan", plan_matches)) => print_plan(config_path(plan_matches)),
        _ => {
            eprintln!("Please specify a valid subcommand. Use --help for usage information.");
            process::exit(1);
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}
