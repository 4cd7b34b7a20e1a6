use std::fs;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use allocation_survey::config::{write_auth_record, DEFAULT_PBKDF2_ITERATIONS};
use allocation_survey::{init_logging, AdminGate, AdminPanel, AuthRecord, ResponseStore, SurveyConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "survey-admin", version, about = "Owner tools for the allocation survey")]
struct Cli {
    /// Survey data directory. Falls back to SURVEY_DATA_DIR, then the current directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Admin key for the read commands.
    #[arg(long, env = "SURVEY_ADMIN_INPUT", hide_env_values = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new admin key in admin.json, read from stdin.
    SetKey {
        #[arg(long, default_value_t = DEFAULT_PBKDF2_ITERATIONS)]
        iterations: u32,
    },
    /// Print the admin report as JSON.
    Report,
    /// Copy responses.csv unmodified.
    ExportMaster { out: PathBuf },
    /// Write every per-submission file into one .tar.gz.
    ExportArchive { out: PathBuf },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = match cli.data_dir {
        Some(dir) => SurveyConfig::resolve_pinned_with(dir, |name| std::env::var(name).ok()),
        None => SurveyConfig::resolve("."),
    };
    let key = cli.key.unwrap_or_default();

    match cli.command {
        Command::SetKey { iterations } => {
            let key = read_key_from_stdin()?;
            let record = AuthRecord::create(key.as_str(), Some(iterations));
            let path =
                write_auth_record(config.data_dir.as_path(), &record).map_err(|err| err.to_string())?;
            println!("admin key written to {}", path.display());
        }
        Command::Report => {
            let report = unlock_panel(config, key.as_str())?.report();
            let text = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
            println!("{text}");
        }
        Command::ExportMaster { out } => {
            let bytes = unlock_panel(config, key.as_str())?
                .master_bytes()
                .map_err(|err| err.to_string())?;
            fs::write(out.as_path(), bytes).map_err(|err| err.to_string())?;
            println!("wrote {}", out.display());
        }
        Command::ExportArchive { out } => {
            let bytes = unlock_panel(config, key.as_str())?
                .submissions_archive()
                .map_err(|err| err.to_string())?;
            fs::write(out.as_path(), bytes).map_err(|err| err.to_string())?;
            println!("wrote {}", out.display());
        }
    }
    Ok(())
}

fn unlock_panel(config: SurveyConfig, key: &str) -> Result<AdminPanel, String> {
    let gate = AdminGate::new(config.admin_secret);
    if let Some(hint) = gate.hint() {
        return Err(hint);
    }
    if !gate.unlock(key) {
        return Err("invalid admin key".to_string());
    }
    Ok(AdminPanel::new(ResponseStore::new(config.data_dir)))
}

fn read_key_from_stdin() -> Result<String, String> {
    eprintln!("enter the new admin key:");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| err.to_string())?;
    let key = line.trim_end_matches(['\r', '\n']).to_string();
    if key.is_empty() {
        return Err("admin key is required".to_string());
    }
    Ok(key)
}
