use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use deeptrace::config::Config;
use deeptrace::db::SharedDatabase;
use deeptrace::Scanner;

const USAGE: &str = "usage: deeptrace <wallet> [chain] [--revoke]\n       deeptrace --logs";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("deeptrace=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let revoke = args.iter().any(|a| a == "--revoke");
    let show_logs = args.iter().any(|a| a == "--logs");
    let mut positional = args.iter().filter(|a| !a.starts_with("--"));
    let wallet = positional.next();
    let chain = positional.next().map(String::as_str).unwrap_or("ETH");

    let config = Config::load("config.toml");

    if show_logs {
        return print_logs(&config);
    }

    let Some(wallet) = wallet else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let scanner = match Scanner::new(&config) {
        Ok(scanner) => scanner,
        Err(e) => {
            eprintln!("error: failed to initialize chain adapters: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = if revoke {
        scanner.revoke_check(wallet, chain).await
    } else {
        scanner.deep_scan(wallet, chain).await
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if revoke {
        // Best-effort log append; a persistence failure never fails the scan.
        match open_log_db(&config) {
            Ok(db) => {
                if let Err(e) = db.append_scan(&report.wallet, &report.chain, report.approvals.len())
                {
                    tracing::warn!("scan log write failed: {e}");
                }
            }
            Err(e) => tracing::warn!("scan log unavailable: {e}"),
        }
    }

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: failed to serialize report: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn open_log_db(config: &Config) -> Result<SharedDatabase, Box<dyn std::error::Error>> {
    let path = Path::new(&config.database.path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SharedDatabase::open(path)?)
}

fn print_logs(config: &Config) -> ExitCode {
    match open_log_db(config).and_then(|db| Ok(db.all_scans()?)) {
        Ok(logs) => match serde_json::to_string_pretty(&logs) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to serialize logs: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: failed to read scan logs: {e}");
            ExitCode::FAILURE
        }
    }
}
