use std::process::ExitCode;

use catalysis::commands;
use catalysis::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load configuration first (for log level)
    let (config, command) = match Config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    // Diagnostics on stderr; stdout carries only command output
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::debug!(
        api_url = %config.api_url,
        idp_url = %config.idp_url,
        queries_dir = %config.queries_dir.display(),
        "Configuration loaded"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match commands::run(&config, command, &mut out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
