use clap::Parser;
mod commands;
use commands::cli;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vncplay_core::api as core_api;
use vncplay_core::api::{CliError, ErrorKind};

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = match args.config.as_deref() {
        Some(path) => core_api::load_from_path(path),
        None => core_api::load_default(),
    }
    .map_err(|e| CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    dispatch(args.command, &cfg).await
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: connection / IO error
    // 30: playback failure
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Playback(pe) => match pe.kind() {
            ErrorKind::ConnectionWriteFailure | ErrorKind::ConnectionReadFailure => 20,
            ErrorKind::Io => 20,
            _ => 30,
        },
        CliError::Io(_) => 20,
        CliError::Command(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

async fn dispatch(cmd: cli::Commands, cfg: &core_api::AppConfig) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Play(play_args) => commands::play::handle_play(play_args, cfg).await,
        cli::Commands::Check(check_args) => commands::check::handle_check(check_args, cfg),
    }
}

fn init_tracing(logging: &core_api::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("vncplay"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("vncplay.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vncplay_core::api::PlaybackError;

    #[test]
    fn maps_errors_to_exit_codes() {
        assert_eq!(exit_code_for_error(&CliError::Config("bad".into())), 11);
        assert_eq!(
            exit_code_for_error(&CliError::Playback(PlaybackError::RecursionLimit {
                depth: 101
            })),
            30
        );
        assert_eq!(
            exit_code_for_error(&CliError::Playback(PlaybackError::OutboundClosed)),
            20
        );
        assert_eq!(
            exit_code_for_error(&CliError::Anyhow(anyhow::anyhow!("boom"))),
            50
        );
    }
}
