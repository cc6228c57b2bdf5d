//! `vncplay play`: drive one playback session from the terminal.
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use vncplay_core::api as core_api;
use vncplay_core::api::{Playback, PlaybackError};
use vncplay_plugins::factory;

use crate::commands::cli::PlayArgs;

/// Exit code when the session ended on a fatal error.
pub const EXIT_PLAYBACK_FAILED: i32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Pause,
    Continue,
    Step,
    Stop,
    Info,
    Event,
    Inject(String),
}

impl OperatorCommand {
    /// `Ok(None)` for blank input.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        let cmd = match word.to_ascii_lowercase().as_str() {
            "pause" | "p" => Self::Pause,
            "continue" | "resume" | "c" => Self::Continue,
            "step" | "s" => Self::Step,
            "stop" | "q" => Self::Stop,
            "info" | "i" => Self::Info,
            "event" | "e" => Self::Event,
            "inject" => {
                if rest.is_empty() {
                    return Err("inject needs a directive".to_string());
                }
                Self::Inject(rest.to_string())
            }
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(Some(cmd))
    }
}

fn session_id(args: &PlayArgs) -> String {
    args.id.clone().unwrap_or_else(|| {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        format!("play-{}", &uuid[..8])
    })
}

pub async fn handle_play(
    args: PlayArgs,
    cfg: &core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    let mut playback_cfg = cfg.playback.clone();
    if let Some(dir) = args.screenshot_dir.clone() {
        playback_cfg.screenshot_dir = dir;
    }
    let mut deps_cfg = cfg.clone();
    deps_cfg.playback = playback_cfg.clone();

    let connector = factory::build_connector(cfg);
    let deps = factory::build_deps(&deps_cfg);
    let session = Playback::open(
        session_id(&args),
        args.host.clone(),
        connector.as_ref(),
        playback_cfg,
        deps,
    )
    .await?;

    session.start(&args.script).await?;
    eprintln!(
        "playing {} on {} as {}",
        args.script.display(),
        session.host(),
        session.id()
    );

    let operator = tokio::spawn(operator_loop(Arc::clone(&session)));
    session.wait().await;
    operator.abort();

    match session.last_error() {
        None => Ok(0),
        Some(err) => {
            eprintln!("playback failed ({}): {}", err.kind.as_str(), err.message);
            Ok(EXIT_PLAYBACK_FAILED)
        }
    }
}

async fn operator_loop(session: Arc<Playback>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error.kind = "cli.stdin", error.message = %e);
                break;
            }
        };
        let cmd = match OperatorCommand::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };
        match apply(&session, cmd).await {
            Ok(Some(out)) => println!("{out}"),
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
}

async fn apply(session: &Playback, cmd: OperatorCommand) -> Result<Option<String>, PlaybackError> {
    match cmd {
        OperatorCommand::Pause => session.pause()?,
        OperatorCommand::Continue => session.resume()?,
        OperatorCommand::Step => session.step()?,
        OperatorCommand::Stop => session.stop()?,
        OperatorCommand::Info => {
            let info = session.info();
            let line = match info.row() {
                Some(row) => row.join("\t"),
                None => format!("{}\tclosed", info.id),
            };
            return Ok(Some(line));
        }
        OperatorCommand::Event => return session.get_step().map(Some),
        OperatorCommand::Inject(text) => session.inject(&text).await?,
    }
    Ok(None)
}
