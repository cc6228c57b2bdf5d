//! `vncplay check`: dry run over a script tree.
use vncplay_core::api as core_api;
use vncplay_core::api::{check_script, StandardGrammar};

use crate::commands::cli::CheckArgs;

/// Exit code when the script tree has problems.
pub const EXIT_SCRIPT_PROBLEMS: i32 = 1;

pub fn handle_check(args: CheckArgs, cfg: &core_api::AppConfig) -> Result<i32, core_api::CliError> {
    if !args.script.exists() {
        return Err(core_api::CliError::Command(format!(
            "script not found: {}",
            args.script.display()
        )));
    }

    let report = check_script(&args.script, &StandardGrammar, cfg.playback.max_depth);
    for p in &report.problems {
        println!("{}:{}: {}", p.file.display(), p.line, p.message);
    }

    let summary = serde_json::json!({
        "files": report.files,
        "directives": report.directives,
        "total_delay_ms": report.total_delay.as_millis() as u64,
        "problems": report.problems.len(),
    });
    println!("{summary}");

    Ok(if report.is_clean() {
        0
    } else {
        EXIT_SCRIPT_PROBLEMS
    })
}
