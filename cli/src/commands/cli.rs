use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vncplay", version, about = "Replay scripted input against a VNC server")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to a display and play a script, taking operator commands on stdin.
    Play(PlayArgs),
    /// Walk a script tree and report problems without connecting.
    Check(CheckArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlayArgs {
    /// `host`, `host:display` or `host:port`.
    pub host: String,

    pub script: PathBuf,

    /// Session id shown by `info`; generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    /// Directory for WaitForIt screenshots.
    #[arg(long)]
    pub screenshot_dir: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CheckArgs {
    pub script: PathBuf,
}
