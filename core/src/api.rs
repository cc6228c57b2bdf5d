//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `vncplay_core::api` instead of reaching into internal modules.

pub use crate::capture::{AnyFrame, FrameMatcher, FrameSink, PngFrameSink, ScreenshotSlot};
pub use crate::config::{
    get_vncplay_data_dir, load_default, load_from_path, AppConfig, ConnectionConfig, LoggingConfig,
    PlaybackConfig,
};
pub use crate::connection::{
    DisplayConnection, DisplayConnector, Encoding, MessageReader, MessageWriter,
};
pub use crate::error::{
    CliError, ConnectionError, ErrorKind, GrammarError, LastError, LineError, PlaybackError,
};
pub use crate::event::{
    Directive, Frame, FramebufferUpdate, LoadFile, Rectangle, ServerMessage, Signal, WaitForIt,
    WireEvent,
};
pub use crate::playback::{Playback, PlaybackDeps, PlaybackInfo, PlaybackState};
pub use crate::script::{
    check_script, DirectiveParser, ScriptLine, ScriptProblem, ScriptReport, StandardGrammar,
};
