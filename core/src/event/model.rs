use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Client-to-server message written verbatim to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    Key { down: bool, keysym: u32 },
    /// Press immediately followed by release.
    KeyTap { keysym: u32 },
    Pointer { mask: u8, x: u16, y: u16 },
    FramebufferRequest {
        incremental: bool,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },
}

impl fmt::Display for WireEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { down, keysym } => write!(f, "KeyEvent,{down},{keysym:#x}"),
            Self::KeyTap { keysym } => write!(f, "KeyTap,{keysym:#x}"),
            Self::Pointer { mask, x, y } => write!(f, "PointerEvent,{mask},{x},{y}"),
            Self::FramebufferRequest {
                incremental,
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "FramebufferUpdateRequest,{incremental},{x},{y},{width},{height}"
            ),
        }
    }
}

/// Nested script to splice in at the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFile {
    pub path: PathBuf,
}

/// Synchronization point: block until the display produces a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitForIt {
    pub reference: String,
    pub timeout: Duration,
}

/// One parsed script unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Wire(WireEvent),
    LoadFile(LoadFile),
    WaitForIt(WaitForIt),
}

impl From<WireEvent> for Directive {
    fn from(e: WireEvent) -> Self {
        Self::Wire(e)
    }
}

/// Control-plane message consumed by the interpreter mid-wait.
///
/// `Stop` is never sent; the interpreter synthesizes it when the channel closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Play,
    Pause,
    Step,
    LoadFile(LoadFile),
    WaitForIt(WaitForIt),
    Stop,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Step => "step",
            Self::LoadFile(_) => "load_file",
            Self::WaitForIt(_) => "wait_for_it",
            Self::Stop => "stop",
        }
    }
}
