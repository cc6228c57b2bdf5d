mod model;
mod server;

pub use model::{Directive, LoadFile, Signal, WaitForIt, WireEvent};
pub use server::{Frame, FramebufferUpdate, Rectangle, ServerMessage};
