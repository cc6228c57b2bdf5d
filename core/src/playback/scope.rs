use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PlaybackError;

use super::session::Playback;

/// Marks a script file as open for the lifetime of the guard.
///
/// Dropping the guard restores the parent file and the include depth, on
/// every exit path of the interpreter.
pub(crate) struct FileScope {
    session: Arc<Playback>,
    parent: Option<PathBuf>,
}

impl FileScope {
    pub fn enter(session: &Arc<Playback>, path: &Path) -> Result<Self, PlaybackError> {
        let (depth, parent) = session.push_file(path);
        let scope = Self {
            session: Arc::clone(session),
            parent,
        };

        let cfg = session.config();
        if depth > cfg.warn_depth {
            tracing::warn!(
                playback = %session.id(),
                depth,
                file = %path.display(),
                "recursive LoadFiles detected in vnc playback"
            );
        }
        if depth > cfg.max_depth {
            return Err(PlaybackError::RecursionLimit { depth });
        }
        Ok(scope)
    }
}

impl Drop for FileScope {
    fn drop(&mut self) {
        self.session.pop_file(self.parent.take());
    }
}
