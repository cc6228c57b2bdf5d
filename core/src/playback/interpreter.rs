use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::PlaybackError;
use crate::event::{Directive, Signal, WireEvent};
use crate::script::{classify, parse_delay, resolve_include, script_duration, ScriptLine};

use super::scope::FileScope;
use super::session::Playback;
use super::sync::Synchronizer;

/// How interpretation of a file ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Finished,
    /// The signal channel closed; every enclosing file unwinds too.
    Aborted,
}

pub(crate) struct Interpreter {
    session: Arc<Playback>,
    signals: mpsc::UnboundedReceiver<Signal>,
    out: mpsc::Sender<WireEvent>,
    sync: Synchronizer,
}

impl Interpreter {
    pub fn new(
        session: Arc<Playback>,
        signals: mpsc::UnboundedReceiver<Signal>,
        out: mpsc::Sender<WireEvent>,
        sync: Synchronizer,
    ) -> Self {
        Self {
            session,
            signals,
            out,
            sync,
        }
    }

    pub async fn run(&mut self, path: &Path) -> Result<Outcome, PlaybackError> {
        self.play_file(None, path.to_path_buf()).await
    }

    fn play_file(
        &mut self,
        parent: Option<PathBuf>,
        file: PathBuf,
    ) -> BoxFuture<'_, Result<Outcome, PlaybackError>> {
        async move {
            let path = resolve_include(parent.as_deref(), &file);
            let _scope = FileScope::enter(&self.session, &path)?;

            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| PlaybackError::Script {
                    path: path.clone(),
                    source,
                })?;
            self.session.add_remaining(script_duration(&content));
            tracing::debug!(playback = %self.session.id(), file = %path.display(), "playing file");

            for raw in content.lines() {
                let (delay, text) = match classify(raw) {
                    Ok(ScriptLine::Entry { delay, text }) => (delay, text),
                    Ok(ScriptLine::Blank) => continue,
                    Ok(ScriptLine::Comment(comment)) => {
                        tracing::info!(playback = %self.session.id(), "playback: {comment}");
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!(error.kind = "script.malformed_line", error.message = %e);
                        continue;
                    }
                };

                let directive = match self.session.grammar().parse(text) {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::error!(
                            error.kind = "script.parse_failed",
                            error.message = %e,
                            line = %text,
                            "invalid vnc message"
                        );
                        continue;
                    }
                };

                self.session.set_step(raw);

                let delay = match parse_delay(delay) {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::error!(error.kind = "script.bad_delay", error.message = %e);
                        continue;
                    }
                };

                if self.wait(&path, delay).await? == Outcome::Aborted
                    || self.act(&path, directive).await? == Outcome::Aborted
                {
                    tracing::info!(
                        playback = %self.session.id(),
                        "abort playback of {} due to signal",
                        path.display()
                    );
                    return Ok(Outcome::Aborted);
                }
            }

            Ok(Outcome::Finished)
        }
        .boxed()
    }

    /// Wait out `delay`, servicing control signals as they arrive.
    ///
    /// Returns `Finished` when the directive should be acted on now.
    async fn wait(&mut self, file: &Path, mut delay: Duration) -> Result<Outcome, PlaybackError> {
        loop {
            let started = Instant::now();
            let signal = tokio::select! {
                biased;
                signal = self.signals.recv() => signal.unwrap_or(Signal::Stop),
                _ = tokio::time::sleep(delay) => {
                    self.session.sub_remaining(delay);
                    return Ok(Outcome::Finished);
                }
            };

            // an interrupted wait credits what was waited back onto remaining
            let waited = started.elapsed().min(delay);
            self.session.add_remaining(waited);
            delay -= waited;

            match signal {
                Signal::Stop => return Ok(Outcome::Aborted),
                Signal::Step => {
                    self.session.sub_remaining(delay);
                    return Ok(Outcome::Finished);
                }
                Signal::Pause => {
                    tracing::debug!(playback = %self.session.id(), remaining = ?delay, "paused");
                    match self.signals.recv().await.unwrap_or(Signal::Stop) {
                        Signal::Play => {}
                        Signal::Stop => return Ok(Outcome::Aborted),
                        other => tracing::error!(
                            playback = %self.session.id(),
                            signal = other.name(),
                            "unexpected signal"
                        ),
                    }
                }
                Signal::LoadFile(load) => {
                    if self.play_file(Some(file.to_path_buf()), load.path).await?
                        == Outcome::Aborted
                    {
                        return Ok(Outcome::Aborted);
                    }
                }
                Signal::WaitForIt(wait) => self.sync.wait_for_it(&wait).await?,
                Signal::Play => tracing::error!(
                    playback = %self.session.id(),
                    signal = "play",
                    "unexpected signal"
                ),
            }
        }
    }

    async fn act(&mut self, file: &Path, directive: Directive) -> Result<Outcome, PlaybackError> {
        match directive {
            Directive::Wire(event) => {
                self.out
                    .send(event)
                    .await
                    .map_err(|_| PlaybackError::OutboundClosed)?;
                Ok(Outcome::Finished)
            }
            Directive::LoadFile(load) => self.play_file(Some(file.to_path_buf()), load.path).await,
            Directive::WaitForIt(wait) => {
                self.sync.wait_for_it(&wait).await?;
                Ok(Outcome::Finished)
            }
        }
    }
}
