use vncplay_core::api::{AppConfig, DisplayConnector, PlaybackDeps};

use crate::rfb::RfbConnector;

pub fn build_connector(cfg: &AppConfig) -> Box<dyn DisplayConnector> {
    Box::new(RfbConnector::new(cfg.connection.clone()))
}

/// Grammar, screenshot sink and frame matcher for a playback session.
pub fn build_deps(cfg: &AppConfig) -> PlaybackDeps {
    PlaybackDeps::standard(&cfg.playback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_rfb_connector() {
        let cfg = AppConfig::default();
        assert_eq!(build_connector(&cfg).name(), "rfb");
    }
}
