use tracing::info;

/// Plays synthesized reply audio. Fire-and-forget: implementations must not block.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, url: &str);
}

/// Player that only records the request in the log, for headless runs
#[derive(Debug, Default)]
pub struct LogPlayer;

impl AudioPlayer for LogPlayer {
    fn play(&self, url: &str) {
        info!("Playing reply audio: {}", url);
    }
}
