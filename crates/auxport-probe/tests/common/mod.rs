use auxport_probe::DiagSink;
use tracing::Level;

/// Sink that keeps every diagnostic for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<(Level, String)>,
}

impl RecordingSink {
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.events
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl DiagSink for RecordingSink {
    fn event(&mut self, level: Level, message: &str) {
        self.events.push((level, message.to_string()));
    }
}
