use tracing::Level;

/// Destination for probe diagnostics.
///
/// The probe reports every state transition and failure as a severity plus a
/// rendered message. Severity matters operationally: a failed command-byte
/// restore is WARN even though the probe itself still reached a conclusion,
/// because the controller may have been left misconfigured for other users.
pub trait DiagSink {
    fn event(&mut self, level: Level, message: &str);
}

/// Default sink: forwards everything to the `tracing` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagSink for TracingSink {
    fn event(&mut self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!("{message}");
        } else if level == Level::WARN {
            tracing::warn!("{message}");
        } else if level == Level::INFO {
            tracing::info!("{message}");
        } else if level == Level::DEBUG {
            tracing::debug!("{message}");
        } else {
            tracing::trace!("{message}");
        }
    }
}
