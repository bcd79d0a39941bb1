use auxport_kbdc::{
    AuxTestResponse, CommandByte, Kbdc, KbdcConfig, KbdcError, KbdcSession,
};
use thiserror::Error;
use tracing::Level;

use crate::classify::{classify, AuxPortStatus, AuxTestPolicy};
use crate::diag::DiagSink;

/// Terminal failures of one probe attempt. None of these are retried
/// internally; the caller decides whether another attempt is worth it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The controller lock is held by another session.
    #[error("controller is held by another session")]
    Busy,

    /// The pre-probe command byte could not be read. The controller was not
    /// mutated, so nothing needed restoring.
    #[error("unable to read the controller command byte: {0}")]
    CaptureFailed(#[source] KbdcError),

    /// The probe configuration could not be written.
    #[error("unable to write the controller command byte: {0}")]
    WriteFailed(#[source] KbdcError),

    /// Controller traffic failed after the configuration was already changed.
    #[error("controller stopped responding mid-probe: {0}")]
    Io(#[source] KbdcError),
}

/// Probes the aux channel for a functioning pointing device.
///
/// Runs entirely under the controller lock: capture the command byte, disable
/// the keyboard channel, enable the aux channel with its interrupt masked (so
/// nothing fires asynchronously mid-probe), run the interface test and
/// classify the answer per `policy`.
///
/// Recovery contract: the captured command byte is written back on every path
/// except `Ok(Present)` — a detected device intentionally leaves the aux
/// channel enabled for the attach step. The lock is released on every path
/// when the session guard drops.
pub fn probe_aux_port(
    kbdc: &Kbdc,
    policy: &AuxTestPolicy,
    diag: &mut dyn DiagSink,
) -> Result<AuxPortStatus, ProbeError> {
    let config = kbdc.config();
    let mut session = kbdc.lock().map_err(|_| {
        diag.event(Level::ERROR, "unable to lock the controller");
        ProbeError::Busy
    })?;

    // Stale bytes from earlier traffic would be misread as our replies.
    session.drain_buffers(config.drain_iterations);

    let saved = match session.read_command_byte() {
        Ok(byte) => byte,
        Err(err) => {
            diag.event(
                Level::ERROR,
                &format!("unable to get the current command byte value: {err}"),
            );
            // The controller was never written; leave it exactly as found.
            return Err(ProbeError::CaptureFailed(err));
        }
    };
    diag.event(
        Level::DEBUG,
        &format!("current command byte {:#04x}", saved.bits()),
    );

    let outcome = probe_locked(&mut session, config, policy, diag);

    // Single restore decision point: every outcome except a detected device
    // puts the controller back the way we found it.
    if !matches!(outcome, Ok(AuxPortStatus::Present)) && !session.restore_command_byte(saved) {
        diag.event(
            Level::WARN,
            "failed to restore the controller command byte",
        );
    }

    outcome
}

/// Probe steps that run after the command byte has been captured. Every error
/// return flows through the restore step in [`probe_aux_port`].
fn probe_locked(
    session: &mut KbdcSession<'_>,
    config: KbdcConfig,
    policy: &AuxTestPolicy,
    diag: &mut dyn DiagSink,
) -> Result<AuxPortStatus, ProbeError> {
    // Disable the keyboard channel while probing and open the aux channel's
    // clock, keeping both interrupts masked: the probe polls for its replies
    // and must not trigger asynchronous delivery.
    session
        .write_command_byte(
            CommandByte::CHANNEL_CONTROL,
            CommandByte::KBD_CLOCK_DISABLE,
        )
        .map_err(|err| {
            diag.event(Level::ERROR, &format!("unable to send the command byte: {err}"));
            ProbeError::WriteFailed(err)
        })?;
    diag.event(Level::DEBUG, "keyboard channel disabled, aux clock enabled");

    // Some controllers also want the explicit enable command before they
    // answer interface tests. Idempotent; the test below is authoritative.
    if let Err(err) = session.enable_aux_port() {
        diag.event(Level::DEBUG, &format!("enable-aux command not accepted: {err}"));
    }

    session.drain_buffers(config.drain_iterations);
    let response = session.test_aux_port().map_err(|err| {
        diag.event(
            Level::ERROR,
            &format!("controller rejected the aux interface test: {err}"),
        );
        ProbeError::Io(err)
    })?;

    let status = classify(policy, response);
    match (status, response) {
        (AuxPortStatus::Present, AuxTestResponse::Code(code)) if code != 0 => {
            diag.event(
                Level::DEBUG,
                &format!("strange aux test result {code:#04x}, tolerated"),
            );
        }
        (AuxPortStatus::Present, _) => {
            diag.event(Level::DEBUG, "aux port test passed");
        }
        (AuxPortStatus::Absent, _) => {
            diag.event(
                Level::DEBUG,
                &format!("the aux port is not functioning ({response:?})"),
            );
            // Whatever the controller was choking on, don't leave it queued.
            session.drain_buffers(config.drain_iterations);
        }
    }
    Ok(status)
}
