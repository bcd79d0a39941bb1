use std::sync::{Arc, Mutex, MutexGuard};

use auxport_pc_constants::cmd;

use crate::bus::KbdcBus;
use crate::error::{KbdcError, Result};
use crate::regs::{CommandByte, StatusFlags};

/// Retry and drain bounds for controller I/O.
///
/// Every wait is a bounded poll of the status register; `retries` is the
/// number of polls before an operation reports [`KbdcError::Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KbdcConfig {
    /// Status polls per wait before giving up.
    pub retries: u32,
    /// Iteration bound for [`KbdcSession::drain_buffers`] callers that use
    /// the default.
    pub drain_iterations: u32,
}

impl Default for KbdcConfig {
    fn default() -> Self {
        Self {
            retries: 5000,
            drain_iterations: 10,
        }
    }
}

/// Outcome of the aux interface test command.
///
/// A read-side timeout is a result, not an error: controllers without an aux
/// port are expected to simply never answer, and the classifier treats that
/// as "port absent". Only a write-side failure (the controller never accepts
/// the command) surfaces as [`KbdcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxTestResponse {
    /// The controller answered with a result code.
    Code(u8),
    /// The controller accepted the command but never produced a result.
    Timeout,
}

struct KbdcState {
    bus: Box<dyn KbdcBus>,
    /// Last command byte we read or successfully wrote. `None` after a failed
    /// write, when the register's real content is unknown.
    last_command_byte: Option<CommandByte>,
}

/// Shared handle to one controller. Clones refer to the same controller and
/// contend for the same lock.
#[derive(Clone)]
pub struct Kbdc {
    state: Arc<Mutex<KbdcState>>,
    config: KbdcConfig,
}

impl Kbdc {
    pub fn new(bus: Box<dyn KbdcBus>) -> Self {
        Self::with_config(bus, KbdcConfig::default())
    }

    pub fn with_config(bus: Box<dyn KbdcBus>, config: KbdcConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(KbdcState {
                bus,
                last_command_byte: None,
            })),
            config,
        }
    }

    pub fn config(&self) -> KbdcConfig {
        self.config
    }

    /// Acquires exclusive access to the controller.
    ///
    /// Fails immediately with [`KbdcError::Busy`] when another session is
    /// live; callers that want to wait retry at their own level. The returned
    /// guard releases the controller when dropped, on every path.
    pub fn lock(&self) -> Result<KbdcSession<'_>> {
        let state = self.state.try_lock().map_err(|_| KbdcError::Busy)?;
        Ok(KbdcSession {
            state,
            config: self.config,
        })
    }
}

/// Exclusive controller session. All byte-level traffic happens here.
pub struct KbdcSession<'a> {
    state: MutexGuard<'a, KbdcState>,
    config: KbdcConfig,
}

impl KbdcSession<'_> {
    fn status(&mut self) -> StatusFlags {
        StatusFlags::from_bits_retain(self.state.bus.read_status())
    }

    /// Polls until the controller has consumed the previous write.
    fn wait_input_empty(&mut self) -> Result<()> {
        for _ in 0..self.config.retries {
            if !self.status().contains(StatusFlags::INPUT_FULL) {
                return Ok(());
            }
        }
        Err(KbdcError::Timeout {
            polls: self.config.retries,
        })
    }

    /// Polls until the output buffer holds a byte.
    fn wait_output_full(&mut self) -> Result<()> {
        for _ in 0..self.config.retries {
            if self.status().contains(StatusFlags::OUTPUT_FULL) {
                return Ok(());
            }
        }
        Err(KbdcError::Timeout {
            polls: self.config.retries,
        })
    }

    /// Issues a raw controller command.
    pub fn write_command(&mut self, command: u8) -> Result<()> {
        self.wait_input_empty()?;
        self.state.bus.write_command(command);
        Ok(())
    }

    /// Writes a data byte (the argument of a two-byte command).
    pub fn write_data(&mut self, data: u8) -> Result<()> {
        self.wait_input_empty()?;
        self.state.bus.write_data(data);
        Ok(())
    }

    /// Reads one byte from the output buffer.
    pub fn read_data(&mut self) -> Result<u8> {
        self.wait_output_full()?;
        Ok(self.state.bus.read_data())
    }

    /// Discards stale queued output, bounded by `max_iterations` so a stuck
    /// controller cannot wedge the caller.
    pub fn drain_buffers(&mut self, max_iterations: u32) {
        for _ in 0..max_iterations {
            if !self.status().contains(StatusFlags::OUTPUT_FULL) {
                break;
            }
            let _ = self.state.bus.read_data();
        }
    }

    /// Reads the command byte and refreshes the last-known cache.
    pub fn read_command_byte(&mut self) -> Result<CommandByte> {
        self.write_command(cmd::READ_COMMAND_BYTE)?;
        let value = CommandByte::from_bits_retain(self.read_data()?);
        self.state.last_command_byte = Some(value);
        Ok(value)
    }

    /// Rewrites the bits selected by `mask` to `value`, leaving the rest of
    /// the register as-is.
    ///
    /// The merge uses the last-known command byte when one is cached, reading
    /// the register first otherwise. A failed write leaves the cache cleared:
    /// the register's real content is unknown until the next read.
    pub fn write_command_byte(&mut self, mask: CommandByte, value: CommandByte) -> Result<()> {
        let merged = if mask == CommandByte::FULL_MASK {
            // Full rewrite needs no merge; keep this path free of reads so a
            // restore still goes through on a controller that stopped
            // answering read commands.
            value
        } else {
            let current = match self.state.last_command_byte {
                Some(byte) => byte,
                None => self.read_command_byte()?,
            };
            current.merged(mask, value)
        };
        self.state.last_command_byte = None;
        self.write_command(cmd::WRITE_COMMAND_BYTE)?;
        self.write_data(merged.bits())?;
        self.state.last_command_byte = Some(merged);
        Ok(())
    }

    /// Enables the aux channel clock via the dedicated controller command.
    pub fn enable_aux_port(&mut self) -> Result<()> {
        self.write_command(cmd::ENABLE_AUX_PORT)
    }

    /// Disables the aux channel clock.
    pub fn disable_aux_port(&mut self) -> Result<()> {
        self.write_command(cmd::DISABLE_AUX_PORT)
    }

    /// Runs the aux interface test and returns the raw outcome.
    pub fn test_aux_port(&mut self) -> Result<AuxTestResponse> {
        self.write_command(cmd::TEST_AUX_PORT)?;
        match self.read_data() {
            Ok(code) => Ok(AuxTestResponse::Code(code)),
            Err(KbdcError::Timeout { .. }) => Ok(AuxTestResponse::Timeout),
            Err(other) => Err(other),
        }
    }

    /// Best-effort rewrite of the command byte to a previously captured
    /// snapshot.
    ///
    /// Drains before the write and drains again afterwards regardless of the
    /// write's result: a partially applied write can leave stale bytes in
    /// flight. Returns `false` instead of an error so recovery paths can
    /// log-and-continue.
    pub fn restore_command_byte(&mut self, saved: CommandByte) -> bool {
        let drain = self.config.drain_iterations;
        self.drain_buffers(drain);
        let ok = self
            .write_command_byte(CommandByte::FULL_MASK, saved)
            .is_ok();
        self.drain_buffers(drain);
        ok
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use auxport_pc_constants::cmd;

    use super::*;

    #[derive(Default)]
    struct ScriptedState {
        status: u8,
        data: VecDeque<u8>,
        commands: Vec<u8>,
        writes: Vec<u8>,
    }

    /// Minimal scripted bus for unit-level checks; clones share state so the
    /// test keeps a handle after boxing one into the controller. The
    /// behavioral simulator for probe tests lives in `auxport-testkit`.
    #[derive(Clone, Default)]
    struct ScriptedBus {
        state: Arc<Mutex<ScriptedState>>,
    }

    impl ScriptedBus {
        fn with_status(status: StatusFlags) -> Self {
            let bus = Self::default();
            bus.state.lock().unwrap().status = status.bits();
            bus
        }

        fn queue_data(&self, bytes: &[u8]) {
            self.state.lock().unwrap().data.extend(bytes);
        }

        fn commands(&self) -> Vec<u8> {
            self.state.lock().unwrap().commands.clone()
        }

        fn writes(&self) -> Vec<u8> {
            self.state.lock().unwrap().writes.clone()
        }

        fn queued(&self) -> usize {
            self.state.lock().unwrap().data.len()
        }
    }

    impl KbdcBus for ScriptedBus {
        fn read_status(&mut self) -> u8 {
            let state = self.state.lock().unwrap();
            let mut status = state.status;
            if !state.data.is_empty() {
                status |= StatusFlags::OUTPUT_FULL.bits();
            }
            status
        }

        fn read_data(&mut self) -> u8 {
            self.state.lock().unwrap().data.pop_front().unwrap_or(0)
        }

        fn write_command(&mut self, command: u8) {
            self.state.lock().unwrap().commands.push(command);
        }

        fn write_data(&mut self, data: u8) {
            self.state.lock().unwrap().writes.push(data);
        }
    }

    fn kbdc_with(bus: &ScriptedBus, retries: u32) -> Kbdc {
        Kbdc::with_config(
            Box::new(bus.clone()),
            KbdcConfig {
                retries,
                ..KbdcConfig::default()
            },
        )
    }

    #[test]
    fn second_lock_fails_busy_until_first_session_drops() {
        let kbdc = kbdc_with(&ScriptedBus::default(), 16);
        let session = kbdc.lock().unwrap();
        assert_eq!(kbdc.lock().err(), Some(KbdcError::Busy));
        drop(session);
        assert!(kbdc.lock().is_ok());
    }

    #[test]
    fn write_times_out_after_exactly_the_configured_polls() {
        let bus = ScriptedBus::with_status(StatusFlags::INPUT_FULL);
        let kbdc = kbdc_with(&bus, 7);
        let mut session = kbdc.lock().unwrap();
        assert_eq!(
            session.write_command(cmd::ENABLE_AUX_PORT),
            Err(KbdcError::Timeout { polls: 7 })
        );
    }

    #[test]
    fn read_command_byte_issues_read_then_consumes_reply() {
        let bus = ScriptedBus::default();
        bus.queue_data(&[0x65]);
        let kbdc = kbdc_with(&bus, 16);
        let mut session = kbdc.lock().unwrap();
        let byte = session.read_command_byte().unwrap();
        assert_eq!(byte.bits(), 0x65);
        assert_eq!(bus.commands(), vec![cmd::READ_COMMAND_BYTE]);
    }

    #[test]
    fn masked_write_reads_current_value_when_cache_is_cold() {
        let bus = ScriptedBus::default();
        bus.queue_data(&[0x45]);
        let kbdc = kbdc_with(&bus, 16);
        let mut session = kbdc.lock().unwrap();
        session
            .write_command_byte(
                CommandByte::CHANNEL_CONTROL,
                CommandByte::KBD_CLOCK_DISABLE,
            )
            .unwrap();
        // 0x45 with channel bits replaced by 0x10: 0x45 & !0x33 = 0x44, | 0x10.
        assert_eq!(bus.writes(), vec![0x54]);
        assert_eq!(
            bus.commands(),
            vec![cmd::READ_COMMAND_BYTE, cmd::WRITE_COMMAND_BYTE]
        );
    }

    #[test]
    fn masked_write_uses_the_cache_once_warm() {
        let bus = ScriptedBus::default();
        bus.queue_data(&[0x45]);
        let kbdc = kbdc_with(&bus, 16);
        let mut session = kbdc.lock().unwrap();
        session.read_command_byte().unwrap();
        session
            .write_command_byte(CommandByte::AUX_CLOCK_DISABLE, CommandByte::empty())
            .unwrap();
        // One read total; the second operation merged against the cache.
        assert_eq!(
            bus.commands(),
            vec![cmd::READ_COMMAND_BYTE, cmd::WRITE_COMMAND_BYTE]
        );
        assert_eq!(bus.writes(), vec![0x45]);
    }

    #[test]
    fn full_mask_write_skips_the_read() {
        let bus = ScriptedBus::default();
        let kbdc = kbdc_with(&bus, 16);
        let mut session = kbdc.lock().unwrap();
        session
            .write_command_byte(CommandByte::FULL_MASK, CommandByte::from_bits_retain(0x47))
            .unwrap();
        assert_eq!(bus.commands(), vec![cmd::WRITE_COMMAND_BYTE]);
        assert_eq!(bus.writes(), vec![0x47]);
    }

    #[test]
    fn drain_stops_at_the_iteration_bound_on_endless_output() {
        let bus = ScriptedBus::default();
        // More queued bytes than the bound; drain must not chase them all.
        bus.queue_data(&[0xAA; 64]);
        let kbdc = kbdc_with(&bus, 16);
        let mut session = kbdc.lock().unwrap();
        session.drain_buffers(10);
        assert_eq!(bus.queued(), 64 - 10);
    }

    #[test]
    fn aux_test_read_timeout_is_a_response_not_an_error() {
        let kbdc = kbdc_with(&ScriptedBus::default(), 4);
        let mut session = kbdc.lock().unwrap();
        assert_eq!(session.test_aux_port(), Ok(AuxTestResponse::Timeout));
    }

    #[test]
    fn restore_reports_failure_on_a_jammed_controller_but_still_drains() {
        let bus = ScriptedBus::with_status(StatusFlags::INPUT_FULL);
        bus.queue_data(&[0x00; 4]);
        let kbdc = kbdc_with(&bus, 4);
        let mut session = kbdc.lock().unwrap();
        assert!(!session.restore_command_byte(CommandByte::from_bits_retain(0x47)));
        // Both drain passes ran even though the write never went through.
        assert_eq!(bus.queued(), 0);
    }
}
