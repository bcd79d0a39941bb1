#![forbid(unsafe_code)]

//! Deterministic in-memory keyboard-controller model for tests.
//!
//! [`SimKbdc`] implements [`KbdcBus`] with the subset of i8042 behavior the
//! probe protocol exercises: the command byte register, the output buffer,
//! the aux clock commands and the aux interface test. Clones share one
//! underlying controller, so a test keeps a handle for assertions after
//! boxing another into [`auxport_kbdc::Kbdc`].
//!
//! Failure injection covers the cases real controllers get wrong: a jammed
//! input buffer (immediately or after N accepted writes) and command-byte
//! reads that never produce a reply. Every accepted port write lands in a
//! journal so tests can assert on exact command sequences and on the absence
//! of interleaving.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use auxport_kbdc::{CommandByte, KbdcBus, StatusFlags};
use auxport_pc_constants::{cmd, resp};

/// One accepted port write, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOp {
    /// Byte written to the command register.
    Command(u8),
    /// Byte written to the data port.
    Data(u8),
}

struct SimState {
    command_byte: u8,
    out: VecDeque<u8>,
    awaiting_command_byte: bool,
    aux_test_response: Option<u8>,
    answer_command_byte_reads: bool,
    jammed: bool,
    jam_after_writes: Option<u32>,
    writes_seen: u32,
    journal: Vec<SimOp>,
}

impl SimState {
    fn record_write(&mut self, op: SimOp) {
        self.journal.push(op);
        self.writes_seen += 1;
        if let Some(limit) = self.jam_after_writes {
            if self.writes_seen >= limit {
                self.jammed = true;
            }
        }
    }
}

/// Simulated controller. `clone()` for a second handle to the same state.
#[derive(Clone)]
pub struct SimKbdc {
    state: Arc<Mutex<SimState>>,
}

impl SimKbdc {
    /// A controller in the usual post-boot state: keyboard channel up with
    /// interrupts and translation on, aux clock disabled, and a functional
    /// aux port that answers the interface test with the no-error code.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                command_byte: 0x65,
                out: VecDeque::new(),
                awaiting_command_byte: false,
                aux_test_response: Some(resp::AUX_TEST_OK),
                answer_command_byte_reads: true,
                jammed: false,
                jam_after_writes: None,
                writes_seen: 0,
                journal: Vec::new(),
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    /// Programs the aux interface test result; `None` means the controller
    /// never answers (the probe sees a read timeout).
    pub fn set_aux_test_response(&self, response: Option<u8>) {
        self.state().aux_test_response = response;
    }

    pub fn set_command_byte(&self, value: u8) {
        self.state().command_byte = value;
    }

    pub fn command_byte(&self) -> u8 {
        self.state().command_byte
    }

    pub fn command_byte_flags(&self) -> CommandByte {
        CommandByte::from_bits_retain(self.command_byte())
    }

    /// Queues stale bytes in the output buffer, as left over from earlier
    /// keyboard traffic.
    pub fn queue_stale_output(&self, bytes: &[u8]) {
        self.state().out.extend(bytes);
    }

    /// Input buffer sticks full immediately; every subsequent write times out.
    pub fn jam_input(&self) {
        self.state().jammed = true;
    }

    /// Input buffer sticks full once `writes` port writes have been accepted.
    pub fn jam_input_after_writes(&self, writes: u32) {
        self.state().jam_after_writes = Some(writes);
    }

    /// Command-byte read commands are accepted but never answered.
    pub fn drop_command_byte_reads(&self) {
        self.state().answer_command_byte_reads = false;
    }

    pub fn journal(&self) -> Vec<SimOp> {
        self.state().journal.clone()
    }

    /// Number of completed command-byte writes (command `0x60` plus its data
    /// byte).
    pub fn command_byte_writes(&self) -> usize {
        let journal = self.journal();
        journal
            .windows(2)
            .filter(|pair| {
                matches!(
                    **pair,
                    [SimOp::Command(cmd::WRITE_COMMAND_BYTE), SimOp::Data(_)]
                )
            })
            .count()
    }
}

impl Default for SimKbdc {
    fn default() -> Self {
        Self::new()
    }
}

impl KbdcBus for SimKbdc {
    fn read_status(&mut self) -> u8 {
        let state = self.state();
        let mut status = StatusFlags::SYSTEM_FLAG;
        if !state.out.is_empty() {
            status |= StatusFlags::OUTPUT_FULL;
        }
        if state.jammed {
            status |= StatusFlags::INPUT_FULL;
        }
        status.bits()
    }

    fn read_data(&mut self) -> u8 {
        self.state().out.pop_front().unwrap_or(0)
    }

    fn write_command(&mut self, command: u8) {
        let mut state = self.state();
        state.record_write(SimOp::Command(command));
        // A fresh command cancels any half-finished two-byte sequence.
        state.awaiting_command_byte = false;
        match command {
            cmd::READ_COMMAND_BYTE => {
                if state.answer_command_byte_reads {
                    let byte = state.command_byte;
                    state.out.push_back(byte);
                }
            }
            cmd::WRITE_COMMAND_BYTE => {
                state.awaiting_command_byte = true;
            }
            cmd::DISABLE_AUX_PORT => {
                state.command_byte |= CommandByte::AUX_CLOCK_DISABLE.bits();
            }
            cmd::ENABLE_AUX_PORT => {
                state.command_byte &= !CommandByte::AUX_CLOCK_DISABLE.bits();
            }
            cmd::TEST_AUX_PORT => {
                if let Some(code) = state.aux_test_response {
                    state.out.push_back(code);
                }
            }
            cmd::DISABLE_KBD_PORT => {
                state.command_byte |= CommandByte::KBD_CLOCK_DISABLE.bits();
            }
            cmd::ENABLE_KBD_PORT => {
                state.command_byte &= !CommandByte::KBD_CLOCK_DISABLE.bits();
            }
            _ => {}
        }
    }

    fn write_data(&mut self, data: u8) {
        let mut state = self.state();
        state.record_write(SimOp::Data(data));
        if state.awaiting_command_byte {
            state.awaiting_command_byte = false;
            state.command_byte = data;
        }
        // Anything else would go to the keyboard; the model has no keyboard.
    }
}
