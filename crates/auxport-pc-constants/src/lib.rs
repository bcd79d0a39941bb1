#![forbid(unsafe_code)]

//! Shared i8042 keyboard-controller constants for the x86 PC platform.
//!
//! This crate exists so the controller access layer (`auxport-kbdc`), the
//! probe logic (`auxport-probe`) and the test simulator (`auxport-testkit`)
//! agree on register numbers and command values that must match exactly.

/// Data port (read: controller output buffer, write: controller input buffer).
pub const DATA_PORT: u16 = 0x60;

/// Status register (read) / command register (write).
pub const STATUS_COMMAND_PORT: u16 = 0x64;

/// Commands written to the command register (port `0x64`).
pub mod cmd {
    /// Read the controller command byte; the value arrives on the data port.
    pub const READ_COMMAND_BYTE: u8 = 0x20;
    /// Write the controller command byte; the value follows on the data port.
    pub const WRITE_COMMAND_BYTE: u8 = 0x60;
    /// Disable the auxiliary (second) port clock.
    pub const DISABLE_AUX_PORT: u8 = 0xA7;
    /// Enable the auxiliary (second) port clock.
    pub const ENABLE_AUX_PORT: u8 = 0xA8;
    /// Test the auxiliary port interface; the result arrives on the data port.
    pub const TEST_AUX_PORT: u8 = 0xA9;
    /// Controller self-test.
    pub const SELF_TEST: u8 = 0xAA;
    /// Disable the keyboard (first) port clock.
    pub const DISABLE_KBD_PORT: u8 = 0xAD;
    /// Enable the keyboard (first) port clock.
    pub const ENABLE_KBD_PORT: u8 = 0xAE;
    /// Route the next data-port byte to the auxiliary device.
    pub const WRITE_TO_AUX: u8 = 0xD4;
}

/// Response bytes produced by the controller or an attached device.
pub mod resp {
    /// Aux interface test passed.
    pub const AUX_TEST_OK: u8 = 0x00;
    /// Aux clock line stuck low.
    pub const AUX_CLOCK_STUCK_LOW: u8 = 0x01;
    /// Aux clock line stuck high.
    pub const AUX_CLOCK_STUCK_HIGH: u8 = 0x02;
    /// Aux data line stuck low.
    pub const AUX_DATA_STUCK_LOW: u8 = 0x03;
    /// Aux data line stuck high.
    pub const AUX_DATA_STUCK_HIGH: u8 = 0x04;
    /// Device acknowledge.
    pub const ACK: u8 = 0xFA;
    /// Device asks for the last byte again.
    pub const RESEND: u8 = 0xFE;
}

/// Aux-test result codes that some controllers return even when the port is
/// perfectly functional: the three line-stuck codes plus a stray device ACK.
///
/// Treating these as "port present" avoids false negatives on real hardware;
/// a genuinely broken port is still caught later, when the attached device
/// fails to respond. `resp::AUX_DATA_STUCK_HIGH` is deliberately not listed.
pub const DEFAULT_TOLERATED_AUX_TEST_CODES: [u8; 4] = [
    resp::AUX_CLOCK_STUCK_LOW,
    resp::AUX_CLOCK_STUCK_HIGH,
    resp::AUX_DATA_STUCK_LOW,
    resp::ACK,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_match_pc_platform_layout() {
        assert_eq!(DATA_PORT, 0x60);
        assert_eq!(STATUS_COMMAND_PORT, 0x64);
    }

    #[test]
    fn command_values_match_i8042_command_set() {
        assert_eq!(cmd::READ_COMMAND_BYTE, 0x20);
        assert_eq!(cmd::WRITE_COMMAND_BYTE, 0x60);
        assert_eq!(cmd::DISABLE_AUX_PORT, 0xA7);
        assert_eq!(cmd::ENABLE_AUX_PORT, 0xA8);
        assert_eq!(cmd::TEST_AUX_PORT, 0xA9);
        assert_eq!(cmd::SELF_TEST, 0xAA);
        assert_eq!(cmd::DISABLE_KBD_PORT, 0xAD);
        assert_eq!(cmd::ENABLE_KBD_PORT, 0xAE);
        assert_eq!(cmd::WRITE_TO_AUX, 0xD4);
    }

    #[test]
    fn response_values_match_the_device_protocol() {
        assert_eq!(resp::AUX_TEST_OK, 0x00);
        assert_eq!(resp::AUX_DATA_STUCK_HIGH, 0x04);
        assert_eq!(resp::ACK, 0xFA);
        assert_eq!(resp::RESEND, 0xFE);
    }

    #[test]
    fn tolerated_codes_cover_line_stuck_errors_and_stray_ack() {
        assert_eq!(DEFAULT_TOLERATED_AUX_TEST_CODES, [0x01, 0x02, 0x03, 0xFA]);
        assert!(!DEFAULT_TOLERATED_AUX_TEST_CODES.contains(&resp::AUX_TEST_OK));
        assert!(!DEFAULT_TOLERATED_AUX_TEST_CODES.contains(&resp::AUX_DATA_STUCK_HIGH));
    }
}
