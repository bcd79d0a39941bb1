use bitflags::bitflags;

bitflags! {
    /// Status register bits (read from port `0x64`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// Output buffer full: a byte is waiting on the data port.
        const OUTPUT_FULL = 1 << 0;
        /// Input buffer full: the controller has not consumed the last write.
        const INPUT_FULL = 1 << 1;
        /// System flag (set once power-on self-test passes).
        const SYSTEM_FLAG = 1 << 2;
        /// Last data-port write was a command (0) or data (1).
        const COMMAND_DATA = 1 << 3;
        /// The byte in the output buffer came from the aux channel.
        const AUX_DATA = 1 << 5;
        /// Timeout error.
        const TIMEOUT_ERROR = 1 << 6;
        /// Parity error.
        const PARITY_ERROR = 1 << 7;
    }
}

bitflags! {
    /// The controller command byte: one global register governing clock and
    /// interrupt enablement for both channels at once.
    ///
    /// Bits 3 and 7 are reserved; values read from hardware keep them via
    /// `from_bits_retain` so a later restore writes back exactly what was
    /// captured.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandByte: u8 {
        /// Raise IRQ1 when keyboard data reaches the output buffer.
        const KBD_INT_ENABLE = 1 << 0;
        /// Raise IRQ12 when aux data reaches the output buffer.
        const AUX_INT_ENABLE = 1 << 1;
        /// System flag mirror.
        const SYSTEM_FLAG = 1 << 2;
        /// Hold the keyboard clock line low (channel disabled).
        const KBD_CLOCK_DISABLE = 1 << 4;
        /// Hold the aux clock line low (channel disabled).
        const AUX_CLOCK_DISABLE = 1 << 5;
        /// Translate keyboard scancodes to set 1.
        const KBD_TRANSLATION = 1 << 6;
    }
}

impl CommandByte {
    /// Mask covering every bit of the register, reserved bits included.
    /// Restores write with this mask so the captured value goes back verbatim.
    pub const FULL_MASK: CommandByte = CommandByte::from_bits_retain(0xFF);

    /// Interrupt and clock bits for both channels; the probe rewrites exactly
    /// these and must leave everything else untouched.
    pub const CHANNEL_CONTROL: CommandByte = CommandByte::KBD_INT_ENABLE
        .union(CommandByte::AUX_INT_ENABLE)
        .union(CommandByte::KBD_CLOCK_DISABLE)
        .union(CommandByte::AUX_CLOCK_DISABLE);

    /// Returns `self` with the bits selected by `mask` replaced by the
    /// corresponding bits of `value`.
    pub fn merged(self, mask: CommandByte, value: CommandByte) -> CommandByte {
        CommandByte::from_bits_retain((self.bits() & !mask.bits()) | (value.bits() & mask.bits()))
    }
}
