/// Byte-level access to the controller's two I/O ports.
///
/// Implementations map these to whatever actually backs the controller:
/// port-mapped I/O on real hardware, an emulated device model, or the
/// deterministic simulator used by tests. None of the methods block; timeout
/// behavior lives in the session layer, which polls [`read_status`] a bounded
/// number of times before giving up.
///
/// [`read_status`]: KbdcBus::read_status
pub trait KbdcBus: Send {
    /// Reads the status register (port `0x64`).
    fn read_status(&mut self) -> u8;

    /// Reads the output buffer (port `0x60`).
    fn read_data(&mut self) -> u8;

    /// Writes a controller command (port `0x64`).
    fn write_command(&mut self, command: u8);

    /// Writes a data byte (port `0x60`).
    fn write_data(&mut self, data: u8);
}
