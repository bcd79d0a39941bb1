#![forbid(unsafe_code)]

//! Access layer for the shared i8042-class keyboard controller.
//!
//! The controller multiplexes the keyboard and auxiliary (pointing device)
//! channels behind a single register interface, so every caller that wants to
//! talk to it must first take the controller lock. [`Kbdc`] owns that lock and
//! hands out [`KbdcSession`] guards; all byte-level traffic goes through a
//! session, which in turn drives a [`KbdcBus`] implementation (real port I/O,
//! an emulated controller, or the simulator in `auxport-testkit`).

pub mod bus;
pub mod regs;

mod controller;
mod error;

pub use bus::KbdcBus;
pub use controller::{AuxTestResponse, Kbdc, KbdcConfig, KbdcSession};
pub use error::{KbdcError, Result};
pub use regs::{CommandByte, StatusFlags};
