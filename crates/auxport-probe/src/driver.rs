use auxport_kbdc::Kbdc;
use thiserror::Error;
use tracing::Level;

use crate::classify::{AuxPortStatus, AuxTestPolicy};
use crate::diag::{DiagSink, TracingSink};
use crate::irq::{discover_irq, IrqResources, IrqSource};
use crate::probe::{probe_aux_port, ProbeError};

/// Companion driver name queried when direct IRQ discovery comes up empty.
pub const DEFAULT_COMPANION_DRIVER: &str = "auxpnp";

/// Opaque handle to a registered character-device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("device node registration failed: {0}")]
pub struct RegistryError(pub &'static str);

/// Character-device registration collaborator. Node naming, permissions and
/// the read/ioctl/poll surface all live on the caller's side of this trait.
pub trait DevNodeRegistry {
    fn register(&mut self, unit: u32) -> Result<NodeHandle, RegistryError>;
    fn unregister(&mut self, handle: NodeHandle);
}

/// Per-unit device record owned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxDevice {
    pub unit: u32,
    pub irq: Option<IrqSource>,
    pub status: Option<AuxPortStatus>,
    pub node: Option<NodeHandle>,
}

impl AuxDevice {
    fn new(unit: u32) -> Self {
        Self {
            unit,
            irq: None,
            status: None,
            node: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No interrupt resource could be discovered for the unit; the controller
    /// is never touched in this case.
    #[error("no interrupt resource for aux unit {0}")]
    NoIrq(u32),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Attach requires a prior probe that found a device.
    #[error("no functioning aux device on unit {0}")]
    NotPresent(u32),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One lifecycle event per method, dispatched statically; implemented once by
/// [`AuxPortDriver`].
pub trait DeviceLifecycle {
    /// Discovers the unit's interrupt resource.
    fn identify(&mut self) -> Option<u32>;

    /// Probes the aux channel. Requires a discovered IRQ.
    fn probe(&mut self) -> Result<AuxPortStatus, DriverError>;

    /// Registers the character-device node. Requires a probe that found a
    /// device.
    fn attach(&mut self) -> Result<(), DriverError>;

    /// Unregisters the node. Safe to call repeatedly.
    fn detach(&mut self);

    /// Revalidates the port after a suspend cycle.
    fn resume(&mut self) -> Result<AuxPortStatus, DriverError>;

    /// Final shutdown; no controller traffic.
    fn shutdown(&mut self);
}

/// Driver for one aux-port unit. Owns the collaborators and the device
/// record; the probe core only ever sees the controller handle.
pub struct AuxPortDriver {
    kbdc: Kbdc,
    policy: AuxTestPolicy,
    companion: &'static str,
    resources: Box<dyn IrqResources>,
    registry: Box<dyn DevNodeRegistry>,
    diag: Box<dyn DiagSink>,
    device: AuxDevice,
}

impl AuxPortDriver {
    pub fn new(
        unit: u32,
        kbdc: Kbdc,
        resources: Box<dyn IrqResources>,
        registry: Box<dyn DevNodeRegistry>,
    ) -> Self {
        Self {
            kbdc,
            policy: AuxTestPolicy::default(),
            companion: DEFAULT_COMPANION_DRIVER,
            resources,
            registry,
            diag: Box::new(TracingSink),
            device: AuxDevice::new(unit),
        }
    }

    pub fn with_policy(mut self, policy: AuxTestPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_companion(mut self, companion: &'static str) -> Self {
        self.companion = companion;
        self
    }

    pub fn with_diag(mut self, diag: Box<dyn DiagSink>) -> Self {
        self.diag = diag;
        self
    }

    pub fn device(&self) -> &AuxDevice {
        &self.device
    }

    fn run_probe(&mut self) -> Result<AuxPortStatus, DriverError> {
        if self.device.irq.is_none() {
            self.identify();
        }
        if self.device.irq.is_none() {
            self.device.status = None;
            return Err(DriverError::NoIrq(self.device.unit));
        }
        match probe_aux_port(&self.kbdc, &self.policy, self.diag.as_mut()) {
            Ok(status) => {
                self.device.status = Some(status);
                Ok(status)
            }
            Err(err) => {
                self.device.status = None;
                Err(err.into())
            }
        }
    }
}

impl DeviceLifecycle for AuxPortDriver {
    fn identify(&mut self) -> Option<u32> {
        let source = discover_irq(self.resources.as_ref(), self.companion, self.device.unit);
        match source {
            Some(IrqSource::Direct(irq)) => {
                self.diag
                    .event(Level::DEBUG, &format!("aux port irq {irq}"));
            }
            Some(IrqSource::Companion(irq)) => {
                self.diag.event(
                    Level::DEBUG,
                    &format!("aux port irq {irq} taken from {}", self.companion),
                );
            }
            None => {
                self.diag
                    .event(Level::DEBUG, "no aux port irq resource found");
            }
        }
        self.device.irq = source;
        source.map(IrqSource::number)
    }

    fn probe(&mut self) -> Result<AuxPortStatus, DriverError> {
        self.run_probe()
    }

    fn attach(&mut self) -> Result<(), DriverError> {
        if self.device.status != Some(AuxPortStatus::Present) {
            return Err(DriverError::NotPresent(self.device.unit));
        }
        if self.device.node.is_none() {
            let handle = self.registry.register(self.device.unit)?;
            self.device.node = Some(handle);
        }
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(handle) = self.device.node.take() {
            self.registry.unregister(handle);
        }
    }

    fn resume(&mut self) -> Result<AuxPortStatus, DriverError> {
        // Firmware may have repowered the controller with a different command
        // byte; probe again rather than trusting the pre-suspend state.
        self.run_probe()
    }

    fn shutdown(&mut self) {
        self.diag.event(
            Level::DEBUG,
            &format!("aux unit {} shutting down", self.device.unit),
        );
    }
}
