/// Interrupt-resource discovery collaborator.
///
/// Implemented by the surrounding platform code; the probe core never
/// allocates resources itself. Lookups are advisory and touch no controller
/// state.
pub trait IrqResources {
    /// IRQ assigned to the aux port by primary resource discovery, if any.
    fn port_irq(&self, unit: u32) -> Option<u32>;

    /// IRQ a companion driver already holds for this unit. Consulted only
    /// when [`port_irq`](IrqResources::port_irq) finds nothing: some firmware
    /// reports the aux IRQ against a separate PnP node instead of the
    /// controller itself.
    fn companion_irq(&self, driver: &str, unit: u32) -> Option<u32>;
}

/// Where a discovered IRQ number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqSource {
    Direct(u32),
    Companion(u32),
}

impl IrqSource {
    pub fn number(self) -> u32 {
        match self {
            IrqSource::Direct(irq) | IrqSource::Companion(irq) => irq,
        }
    }
}

/// Finds the aux port's IRQ: direct discovery first, companion fallback
/// second.
pub fn discover_irq(
    resources: &dyn IrqResources,
    companion: &str,
    unit: u32,
) -> Option<IrqSource> {
    if let Some(irq) = resources.port_irq(unit) {
        return Some(IrqSource::Direct(irq));
    }
    resources
        .companion_irq(companion, unit)
        .map(IrqSource::Companion)
}
