//! Power-domain and power-state abstraction
//!
//! The SoC splits its logic into independently switchable power domains. A
//! domain stays powered while at least one holder references it; the registry
//! that owns those counts is provided by the host environment and reached
//! through [`PowerDomainRegistry`].
//!
//! The host power-management framework drives state transitions through
//! [`PmStateHooks`], implemented by the SoC's power manager.

use crate::clock::CrgTopExt;
use crate::cpu::{Core, SleepEntry};
use crate::pdc::WakeSourceController;
use crate::regs::{CrgTop, Dcdc, Gpio, Gpreg, RegisterFile, SysWdog};

/// Switchable power domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerDomain {
    /// System domain: SRAM controller, GPIO, DC-DC, watchdog. Losing it makes
    /// every SYS register unreadable until it is powered again.
    Sys,
    /// Timers.
    Tim,
    /// Communication peripherals (UART, SPI, I2C).
    Com,
    /// Application peripherals (crypto, display, ...).
    Periph,
    /// Radio.
    Radio,
    /// Always-on domain. Never released.
    Aon,
}

impl PowerDomain {
    /// Every domain, in registry order.
    pub const ALL: [PowerDomain; 6] = [
        PowerDomain::Sys,
        PowerDomain::Tim,
        PowerDomain::Com,
        PowerDomain::Periph,
        PowerDomain::Radio,
        PowerDomain::Aon,
    ];
}

/// Reference-counted power-domain registry.
///
/// Counts are owned by the registry; callers only ever acquire and release.
pub trait PowerDomainRegistry {
    /// Take a reference, powering the domain (and applying its preferred
    /// settings) on the 0→1 transition. Blocks until the domain is up.
    fn acquire(&mut self, domain: PowerDomain);

    /// Take a reference without reconfiguring the domain. Used when the domain
    /// is known to have stayed powered.
    fn acquire_noconf(&mut self, domain: PowerDomain);

    /// Drop a reference, powering the domain down on the 1→0 transition and
    /// waiting for it to go down.
    fn release(&mut self, domain: PowerDomain);

    /// Drop a reference without waiting for power-down.
    ///
    /// Returns `true` only when this call dropped the last reference. The
    /// reference is dropped either way; a caller that sees `false` and wants
    /// to keep running restores it with [`acquire_noconf`](Self::acquire_noconf).
    fn release_nowait(&mut self, domain: PowerDomain) -> bool;
}

/// System power states requested by the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PmState {
    /// Running.
    Active,
    /// Runtime idle: CPU stopped, everything else running.
    RuntimeIdle,
    /// Suspend-to-idle.
    SuspendToIdle,
    /// Standby: the only state this SoC implements (extended sleep).
    Standby,
    /// Suspend to RAM.
    SuspendToRam,
    /// Suspend to disk.
    SuspendToDisk,
    /// Soft off.
    SoftOff,
}

/// Hooks the host power-management framework calls on the idle path.
///
/// `set_state` runs with interrupts masked by the caller; `exit_post_ops`
/// runs once the wake-up handlers are done and must unmask them.
pub trait PmStateHooks {
    /// Perform the transition into `state`. Returns once the system is running
    /// again, whether or not it actually slept.
    fn set_state(&mut self, state: PmState, substate: u8);

    /// Finish the transition out of `state`.
    fn exit_post_ops(&mut self, state: PmState, substate: u8);
}

/// Everything the sleep/wake state machine needs from the hardware.
///
/// Blanket-implemented; a board type (or the simulated SoC) that implements
/// the individual traits gets this for free.
pub trait PmHardware:
    RegisterFile<CrgTop>
    + RegisterFile<Gpreg>
    + RegisterFile<SysWdog>
    + RegisterFile<Gpio>
    + RegisterFile<Dcdc>
    + PowerDomainRegistry
    + WakeSourceController
    + Core
    + SleepEntry
{
}

impl<T> PmHardware for T where
    T: RegisterFile<CrgTop>
        + RegisterFile<Gpreg>
        + RegisterFile<SysWdog>
        + RegisterFile<Gpio>
        + RegisterFile<Dcdc>
        + PowerDomainRegistry
        + WakeSourceController
        + Core
        + SleepEntry
{
}

/// Sleep-gate inputs that come straight from CRG_TOP.
///
/// Deep sleep needs an LP clock accurate enough to time the wake-up and no
/// debugger on the port.
pub fn lp_domain_allows_sleep<R: CrgTopExt + ?Sized>(regs: &R) -> bool {
    regs.lp_clock().supports_extended_sleep() && !regs.debugger_active()
}
