//! System sleep/wake state machine.
//!
//! The host framework calls [`PowerManager::set_state`] from the idle path
//! with interrupts priority-masked. A standby request runs one complete
//! transition and returns once the core is running again:
//!
//! ```text
//!  mask handoff ─► sleep gate ──fail──► WFI ─────────────────────► Shallow
//!                      │
//!                      ▼
//!                 save retention ─► re-arm SW trigger ─► release PD_SYS
//!                                                          │        │
//!                                                 last holder    still held
//!                                                          │        │
//!                                               ack wake sources   WFI
//!                                               enter deep sleep    │
//!                                                          │        │
//!                                 restore retention ◄──────┴────────┘
//!                                      │
//!                         slept ───────┴────── did not sleep
//!                           │                        │
//!           acquire PD_SYS, freeze WDOG,      acquire PD_SYS (noconf)
//!           detect JTAG wake, XTAL32M switch
//! ```
//!
//! Interrupts stay masked (PRIMASK) until the framework calls
//! [`exit_post_ops`](PowerManager::exit_post_ops), so no handler runs against
//! half-restored peripherals.

pub mod retention;

use core::fmt;

use platform::clock::{ClockSwitch, CrgTopExt, SysClock};
use platform::config::BoardConfig;
use platform::cpu::Irq;
use platform::pdc::{PdcError, PdcMaster, PdcSlot, PdcTrigger};
use platform::power::{lp_domain_allows_sleep, PmHardware, PmState, PmStateHooks, PowerDomain};
use platform::regs::{gpreg, sys_wdog, Gpreg, SysWdog};

pub use retention::{DcdcRetention, GpioLatch, Retention};

/// Interrupts that account for a combo wake-up. A combo wake with none of
/// them pending came from the debugger.
const COMBO_WAKE_IRQS: [Irq; 3] = [Irq::CMAC2SYS, Irq::KEY_WKUP_GPIO, Irq::VBUS];

/// Power manager set-up errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PmError {
    /// A permanent wake source could not be registered.
    WakeSlot(PdcError),
}

impl From<PdcError> for PmError {
    fn from(e: PdcError) -> Self {
        Self::WakeSlot(e)
    }
}

impl fmt::Display for PmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WakeSlot(e) => write!(f, "wake source registration failed: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PmError {}

/// How a standby request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StandbyOutcome {
    /// The sleep gate was closed; the core only executed WFI.
    Shallow,
    /// PD_SYS had other holders; the core only executed WFI.
    DomainBusy,
    /// PD_SYS was released but a wake event cancelled the sleep.
    Aborted,
    /// The core went through extended sleep and woke up.
    Slept,
}

impl StandbyOutcome {
    /// `true` when PD_SYS was actually powered down.
    pub const fn slept(self) -> bool {
        matches!(self, Self::Slept)
    }
}

/// PDC slots registered once at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeSlots {
    /// Combo source (VBUS, debugger, CMAC2SYS, JTAG).
    pub combo: PdcSlot,
    /// Software trigger, re-armed before every sleep.
    pub sw_trigger: PdcSlot,
}

/// Sleep/wake state machine for the application core.
///
/// One instance per system. `H` is the hardware (registers, PD registry,
/// PDC, core), `C` the clock driver used to get back onto XTAL32M after a
/// wake-up.
pub struct PowerManager<H, C> {
    hw: H,
    clock: C,
    board: BoardConfig,
    slots: WakeSlots,
    waiting_for_jtag: bool,
    gpio: Option<GpioLatch>,
    dcdc: Option<DcdcRetention>,
}

impl<H: PmHardware, C: ClockSwitch> PowerManager<H, C> {
    /// Register the permanent wake sources and build the manager.
    ///
    /// Must run before interrupts are enabled: the first standby re-arms the
    /// software trigger slot registered here.
    pub fn new(mut hw: H, clock: C, board: BoardConfig) -> Result<Self, PmError> {
        let flags = board.wake_flags();

        let combo = hw.add(PdcTrigger::Combo, PdcMaster::M33, flags)?;
        hw.set(combo);
        hw.ack(combo);

        let sw_trigger = hw.add(PdcTrigger::SwTrigger, PdcMaster::M33, flags)?;
        hw.set(sw_trigger);
        hw.ack(sw_trigger);

        info!(
            "power manager: {}, combo slot {}, sw slot {}",
            board.soc.name,
            combo.index(),
            sw_trigger.index()
        );

        Ok(Self {
            hw,
            clock,
            board,
            slots: WakeSlots { combo, sw_trigger },
            waiting_for_jtag: false,
            gpio: board
                .soc
                .gpio_latch
                .then(|| GpioLatch::new(board.soc.gpio_banks)),
            dcdc: board.soc.dcdc_retention.then(DcdcRetention::new),
        })
    }

    /// One standby transition. Returns with PRIMASK set.
    pub fn standby(&mut self) -> StandbyOutcome {
        // The caller masked by priority; WFI needs PRIMASK instead so that a
        // pending interrupt still ends it.
        self.hw.disable_irq();
        self.hw.irq_unlock(0);

        if !self.sleep_allowed() {
            self.hw.dsb();
            self.hw.wfi();
            return StandbyOutcome::Shallow;
        }

        self.gpio.save(&self.hw);
        self.dcdc.save(&self.hw);
        self.hw.dsb();

        self.hw.set(self.slots.sw_trigger);
        self.hw.ack(self.slots.sw_trigger);

        let outcome = if self.hw.release_nowait(PowerDomain::Sys) {
            self.hw.ack_all(PdcMaster::M33);
            self.hw.dsb();
            if self.hw.enter_deep_sleep() {
                StandbyOutcome::Slept
            } else {
                StandbyOutcome::Aborted
            }
        } else {
            self.hw.dsb();
            self.hw.wfi();
            StandbyOutcome::DomainBusy
        };

        self.gpio.restore(&self.hw);
        self.dcdc.restore(&self.hw);

        if outcome.slept() {
            self.resume();
        } else {
            // PD_SYS never went down.
            self.hw.acquire_noconf(PowerDomain::Sys);
        }

        trace!("standby: {:?}", outcome);
        outcome
    }

    fn sleep_allowed(&mut self) -> bool {
        if self.waiting_for_jtag {
            if !self.hw.debugger_active() {
                debug!("debugger detached");
                self.waiting_for_jtag = false;
            }
            return false;
        }
        lp_domain_allows_sleep(&self.hw) && !self.hw.any_enabled_irq_pending()
    }

    fn resume(&mut self) {
        self.hw.acquire(PowerDomain::Sys);

        if !self.board.watchdog_driver {
            // SYS_WDOG restarted with PD_SYS; nothing feeds it.
            self.hw.write(Gpreg::SetFreeze, gpreg::FRZ_SYS_WDOG.mask());
            self.hw.write(SysWdog::Watchdog, sys_wdog::WDOG_VAL.mask());
        }

        if self.hw.is_pending(self.slots.combo)
            && !COMBO_WAKE_IRQS.iter().any(|&irq| self.hw.is_irq_pending(irq))
        {
            info!("woken by debugger, deep sleep held off until it detaches");
            self.waiting_for_jtag = true;
        }

        if self.board.sys_clock == SysClock::Xtal32m
            && self.clock.sys_xtal32m_switch_safe().is_err()
        {
            warn!("still on RC32M after wake-up");
        }
    }

    /// The hardware handle.
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Mutable hardware handle.
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// The clock driver.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Board description this manager was built for.
    pub fn board(&self) -> &BoardConfig {
        &self.board
    }

    /// PDC slots registered at boot.
    pub fn wake_slots(&self) -> WakeSlots {
        self.slots
    }

    /// `true` while deep sleep is held off after a debugger wake-up.
    pub fn waiting_for_jtag(&self) -> bool {
        self.waiting_for_jtag
    }
}

impl<H: PmHardware, C: ClockSwitch> PmStateHooks for PowerManager<H, C> {
    fn set_state(&mut self, state: PmState, substate: u8) {
        match state {
            PmState::Standby => {
                self.standby();
            }
            other => debug!("unsupported power state {:?} ({})", other, substate),
        }
    }

    fn exit_post_ops(&mut self, _state: PmState, _substate: u8) {
        self.hw.enable_irq();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{SimEvent, SimSoc};
    use platform::pdc::{PdcFlags, WakeSourceController};

    struct NoSwitch;

    impl ClockSwitch for NoSwitch {
        type Error = ();

        fn sys_xtal32m_switch_safe(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn init_registers_and_clears_both_slots() {
        let soc = SimSoc::da1469x();
        let pm = PowerManager::new(soc.clone(), NoSwitch, BoardConfig::DA1469X_DEFAULT).unwrap();

        assert_eq!(
            soc.pdc_entries(),
            vec![
                (PdcTrigger::Combo, PdcMaster::M33, PdcFlags::EN_XTAL),
                (PdcTrigger::SwTrigger, PdcMaster::M33, PdcFlags::EN_XTAL),
            ]
        );
        let slots = pm.wake_slots();
        assert_eq!(
            soc.events(),
            vec![
                SimEvent::PdcAdd(slots.combo),
                SimEvent::PdcSet(slots.combo),
                SimEvent::PdcAck(slots.combo),
                SimEvent::PdcAdd(slots.sw_trigger),
                SimEvent::PdcSet(slots.sw_trigger),
                SimEvent::PdcAck(slots.sw_trigger),
            ]
        );
        assert!(!pm.hardware().is_pending(slots.sw_trigger));
    }

    #[test]
    fn init_without_crystal_uses_no_flags() {
        let soc = SimSoc::da1469x();
        let board = BoardConfig {
            xtal32m_enabled: false,
            ..BoardConfig::DA1469X_DEFAULT
        };
        PowerManager::new(soc.clone(), NoSwitch, board).unwrap();
        assert!(soc
            .pdc_entries()
            .iter()
            .all(|&(_, _, flags)| flags == PdcFlags::NONE));
    }

    #[test]
    fn init_fails_on_full_table() {
        let mut soc = SimSoc::da1469x();
        for _ in 0..platform::mocks::PDC_ENTRIES - 1 {
            soc.add(PdcTrigger::RtcAlarm, PdcMaster::Cmac, PdcFlags::NONE)
                .unwrap();
        }
        let err = PowerManager::new(soc, NoSwitch, BoardConfig::DA1469X_DEFAULT)
            .err()
            .unwrap();
        assert_eq!(err, PmError::WakeSlot(PdcError::TableFull));
        assert_eq!(
            err.to_string(),
            "wake source registration failed: PDC table full"
        );
    }

    #[test]
    fn retention_follows_soc_capabilities() {
        let pm = PowerManager::new(SimSoc::da1469x(), NoSwitch, BoardConfig::DA1469X_DEFAULT)
            .unwrap();
        assert!(pm.gpio.is_some());
        assert!(pm.dcdc.is_none());

        let pm = PowerManager::new(SimSoc::da1470x(), NoSwitch, BoardConfig::DA1470X_DEFAULT)
            .unwrap();
        assert!(pm.gpio.is_some());
        assert!(pm.dcdc.is_some());
    }

    #[test]
    fn exit_post_ops_unmasks() {
        let soc = SimSoc::da1469x();
        let mut pm =
            PowerManager::new(soc.clone(), NoSwitch, BoardConfig::DA1469X_DEFAULT).unwrap();
        pm.standby();
        assert!(soc.primask());
        pm.exit_post_ops(PmState::Standby, 0);
        assert!(!soc.primask());
    }
}
