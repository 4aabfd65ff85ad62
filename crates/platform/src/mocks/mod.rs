//! Simulated SoC for host tests
//!
//! [`SimSoc`] implements every platform trait against an in-memory register
//! file, power-domain counters, a PDC table and an NVIC model, and records
//! every hardware interaction in an event log that tests assert on.
//!
//! It is a cheap `Clone` handle: drivers that each want their own register
//! access (the power manager, the clock driver, a delay provider) get their
//! own clone, and the test keeps one to inspect state.
//!
//! The simulation is behavioural, not cycle-accurate:
//! - status bits (PLL lock, LDO ok, crystal settled, RUNNING_AT_*) are derived
//!   from the control bits on every read,
//! - pad latches hold the pad level captured when they were closed,
//! - a successful deep sleep resets every PD_SYS register to its reset value
//!   and applies the configured wake cause.

#![cfg(any(test, feature = "std"))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::config::SocConfig;
use crate::cpu::{Core, Irq, SleepEntry};
use crate::pdc::{PdcError, PdcFlags, PdcMaster, PdcSlot, PdcTrigger, WakeSourceController};
use crate::power::{PowerDomain, PowerDomainRegistry};
use crate::regs::{
    crg_top, crg_xtal, CrgTop, CrgXtal, Dcdc, Field, Gpio, Gpreg, RegisterFile, SysWdog,
    TrimAddress,
};

/// Number of entries in the PDC lookup table.
pub const PDC_ENTRIES: usize = 16;

/// BASEPRI value `irq_lock` installs: priority 1 with 3 priority bits.
pub const LOCKED_BASEPRI: u32 = 0x20;

/// Reset value of a GPIO mode register (input, pull-down).
pub const GPIO_MODE_RESET: u32 = 0x200;

/// Reset value of DCDC_CTRL0.
pub const DCDC_CTRL0_RESET: u32 = 0x0000_1040;

/// A register of any simulated block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimRegister {
    /// CRG_TOP register.
    CrgTop(CrgTop),
    /// CRG_XTAL register.
    CrgXtal(CrgXtal),
    /// GPREG register.
    Gpreg(Gpreg),
    /// SYS_WDOG register.
    SysWdog(SysWdog),
    /// DCDC register.
    Dcdc(Dcdc),
    /// GPIO register.
    Gpio(Gpio),
    /// Raw address.
    Trim(u32),
}

impl SimRegister {
    /// Registers that lose their contents when PD_SYS powers down.
    fn in_sys_domain(self) -> bool {
        match self {
            SimRegister::CrgXtal(_)
            | SimRegister::Gpreg(_)
            | SimRegister::SysWdog(_)
            | SimRegister::Dcdc(_) => true,
            SimRegister::Gpio(reg) => matches!(reg, Gpio::Data(_) | Gpio::Mode { .. }),
            SimRegister::CrgTop(_) | SimRegister::Trim(_) => false,
        }
    }

    fn reset_value(self) -> u32 {
        match self {
            SimRegister::CrgTop(CrgTop::ClkCtrl) => crg_top::SYS_CLK_SEL.insert(0, 1),
            SimRegister::CrgTop(CrgTop::AnaStatus) => crg_top::COMP_VBAT_HIGH.mask(),
            SimRegister::CrgTop(CrgTop::ClkRc32k | CrgTop::ClkRc32m) => {
                crg_top::OSC_ENABLE.mask()
            }
            SimRegister::Gpio(Gpio::PadLatch(_)) => u32::MAX,
            SimRegister::Gpio(Gpio::Mode { .. }) => GPIO_MODE_RESET,
            SimRegister::Dcdc(Dcdc::Ctrl0) => DCDC_CTRL0_RESET,
            SimRegister::SysWdog(SysWdog::Watchdog) => 0xFF,
            _ => 0,
        }
    }
}

/// What woke the simulated core from deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// A timer PDC entry. Nothing else pends.
    Timer,
    /// GPIO wake-up: combo entry plus KEY_WKUP_GPIO.
    Gpio,
    /// VBUS attach: combo entry plus VBUS.
    Vbus,
    /// Radio mailbox: combo entry plus CMAC2SYS.
    Cmac,
    /// Debugger: combo entry only, and the debugger stays attached.
    Jtag,
}

/// Outcome the next `enter_deep_sleep` call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepBehaviour {
    /// Power down and wake up for `WakeCause`.
    Sleep(WakeCause),
    /// Abandon the sleep before power-down.
    Abort,
}

/// One recorded hardware interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// `Core::wfi`
    Wfi,
    /// `Core::dsb`
    Dsb,
    /// `Core::disable_irq`
    DisableIrq,
    /// `Core::enable_irq`
    EnableIrq,
    /// `Core::irq_lock`
    IrqLock,
    /// `Core::irq_unlock` with the restored key.
    IrqUnlock(u32),
    /// `SleepEntry::enter_deep_sleep` and whether the core slept.
    DeepSleep {
        /// The core powered down and woke up again.
        slept: bool,
    },
    /// `PowerDomainRegistry::acquire`
    PdAcquire(PowerDomain),
    /// `PowerDomainRegistry::acquire_noconf`
    PdAcquireNoconf(PowerDomain),
    /// `PowerDomainRegistry::release`
    PdRelease(PowerDomain),
    /// `PowerDomainRegistry::release_nowait` and its result.
    PdReleaseNowait {
        /// Domain released.
        domain: PowerDomain,
        /// The last reference was dropped.
        released: bool,
    },
    /// `WakeSourceController::add`
    PdcAdd(PdcSlot),
    /// `WakeSourceController::set`
    PdcSet(PdcSlot),
    /// `WakeSourceController::ack`
    PdcAck(PdcSlot),
    /// `WakeSourceController::ack_all`
    PdcAckAll(PdcMaster),
    /// Busy-wait through [`SimDelay`], in nanoseconds.
    BusyWait(u32),
    /// Raw register write.
    Write(SimRegister, u32),
}

#[derive(Debug, Clone, Copy)]
struct PdcEntry {
    trigger: PdcTrigger,
    master: PdcMaster,
    flags: PdcFlags,
    pending: bool,
}

#[derive(Debug)]
struct SimState {
    soc: SocConfig,
    regs: HashMap<SimRegister, u32>,
    held_pads: HashMap<u8, u32>,
    pads_while_asleep: HashMap<u8, u32>,
    events: Vec<SimEvent>,
    domains: HashMap<PowerDomain, u32>,
    pdc: Vec<PdcEntry>,
    nvic_pending: u64,
    nvic_enabled: u64,
    primask: bool,
    basepri: u32,
    sleep: SleepBehaviour,
    xtal_settles: bool,
    pll_locks: bool,
}

impl SimState {
    fn raw(&self, reg: SimRegister) -> u32 {
        self.regs.get(&reg).copied().unwrap_or_else(|| reg.reset_value())
    }

    fn field(&self, reg: SimRegister, field: Field) -> u32 {
        field.extract(self.raw(reg))
    }

    fn xtal_settled(&self) -> bool {
        self.xtal_settles
            && self.field(SimRegister::CrgXtal(CrgXtal::Xtal32mCtrl1), crg_xtal::XTAL_ENABLE) != 0
    }

    fn ldo_pll_ok(&self) -> bool {
        self.field(SimRegister::CrgXtal(CrgXtal::PllSysCtrl1), crg_xtal::LDO_PLL_ENABLE) != 0
    }

    fn pll_locked(&self) -> bool {
        self.pll_locks
            && self.ldo_pll_ok()
            && self.field(SimRegister::CrgXtal(CrgXtal::PllSysCtrl1), crg_xtal::PLL_EN) != 0
    }

    /// Register value as software reads it, with status bits derived.
    fn read(&self, reg: SimRegister) -> u32 {
        let raw = self.raw(reg);
        match reg {
            SimRegister::CrgXtal(CrgXtal::Xtal32mStat1) => {
                crg_xtal::XTAL_SETTLED.insert(raw, u32::from(self.xtal_settled()))
            }
            SimRegister::CrgXtal(CrgXtal::PllSysStatus) => {
                let raw = crg_xtal::LDO_PLL_OK.insert(raw, u32::from(self.ldo_pll_ok()));
                crg_xtal::PLL_LOCK_FINE.insert(raw, u32::from(self.pll_locked()))
            }
            SimRegister::CrgTop(CrgTop::ClkCtrl) => {
                let sel = crg_top::SYS_CLK_SEL.extract(raw);
                let running = [
                    (crg_top::RUNNING_AT_XTAL32M, sel == 0 && self.xtal_settled()),
                    (crg_top::RUNNING_AT_RC32M, sel == 1),
                    (crg_top::RUNNING_AT_LP_CLK, sel == 2),
                    (crg_top::RUNNING_AT_PLL96M, sel == 3 && self.pll_locked()),
                ];
                running
                    .into_iter()
                    .fold(raw, |acc, (field, on)| field.insert(acc, u32::from(on)))
            }
            SimRegister::Gpio(Gpio::SetPadLatch(_) | Gpio::ResetPadLatch(_))
            | SimRegister::Gpreg(Gpreg::ResetFreeze) => 0,
            _ => raw,
        }
    }

    fn write(&mut self, reg: SimRegister, value: u32) {
        self.events.push(SimEvent::Write(reg, value));
        match reg {
            SimRegister::Gpio(Gpio::SetPadLatch(port)) => {
                let latch = self.raw(SimRegister::Gpio(Gpio::PadLatch(port)));
                self.regs.insert(SimRegister::Gpio(Gpio::PadLatch(port)), latch | value);
            }
            SimRegister::Gpio(Gpio::ResetPadLatch(port)) => {
                let latch = self.raw(SimRegister::Gpio(Gpio::PadLatch(port)));
                let data = self.raw(SimRegister::Gpio(Gpio::Data(port)));
                let held = self.held_pads.get(&port).copied().unwrap_or(0);
                // Newly closed latches capture the current pad level.
                let closing = latch & value;
                self.held_pads.insert(port, (held & !closing) | (data & closing));
                self.regs.insert(SimRegister::Gpio(Gpio::PadLatch(port)), latch & !value);
            }
            SimRegister::Gpreg(Gpreg::SetFreeze) => {
                let frozen = self.raw(SimRegister::Gpreg(Gpreg::SetFreeze));
                self.regs.insert(SimRegister::Gpreg(Gpreg::SetFreeze), frozen | value);
            }
            SimRegister::Gpreg(Gpreg::ResetFreeze) => {
                let frozen = self.raw(SimRegister::Gpreg(Gpreg::SetFreeze));
                self.regs.insert(SimRegister::Gpreg(Gpreg::SetFreeze), frozen & !value);
            }
            _ => {
                self.regs.insert(reg, value);
            }
        }
    }

    fn pad_output(&self, port: u8) -> u32 {
        let latch = self.raw(SimRegister::Gpio(Gpio::PadLatch(port)));
        let data = self.raw(SimRegister::Gpio(Gpio::Data(port)));
        let held = self.held_pads.get(&port).copied().unwrap_or(0);
        (data & latch) | (held & !latch)
    }

    fn power_cycle_sys(&mut self) {
        self.regs.retain(|reg, _| !reg.in_sys_domain());
        // The boot ROM brings the core back up on RC32M.
        let clk = self.raw(SimRegister::CrgTop(CrgTop::ClkCtrl));
        self.regs.insert(
            SimRegister::CrgTop(CrgTop::ClkCtrl),
            crg_top::SYS_CLK_SEL.insert(clk, 1),
        );
    }

    fn pend_combo(&mut self) {
        for entry in &mut self.pdc {
            if entry.trigger == PdcTrigger::Combo {
                entry.pending = true;
            }
        }
    }

    fn apply_wake(&mut self, cause: WakeCause) {
        let irq = match cause {
            WakeCause::Timer => return,
            WakeCause::Jtag => None,
            WakeCause::Gpio => Some(Irq::KEY_WKUP_GPIO),
            WakeCause::Vbus => Some(Irq::VBUS),
            WakeCause::Cmac => Some(Irq::CMAC2SYS),
        };
        self.pend_combo();
        match irq {
            Some(irq) => self.nvic_pending |= irq_bit(irq),
            None => {
                let stat = self.raw(SimRegister::CrgTop(CrgTop::SysStat));
                self.regs.insert(
                    SimRegister::CrgTop(CrgTop::SysStat),
                    crg_top::DBG_IS_ACTIVE.insert(stat, 1),
                );
            }
        }
    }
}

fn irq_bit(irq: Irq) -> u64 {
    1u64.wrapping_shl(u32::from(irq.number()))
}

/// Simulated DA1469x/DA1470x.
#[derive(Debug, Clone)]
pub struct SimSoc {
    state: Arc<Mutex<SimState>>,
}

impl SimSoc {
    /// Power-on state for `soc`: PD_SYS and PD_AON held once (by the running
    /// core), RC32M system clock, RC32K low-power clock, VBAT high, all pads
    /// following their registers.
    pub fn new(soc: SocConfig) -> Self {
        let domains = PowerDomain::ALL
            .into_iter()
            .map(|d| (d, u32::from(matches!(d, PowerDomain::Sys | PowerDomain::Aon))))
            .collect();
        Self {
            state: Arc::new(Mutex::new(SimState {
                soc,
                regs: HashMap::new(),
                held_pads: HashMap::new(),
                pads_while_asleep: HashMap::new(),
                events: Vec::new(),
                domains,
                pdc: Vec::new(),
                nvic_pending: 0,
                nvic_enabled: 0,
                primask: false,
                basepri: 0,
                sleep: SleepBehaviour::Sleep(WakeCause::Timer),
                xtal_settles: true,
                pll_locks: true,
            })),
        }
    }

    /// A DA1469x.
    pub fn da1469x() -> Self {
        Self::new(SocConfig::DA1469X)
    }

    /// A DA1470x.
    pub fn da1470x() -> Self {
        Self::new(SocConfig::DA1470X)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The SoC descriptor this simulation was built for.
    pub fn soc(&self) -> SocConfig {
        self.lock().soc
    }

    // ── Test set-up ──────────────────────────────────────────────────────────

    /// Store a raw register value without logging a write.
    pub fn poke(&self, reg: SimRegister, value: u32) {
        self.lock().regs.insert(reg, value);
    }

    /// Register value as software would read it.
    pub fn peek(&self, reg: SimRegister) -> u32 {
        self.lock().read(reg)
    }

    /// Select the low-power clock.
    pub fn set_lp_clock(&self, clock: crate::clock::LowPowerClock) {
        let mut state = self.lock();
        let clk = state.raw(SimRegister::CrgTop(CrgTop::ClkCtrl));
        state.regs.insert(
            SimRegister::CrgTop(CrgTop::ClkCtrl),
            crg_top::LP_CLK_SEL.insert(clk, clock.bits()),
        );
    }

    /// Attach or detach the debugger.
    pub fn set_debugger_attached(&self, attached: bool) {
        let mut state = self.lock();
        let stat = state.raw(SimRegister::CrgTop(CrgTop::SysStat));
        state.regs.insert(
            SimRegister::CrgTop(CrgTop::SysStat),
            crg_top::DBG_IS_ACTIVE.insert(stat, u32::from(attached)),
        );
    }

    /// Drive the VBAT comparator.
    pub fn set_vbat_high(&self, high: bool) {
        let mut state = self.lock();
        let ana = state.raw(SimRegister::CrgTop(CrgTop::AnaStatus));
        state.regs.insert(
            SimRegister::CrgTop(CrgTop::AnaStatus),
            crg_top::COMP_VBAT_HIGH.insert(ana, u32::from(high)),
        );
    }

    /// Make XTAL32M settle (or never settle) once enabled.
    pub fn set_xtal_settles(&self, settles: bool) {
        self.lock().xtal_settles = settles;
    }

    /// Make the PLL lock (or never lock) once enabled.
    pub fn set_pll_locks(&self, locks: bool) {
        self.lock().pll_locks = locks;
    }

    /// Outcome of the next deep-sleep attempts.
    pub fn set_sleep_behaviour(&self, behaviour: SleepBehaviour) {
        self.lock().sleep = behaviour;
    }

    /// Set an interrupt line pending.
    pub fn pend_irq(&self, irq: Irq) {
        self.lock().nvic_pending |= irq_bit(irq);
    }

    /// Clear an interrupt line's pending bit.
    pub fn unpend_irq(&self, irq: Irq) {
        self.lock().nvic_pending &= !irq_bit(irq);
    }

    /// Enable an interrupt line in the NVIC.
    pub fn enable_irq_line(&self, irq: Irq) {
        self.lock().nvic_enabled |= irq_bit(irq);
    }

    /// Take an extra reference on `domain`, as another driver would.
    pub fn hold_domain(&self, domain: PowerDomain) {
        let mut state = self.lock();
        let count = state.domains.entry(domain).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Drop a reference taken with [`hold_domain`](Self::hold_domain).
    pub fn drop_domain(&self, domain: PowerDomain) {
        let mut state = self.lock();
        let count = state.domains.entry(domain).or_insert(0);
        *count = count.saturating_sub(1);
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    /// Every recorded event, oldest first.
    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().events.clone()
    }

    /// Forget recorded events.
    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Number of recorded events matching `pred`.
    pub fn count_events(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.lock().events.iter().filter(|e| pred(e)).count()
    }

    /// Current reference count of `domain`.
    pub fn domain_refcount(&self, domain: PowerDomain) -> u32 {
        self.lock().domains.get(&domain).copied().unwrap_or(0)
    }

    /// Registered PDC entries.
    pub fn pdc_entries(&self) -> Vec<(PdcTrigger, PdcMaster, PdcFlags)> {
        self.lock()
            .pdc
            .iter()
            .map(|e| (e.trigger, e.master, e.flags))
            .collect()
    }

    /// Level the pads of `port` drive right now.
    pub fn pad_output(&self, port: u8) -> u32 {
        self.lock().pad_output(port)
    }

    /// Level the pads of `port` drove while the last deep sleep was in effect.
    pub fn pads_while_asleep(&self, port: u8) -> Option<u32> {
        self.lock().pads_while_asleep.get(&port).copied()
    }

    /// `true` while PRIMASK is set.
    pub fn primask(&self) -> bool {
        self.lock().primask
    }

    /// Current BASEPRI.
    pub fn basepri(&self) -> u32 {
        self.lock().basepri
    }

    /// `true` when the PLL is enabled and locked.
    pub fn pll_running(&self) -> bool {
        self.lock().pll_locked()
    }

    /// A [`DelayNs`] that logs [`SimEvent::BusyWait`] on this SoC.
    pub fn delay(&self) -> SimDelay {
        SimDelay { soc: self.clone() }
    }
}

// ── Register files ───────────────────────────────────────────────────────────

macro_rules! sim_register_file {
    ($block:ty, $variant:ident) => {
        impl RegisterFile<$block> for SimSoc {
            fn read(&self, reg: $block) -> u32 {
                self.lock().read(SimRegister::$variant(reg))
            }

            fn write(&self, reg: $block, value: u32) {
                self.lock().write(SimRegister::$variant(reg), value);
            }
        }
    };
}

sim_register_file!(CrgTop, CrgTop);
sim_register_file!(CrgXtal, CrgXtal);
sim_register_file!(Gpreg, Gpreg);
sim_register_file!(SysWdog, SysWdog);
sim_register_file!(Dcdc, Dcdc);
sim_register_file!(Gpio, Gpio);

impl RegisterFile<TrimAddress> for SimSoc {
    fn read(&self, reg: TrimAddress) -> u32 {
        self.lock().read(SimRegister::Trim(reg.0))
    }

    fn write(&self, reg: TrimAddress, value: u32) {
        self.lock().write(SimRegister::Trim(reg.0), value);
    }
}

// ── Power domains ────────────────────────────────────────────────────────────

impl PowerDomainRegistry for SimSoc {
    fn acquire(&mut self, domain: PowerDomain) {
        let mut state = self.lock();
        let count = state.domains.entry(domain).or_insert(0);
        *count = count.saturating_add(1);
        state.events.push(SimEvent::PdAcquire(domain));
    }

    fn acquire_noconf(&mut self, domain: PowerDomain) {
        let mut state = self.lock();
        let count = state.domains.entry(domain).or_insert(0);
        *count = count.saturating_add(1);
        state.events.push(SimEvent::PdAcquireNoconf(domain));
    }

    fn release(&mut self, domain: PowerDomain) {
        let mut state = self.lock();
        let count = state.domains.entry(domain).or_insert(0);
        *count = count.saturating_sub(1);
        state.events.push(SimEvent::PdRelease(domain));
    }

    fn release_nowait(&mut self, domain: PowerDomain) -> bool {
        let mut state = self.lock();
        let count = state.domains.entry(domain).or_insert(0);
        *count = count.saturating_sub(1);
        let released = *count == 0;
        state
            .events
            .push(SimEvent::PdReleaseNowait { domain, released });
        released
    }
}

// ── PDC ──────────────────────────────────────────────────────────────────────

impl WakeSourceController for SimSoc {
    fn add(
        &mut self,
        trigger: PdcTrigger,
        master: PdcMaster,
        flags: PdcFlags,
    ) -> Result<PdcSlot, PdcError> {
        let mut state = self.lock();
        if state.pdc.len() >= PDC_ENTRIES {
            return Err(PdcError::TableFull);
        }
        let slot = PdcSlot::new(u8::try_from(state.pdc.len()).map_err(|_| PdcError::TableFull)?);
        state.pdc.push(PdcEntry {
            trigger,
            master,
            flags,
            pending: false,
        });
        state.events.push(SimEvent::PdcAdd(slot));
        Ok(slot)
    }

    fn set(&mut self, slot: PdcSlot) {
        let mut state = self.lock();
        if let Some(entry) = state.pdc.get_mut(usize::from(slot.index())) {
            entry.pending = true;
        }
        state.events.push(SimEvent::PdcSet(slot));
    }

    fn ack(&mut self, slot: PdcSlot) {
        let mut state = self.lock();
        if let Some(entry) = state.pdc.get_mut(usize::from(slot.index())) {
            entry.pending = false;
        }
        state.events.push(SimEvent::PdcAck(slot));
    }

    fn ack_all(&mut self, master: PdcMaster) {
        let mut state = self.lock();
        for entry in state.pdc.iter_mut().filter(|e| e.master == master) {
            entry.pending = false;
        }
        state.events.push(SimEvent::PdcAckAll(master));
    }

    fn is_pending(&self, slot: PdcSlot) -> bool {
        self.lock()
            .pdc
            .get(usize::from(slot.index()))
            .is_some_and(|e| e.pending)
    }
}

// ── Core ─────────────────────────────────────────────────────────────────────

impl Core for SimSoc {
    fn irq_lock(&mut self) -> u32 {
        let mut state = self.lock();
        let key = state.basepri;
        state.basepri = LOCKED_BASEPRI;
        state.events.push(SimEvent::IrqLock);
        key
    }

    fn irq_unlock(&mut self, key: u32) {
        let mut state = self.lock();
        state.basepri = key;
        state.events.push(SimEvent::IrqUnlock(key));
    }

    fn disable_irq(&mut self) {
        let mut state = self.lock();
        state.primask = true;
        state.events.push(SimEvent::DisableIrq);
    }

    fn enable_irq(&mut self) {
        let mut state = self.lock();
        state.primask = false;
        state.events.push(SimEvent::EnableIrq);
    }

    fn dsb(&mut self) {
        self.lock().events.push(SimEvent::Dsb);
    }

    fn wfi(&mut self) {
        self.lock().events.push(SimEvent::Wfi);
    }

    fn is_irq_pending(&self, irq: Irq) -> bool {
        self.lock().nvic_pending & irq_bit(irq) != 0
    }

    fn any_enabled_irq_pending(&self) -> bool {
        let state = self.lock();
        state.nvic_pending & state.nvic_enabled != 0
    }
}

impl SleepEntry for SimSoc {
    fn enter_deep_sleep(&mut self) -> bool {
        let mut state = self.lock();
        // A wake-up that is already pending for the core cancels the sleep.
        let pending_wake = state
            .pdc
            .iter()
            .any(|e| e.master == PdcMaster::M33 && e.pending);
        let behaviour = state.sleep;
        let slept = match behaviour {
            SleepBehaviour::Sleep(cause) if !pending_wake => {
                state.power_cycle_sys();
                let ports: Vec<u8> = state.soc.gpio_banks.iter().map(|b| b.port).collect();
                for port in ports {
                    let level = state.pad_output(port);
                    state.pads_while_asleep.insert(port, level);
                }
                state.apply_wake(cause);
                true
            }
            _ => false,
        };
        state.events.push(SimEvent::DeepSleep { slept });
        slept
    }
}

// ── Delay ────────────────────────────────────────────────────────────────────

/// Busy-wait provider that records its waits instead of spinning.
#[derive(Debug, Clone)]
pub struct SimDelay {
    soc: SimSoc,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.soc.lock().events.push(SimEvent::BusyWait(ns));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pll_status_follows_control_bits() {
        let soc = SimSoc::da1469x();
        assert!(!soc.is_set(CrgXtal::PllSysStatus, crg_xtal::LDO_PLL_OK));

        soc.set_bits(CrgXtal::PllSysCtrl1, crg_xtal::LDO_PLL_ENABLE);
        assert!(soc.is_set(CrgXtal::PllSysStatus, crg_xtal::LDO_PLL_OK));
        assert!(!soc.is_set(CrgXtal::PllSysStatus, crg_xtal::PLL_LOCK_FINE));

        soc.set_bits(CrgXtal::PllSysCtrl1, crg_xtal::PLL_EN);
        assert!(soc.is_set(CrgXtal::PllSysStatus, crg_xtal::PLL_LOCK_FINE));
        assert!(soc.pll_running());
    }

    #[test]
    fn irq_lock_masks_all_but_priority_zero() {
        let mut soc = SimSoc::da1469x();
        let key = soc.irq_lock();
        // Top 3 bits hold the priority.
        assert_eq!(soc.basepri() >> 5, 1);
        soc.irq_unlock(key);
        assert_eq!(soc.basepri(), 0);
    }

    #[test]
    fn running_at_reflects_selected_clock() {
        let soc = SimSoc::da1469x();
        assert!(soc.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_RC32M));

        soc.modify(CrgTop::ClkCtrl, crg_top::SYS_CLK_SEL, 0);
        // Crystal is still off.
        assert!(!soc.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_XTAL32M));

        soc.set_bits(CrgXtal::Xtal32mCtrl1, crg_xtal::XTAL_ENABLE);
        assert!(soc.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_XTAL32M));
        assert!(!soc.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_RC32M));
    }

    #[test]
    fn pad_latch_holds_level() {
        let soc = SimSoc::da1469x();
        soc.write(Gpio::Data(0), 0b1010);
        soc.write(Gpio::ResetPadLatch(0), u32::MAX);
        soc.write(Gpio::Data(0), 0);
        assert_eq!(soc.pad_output(0), 0b1010);

        soc.write(Gpio::SetPadLatch(0), u32::MAX);
        assert_eq!(soc.pad_output(0), 0);
    }

    #[test]
    fn freeze_register_sets_and_resets() {
        let soc = SimSoc::da1469x();
        soc.write(Gpreg::SetFreeze, 0b1000);
        soc.write(Gpreg::SetFreeze, 0b0001);
        assert_eq!(soc.read(Gpreg::SetFreeze), 0b1001);
        soc.write(Gpreg::ResetFreeze, 0b1000);
        assert_eq!(soc.read(Gpreg::SetFreeze), 0b0001);
    }

    #[test]
    fn release_nowait_reports_last_holder() {
        let mut soc = SimSoc::da1469x();
        soc.hold_domain(PowerDomain::Sys);
        assert!(!soc.release_nowait(PowerDomain::Sys));
        assert!(soc.release_nowait(PowerDomain::Sys));
        assert_eq!(soc.domain_refcount(PowerDomain::Sys), 0);
    }

    #[test]
    fn pdc_table_fills_up() {
        let mut soc = SimSoc::da1469x();
        for _ in 0..PDC_ENTRIES {
            soc.add(PdcTrigger::SwTrigger, PdcMaster::Cmac, PdcFlags::NONE)
                .unwrap();
        }
        assert_eq!(
            soc.add(PdcTrigger::Combo, PdcMaster::M33, PdcFlags::NONE),
            Err(PdcError::TableFull)
        );
    }

    #[test]
    fn pending_m33_entry_cancels_sleep() {
        let mut soc = SimSoc::da1469x();
        let slot = soc
            .add(PdcTrigger::SwTrigger, PdcMaster::M33, PdcFlags::NONE)
            .unwrap();
        soc.set(slot);
        assert!(!soc.enter_deep_sleep());

        soc.ack_all(PdcMaster::M33);
        assert!(soc.enter_deep_sleep());
    }

    #[test]
    fn deep_sleep_resets_sys_registers_only() {
        let mut soc = SimSoc::da1469x();
        soc.write(Gpio::Data(1), 0xFF);
        soc.write(Dcdc::Ctrl1, 1);
        soc.write(CrgTop::PowerCtrl, 0x1234);
        soc.set_sleep_behaviour(SleepBehaviour::Sleep(WakeCause::Timer));

        assert!(soc.enter_deep_sleep());
        assert_eq!(soc.read(Gpio::Data(1)), 0);
        assert_eq!(soc.read(Dcdc::Ctrl1), 0);
        assert_eq!(soc.read(CrgTop::PowerCtrl), 0x1234);
    }

    #[test]
    fn jtag_wake_pends_combo_and_attaches_debugger() {
        let mut soc = SimSoc::da1469x();
        let combo = soc
            .add(PdcTrigger::Combo, PdcMaster::M33, PdcFlags::EN_XTAL)
            .unwrap();
        soc.set_sleep_behaviour(SleepBehaviour::Sleep(WakeCause::Jtag));

        assert!(soc.enter_deep_sleep());
        assert!(soc.is_pending(combo));
        assert!(soc.is_set(CrgTop::SysStat, crg_top::DBG_IS_ACTIVE));
        assert!(!soc.is_irq_pending(Irq::KEY_WKUP_GPIO));
    }

    #[test]
    fn delay_records_busy_wait() {
        let soc = SimSoc::da1469x();
        let mut delay = soc.delay();
        delay.delay_us(20);
        assert!(soc.events().contains(&SimEvent::BusyWait(20_000)));
    }
}
