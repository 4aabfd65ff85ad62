//! Clock control: the shared system PLL and the oscillator/clock-select driver.
//!
//! # PLL reference counting
//!
//! The 96 MHz system PLL is shared by unrelated consumers (USB, display,
//! CPU boost). [`SysPll`] keeps one atomic holder count; only the caller that
//! observes the 0→1 transition starts the PLL and only the caller that
//! observes 1→0 stops it. The stop sequence re-checks the count before each
//! register clear, so a request that lands while the PLL is being stopped
//! finds it either still running or fully off, and restarts it in the
//! latter case.
//!
//! ```text
//!  request():  count.fetch_add(1) == 0 ?  ──yes──► pll_start()
//!  release():  count.fetch_sub(1) == 1 ?  ──yes──► pll_stop()
//! ```
//!
//! Each register update is a read-modify-write inside `critical_section::with`
//! because XTAL32M_CTRL1 is shared with [`ClockControl`]. The busy-waits of
//! the start sequence run with interrupts enabled.

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use platform::clock::{ClockSwitch, CrgTopExt, LowPowerClock, SysClock};
use platform::regs::{crg_top, crg_xtal, CrgTop, CrgXtal, Field, RegisterFile};

/// LDO_PLL settle time after enabling it.
pub const LDO_PLL_SETTLE_US: u32 = 20;
/// Loop-filter (Vtune) precharge time with PLL_RECALIB asserted.
pub const PLL_PRECHARGE_US: u32 = 10;
/// Extra margin after releasing the precharge.
pub const PLL_PRECHARGE_MARGIN_US: u32 = 5;

/// Polls before giving up on XTAL32M settling.
pub const XTAL32M_SETTLE_POLLS: u32 = 200;
/// Interval between XTAL32M settle polls.
pub const XTAL32M_POLL_INTERVAL_US: u32 = 10;

/// Clock subsystems [`ClockControl`] can switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSubsys {
    /// 32 kHz RC oscillator.
    Rc32k,
    /// RCX oscillator.
    Rcx,
    /// 32.768 kHz crystal.
    Xtal32k,
    /// 32 MHz RC oscillator.
    Rc32m,
    /// 32 MHz crystal.
    Xtal32m,
    /// 96 MHz system PLL.
    Pll96m,
}

impl ClockSubsys {
    /// Nominal output frequency in Hz.
    #[must_use]
    pub const fn nominal_hz(self) -> u32 {
        match self {
            Self::Rc32k => LowPowerClock::Rc32k.nominal_hz(),
            Self::Rcx => LowPowerClock::Rcx.nominal_hz(),
            Self::Xtal32k => LowPowerClock::Xtal32k.nominal_hz(),
            Self::Rc32m | Self::Xtal32m => 32_000_000,
            Self::Pll96m => 96_000_000,
        }
    }

    /// Datasheet name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rc32k => "RC32K",
            Self::Rcx => "RCX",
            Self::Xtal32k => "XTAL32K",
            Self::Rc32m => "RC32M",
            Self::Xtal32m => "XTAL32M",
            Self::Pll96m => "PLL96M",
        }
    }
}

/// Clock control errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// The clock is not running.
    Off(ClockSubsys),
    /// The clock drives the system or LP clock and cannot be stopped.
    InUse(ClockSubsys),
    /// The clock did not become ready in time.
    Timeout(ClockSubsys),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off(c) => write!(f, "clock {} is off", c.name()),
            Self::InUse(c) => write!(f, "clock {} is in use", c.name()),
            Self::Timeout(c) => write!(f, "clock {} did not become ready", c.name()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ClockError {}

// ── System PLL ───────────────────────────────────────────────────────────────

/// Reference-counted 96 MHz system PLL.
///
/// Callers pair every [`request`](Self::request) with exactly one
/// [`release`](Self::release). The pairing is a contract, not a runtime
/// check: an unmatched release trips a debug assertion and is otherwise
/// ignored.
pub struct SysPll<R, D> {
    regs: R,
    delay: Mutex<Cell<Option<D>>>,
    count: AtomicU32,
}

impl<R, D> SysPll<R, D>
where
    R: RegisterFile<CrgXtal>,
    D: DelayNs,
{
    /// PLL driver with no holders. `const` so it can live in a `static`.
    pub const fn new(regs: R, delay: D) -> Self {
        Self {
            regs,
            delay: Mutex::new(Cell::new(Some(delay))),
            count: AtomicU32::new(0),
        }
    }

    /// Take a reference on the PLL, starting it if this is the first one.
    pub fn request(&self) {
        if self.count.fetch_add(1, Ordering::SeqCst) != 0 {
            return;
        }
        debug!("starting system PLL");
        self.start();
    }

    /// Drop a reference on the PLL, stopping it if this was the last one.
    pub fn release(&self) {
        let prev = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match prev {
            Ok(1) => {
                debug!("stopping system PLL");
                self.stop();
            }
            Ok(_) => {}
            Err(_) => {
                warn!("system PLL released without a matching request");
                debug_assert!(false, "system PLL released without a matching request");
            }
        }
    }

    /// Current number of holders.
    pub fn lock_count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// `true` when PLL_LOCK_FINE is set.
    pub fn is_locked(&self) -> bool {
        self.regs.is_set(CrgXtal::PllSysStatus, crg_xtal::PLL_LOCK_FINE)
    }

    fn update(&self, reg: CrgXtal, field: Field, on: bool) {
        critical_section::with(|_| {
            self.regs.modify(reg, field, if on { field.max_value() } else { 0 });
        });
    }

    /// Wait with interrupts enabled. The delay is only borrowed under the
    /// critical section.
    fn busy_wait_us(&self, us: u32) {
        // Only the 0→1 winner waits, and it holds a reference until the
        // start sequence returns, so the slot is never found empty.
        let Some(mut delay) = critical_section::with(|cs| self.delay.borrow(cs).take()) else {
            warn!("PLL delay busy, {}us wait skipped", us);
            return;
        };
        delay.delay_us(us);
        critical_section::with(|cs| self.delay.borrow(cs).set(Some(delay)));
    }

    fn start(&self) {
        // The PLL reference is the crystal.
        self.update(CrgXtal::Xtal32mCtrl1, crg_xtal::XTAL_ENABLE, true);

        let ldo_enabled = critical_section::with(|_| {
            if self.regs.is_set(CrgXtal::PllSysStatus, crg_xtal::LDO_PLL_OK) {
                return false;
            }
            self.regs.set_bits(CrgXtal::PllSysCtrl1, crg_xtal::LDO_PLL_ENABLE);
            true
        });
        if ldo_enabled {
            self.busy_wait_us(LDO_PLL_SETTLE_US);
        }

        if critical_section::with(|_| self.is_locked()) {
            return;
        }

        self.update(CrgXtal::Xtal32mCtrl0, crg_xtal::DXTAL_SYSPLL_ENABLE, true);
        // Internal VCO current while the loop filter precharges.
        self.update(CrgXtal::PllSysCtrl1, crg_xtal::PLL_SEL_MIN_CUR_INT, true);
        self.update(CrgXtal::PllSysCtrl2, crg_xtal::PLL_RECALIB, true);
        self.update(CrgXtal::PllSysCtrl1, crg_xtal::PLL_EN, true);
        self.busy_wait_us(PLL_PRECHARGE_US);
        self.update(CrgXtal::PllSysCtrl2, crg_xtal::PLL_RECALIB, false);
        self.busy_wait_us(PLL_PRECHARGE_MARGIN_US);
        self.update(CrgXtal::PllSysCtrl1, crg_xtal::PLL_SEL_MIN_CUR_INT, false);
    }

    /// Clear PLL_EN, then LDO_PLL_ENABLE. Each clear happens only while the
    /// count is still zero; a request that arrived in between owns the PLL.
    fn stop(&self) {
        for field in [crg_xtal::PLL_EN, crg_xtal::LDO_PLL_ENABLE] {
            let cleared = critical_section::with(|_| {
                if self.count.load(Ordering::SeqCst) != 0 {
                    return false;
                }
                self.regs.clear_bits(CrgXtal::PllSysCtrl1, field);
                true
            });
            if !cleared {
                debug!("system PLL requested again while stopping");
                return;
            }
        }
    }
}

// ── Clock control ────────────────────────────────────────────────────────────

/// Oscillator enable, clock selection and rate queries.
///
/// PLL on/off requests are routed through the shared [`SysPll`] so that
/// they count as ordinary holders.
///
/// `P` is the PLL's busy-wait provider, `D` the one used to poll the
/// crystal; they are usually different instances.
pub struct ClockControl<'a, R, P, D> {
    regs: R,
    pll: &'a SysPll<R, P>,
    delay: D,
}

impl<'a, R, P, D> ClockControl<'a, R, P, D>
where
    R: RegisterFile<CrgTop> + RegisterFile<CrgXtal>,
    P: DelayNs,
    D: DelayNs,
{
    /// Clock driver sharing `pll` with the rest of the system.
    pub fn new(regs: R, pll: &'a SysPll<R, P>, delay: D) -> Self {
        Self { regs, pll, delay }
    }

    /// The shared PLL.
    pub fn pll(&self) -> &'a SysPll<R, P> {
        self.pll
    }

    fn osc_register(subsys: ClockSubsys) -> Option<CrgTop> {
        match subsys {
            ClockSubsys::Rc32k => Some(CrgTop::ClkRc32k),
            ClockSubsys::Rcx => Some(CrgTop::ClkRcx),
            ClockSubsys::Xtal32k => Some(CrgTop::ClkXtal32k),
            ClockSubsys::Rc32m => Some(CrgTop::ClkRc32m),
            ClockSubsys::Xtal32m | ClockSubsys::Pll96m => None,
        }
    }

    fn lp_subsys(clock: LowPowerClock) -> Option<ClockSubsys> {
        match clock {
            LowPowerClock::Rc32k => Some(ClockSubsys::Rc32k),
            LowPowerClock::Rcx => Some(ClockSubsys::Rcx),
            LowPowerClock::Xtal32k => Some(ClockSubsys::Xtal32k),
            LowPowerClock::External => None,
        }
    }

    fn sys_subsys(clock: SysClock) -> Option<ClockSubsys> {
        match clock {
            SysClock::Xtal32m => Some(ClockSubsys::Xtal32m),
            SysClock::Rc32m => Some(ClockSubsys::Rc32m),
            SysClock::Pll96m => Some(ClockSubsys::Pll96m),
            SysClock::LowPower => None,
        }
    }

    /// `true` when `subsys` is enabled (for the PLL: has holders and is locked).
    pub fn is_on(&self, subsys: ClockSubsys) -> bool {
        match subsys {
            ClockSubsys::Xtal32m => self.regs.is_set(CrgXtal::Xtal32mCtrl1, crg_xtal::XTAL_ENABLE),
            ClockSubsys::Pll96m => self.pll.lock_count() > 0 && self.pll.is_locked(),
            osc => Self::osc_register(osc)
                .is_some_and(|reg| self.regs.is_set(reg, crg_top::OSC_ENABLE)),
        }
    }

    /// Start `subsys`.
    pub fn on(&mut self, subsys: ClockSubsys) {
        trace!("clock on: {:?}", subsys);
        match subsys {
            ClockSubsys::Pll96m => self.pll.request(),
            ClockSubsys::Xtal32m => critical_section::with(|_| {
                self.regs.set_bits(CrgXtal::Xtal32mCtrl1, crg_xtal::XTAL_ENABLE);
            }),
            osc => {
                if let Some(reg) = Self::osc_register(osc) {
                    critical_section::with(|_| self.regs.set_bits(reg, crg_top::OSC_ENABLE));
                }
            }
        }
    }

    /// Stop `subsys`. Refuses to stop the clock that currently drives the
    /// system clock or the low-power clock.
    pub fn off(&mut self, subsys: ClockSubsys) -> Result<(), ClockError> {
        if Self::sys_subsys(self.regs.sys_clock()) == Some(subsys)
            || Self::lp_subsys(self.regs.lp_clock()) == Some(subsys)
        {
            return Err(ClockError::InUse(subsys));
        }
        trace!("clock off: {:?}", subsys);
        match subsys {
            ClockSubsys::Pll96m => self.pll.release(),
            ClockSubsys::Xtal32m => {
                if self.pll.lock_count() > 0 {
                    return Err(ClockError::InUse(subsys));
                }
                critical_section::with(|_| {
                    self.regs.clear_bits(CrgXtal::Xtal32mCtrl1, crg_xtal::XTAL_ENABLE);
                });
            }
            osc => {
                if let Some(reg) = Self::osc_register(osc) {
                    critical_section::with(|_| self.regs.clear_bits(reg, crg_top::OSC_ENABLE));
                }
            }
        }
        Ok(())
    }

    /// Nominal frequency of a running clock.
    pub fn rate(&self, subsys: ClockSubsys) -> Result<u32, ClockError> {
        if self.is_on(subsys) {
            Ok(subsys.nominal_hz())
        } else {
            Err(ClockError::Off(subsys))
        }
    }

    /// Select the low-power clock. The source must already be running,
    /// except for an external clock which software cannot observe.
    pub fn select_lp_clock(&mut self, clock: LowPowerClock) -> Result<(), ClockError> {
        if let Some(subsys) = Self::lp_subsys(clock) {
            if !self.is_on(subsys) {
                return Err(ClockError::Off(subsys));
            }
        }
        critical_section::with(|_| {
            self.regs.modify(CrgTop::ClkCtrl, crg_top::LP_CLK_SEL, clock.bits());
        });
        debug!("LP clock: {:?}", clock);
        Ok(())
    }

    /// Switch the system clock.
    ///
    /// XTAL32M goes through the safe switch. The PLL needs a holder and a
    /// lock, and is only reachable from a settled crystal.
    pub fn switch_sys_clock(&mut self, clock: SysClock) -> Result<(), ClockError> {
        match clock {
            SysClock::Xtal32m => return self.sys_xtal32m_switch_safe(),
            SysClock::Rc32m => {
                if !self.is_on(ClockSubsys::Rc32m) {
                    return Err(ClockError::Off(ClockSubsys::Rc32m));
                }
            }
            SysClock::Pll96m => {
                if !self.regs.is_set(CrgXtal::Xtal32mStat1, crg_xtal::XTAL_SETTLED) {
                    return Err(ClockError::Off(ClockSubsys::Xtal32m));
                }
                if !self.is_on(ClockSubsys::Pll96m) {
                    return Err(ClockError::Off(ClockSubsys::Pll96m));
                }
            }
            SysClock::LowPower => {}
        }
        critical_section::with(|_| {
            self.regs.modify(CrgTop::ClkCtrl, crg_top::SYS_CLK_SEL, clock.bits());
        });
        debug!("system clock: {:?}", clock);
        Ok(())
    }

    fn wait_for(&mut self, reg_ready: impl Fn(&R) -> bool) -> bool {
        for _ in 0..XTAL32M_SETTLE_POLLS {
            if reg_ready(&self.regs) {
                return true;
            }
            self.delay.delay_us(XTAL32M_POLL_INTERVAL_US);
        }
        reg_ready(&self.regs)
    }
}

impl<R, P, D> ClockSwitch for ClockControl<'_, R, P, D>
where
    R: RegisterFile<CrgTop> + RegisterFile<CrgXtal>,
    P: DelayNs,
    D: DelayNs,
{
    type Error = ClockError;

    fn sys_xtal32m_switch_safe(&mut self) -> Result<(), ClockError> {
        if self.regs.sys_clock() == SysClock::Xtal32m
            && self.regs.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_XTAL32M)
        {
            return Ok(());
        }

        critical_section::with(|_| {
            self.regs.set_bits(CrgXtal::Xtal32mCtrl1, crg_xtal::XTAL_ENABLE);
        });
        if !self.wait_for(|r| r.is_set(CrgXtal::Xtal32mStat1, crg_xtal::XTAL_SETTLED)) {
            warn!("XTAL32M did not settle");
            return Err(ClockError::Timeout(ClockSubsys::Xtal32m));
        }

        critical_section::with(|_| {
            self.regs
                .modify(CrgTop::ClkCtrl, crg_top::SYS_CLK_SEL, SysClock::Xtal32m.bits());
        });
        if !self.wait_for(|r| r.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_XTAL32M)) {
            warn!("system clock did not move to XTAL32M");
            return Err(ClockError::Timeout(ClockSubsys::Xtal32m));
        }
        trace!("system clock back on XTAL32M");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use platform::mocks::{SimEvent, SimRegister, SimSoc};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn recalib_pulses(soc: &SimSoc) -> usize {
        let mut pulses = 0;
        let mut prev = false;
        for event in soc.events() {
            if let SimEvent::Write(SimRegister::CrgXtal(CrgXtal::PllSysCtrl2), value) = event {
                let now = crg_xtal::PLL_RECALIB.extract(value) != 0;
                if now && !prev {
                    pulses += 1;
                }
                prev = now;
            }
        }
        pulses
    }

    #[test]
    fn first_request_starts_with_precharge() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), soc.delay());

        pll.request();

        assert_eq!(pll.lock_count(), 1);
        assert!(soc.pll_running());
        assert_eq!(recalib_pulses(&soc), 1);
        // Precharge released and internal current deselected afterwards.
        assert!(!soc.is_set(CrgXtal::PllSysCtrl2, crg_xtal::PLL_RECALIB));
        assert!(!soc.is_set(CrgXtal::PllSysCtrl1, crg_xtal::PLL_SEL_MIN_CUR_INT));
        assert_eq!(
            soc.count_events(|e| matches!(e, SimEvent::BusyWait(_))),
            3,
            "LDO settle, precharge, margin"
        );
    }

    #[test]
    fn busy_waits_follow_sequence_timing() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), soc.delay());
        pll.request();

        let waits: Vec<u32> = soc
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SimEvent::BusyWait(ns) => Some(ns),
                _ => None,
            })
            .collect();
        assert_eq!(waits, vec![20_000, 10_000, 5_000]);
    }

    #[test]
    fn ldo_already_ok_skips_settle_wait() {
        let soc = SimSoc::da1469x();
        soc.set_bits(CrgXtal::PllSysCtrl1, crg_xtal::LDO_PLL_ENABLE);
        let pll = SysPll::new(soc.clone(), soc.delay());

        pll.request();

        assert!(!soc.events().contains(&SimEvent::BusyWait(20_000)));
        assert!(soc.pll_running());
    }

    #[test]
    fn nested_requests_touch_hardware_once() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());

        pll.request();
        let writes_after_first = soc.events().len();
        pll.request();
        pll.request();

        assert_eq!(pll.lock_count(), 3);
        assert_eq!(soc.events().len(), writes_after_first);
        assert_eq!(recalib_pulses(&soc), 1);
    }

    #[test]
    fn last_release_stops_pll() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());

        pll.request();
        pll.request();
        pll.release();
        assert!(soc.pll_running());

        pll.release();
        assert!(!soc.pll_running());
        assert!(!soc.is_set(CrgXtal::PllSysCtrl1, crg_xtal::PLL_EN));
        assert!(!soc.is_set(CrgXtal::PllSysCtrl1, crg_xtal::LDO_PLL_ENABLE));
        assert_eq!(pll.lock_count(), 0);
    }

    #[test]
    fn restart_after_stop_precharges_again() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());

        pll.request();
        pll.release();
        pll.request();

        assert_eq!(recalib_pulses(&soc), 2);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "without a matching request"))]
    fn unmatched_release_is_a_contract_violation() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        pll.release();
        assert_eq!(pll.lock_count(), 0);
    }

    type Hook = Rc<RefCell<Option<Box<dyn Fn()>>>>;

    /// Register file that runs a hook once, right after a write that leaves
    /// PLL_EN clear. Stands in for an interrupt taken between two register
    /// updates of the stop sequence.
    struct InterruptingRegs {
        soc: SimSoc,
        after_pll_off: Hook,
    }

    impl RegisterFile<CrgXtal> for InterruptingRegs {
        fn read(&self, reg: CrgXtal) -> u32 {
            self.soc.read(reg)
        }

        fn write(&self, reg: CrgXtal, value: u32) {
            self.soc.write(reg, value);
            if reg == CrgXtal::PllSysCtrl1 && crg_xtal::PLL_EN.extract(value) == 0 {
                let hook = self.after_pll_off.borrow_mut().take();
                if let Some(hook) = hook {
                    hook();
                }
            }
        }
    }

    #[test]
    fn request_during_stop_keeps_pll_running() {
        let soc = SimSoc::da1469x();
        let hook: Hook = Rc::new(RefCell::new(None));
        let regs = InterruptingRegs { soc: soc.clone(), after_pll_off: Rc::clone(&hook) };
        let pll = Rc::new(SysPll::new(regs, NoopDelay::new()));
        pll.request();

        let isr = Rc::clone(&pll);
        *hook.borrow_mut() = Some(Box::new(move || isr.request()));
        pll.release();

        assert!(hook.borrow().is_none(), "interrupt never fired");
        assert_eq!(pll.lock_count(), 1);
        assert!(soc.pll_running());
        assert!(soc.is_set(CrgXtal::PllSysCtrl1, crg_xtal::LDO_PLL_ENABLE));
        assert_eq!(recalib_pulses(&soc), 2);
    }

    /// Delay that checks, on every wait, whether another thread can enter a
    /// critical section while the wait is in progress.
    struct InterruptsEnabledDelay {
        open: Rc<Cell<usize>>,
        blocked: Rc<Cell<usize>>,
    }

    impl DelayNs for InterruptsEnabledDelay {
        fn delay_ns(&mut self, _ns: u32) {
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                critical_section::with(|_| ());
                let _ = tx.send(());
            });
            let counter = if rx.recv_timeout(Duration::from_secs(1)).is_ok() {
                &self.open
            } else {
                &self.blocked
            };
            counter.set(counter.get() + 1);
        }
    }

    #[test]
    fn start_waits_outside_critical_section() {
        let soc = SimSoc::da1469x();
        let open = Rc::new(Cell::new(0));
        let blocked = Rc::new(Cell::new(0));
        let delay = InterruptsEnabledDelay { open: Rc::clone(&open), blocked: Rc::clone(&blocked) };
        let pll = SysPll::new(soc.clone(), delay);

        pll.request();

        assert_eq!(blocked.get(), 0);
        assert_eq!(open.get(), 3, "LDO settle, precharge, margin");
        assert!(soc.pll_running());

        // The delay went back in its slot: a restart waits again.
        pll.release();
        pll.request();
        assert_eq!(open.get(), 6);
    }

    #[test]
    fn xtal_switch_waits_for_settle() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let mut clocks = ClockControl::new(soc.clone(), &pll, soc.delay());

        clocks.sys_xtal32m_switch_safe().unwrap();

        assert_eq!(soc.sys_clock(), SysClock::Xtal32m);
        assert!(soc.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_XTAL32M));
    }

    #[test]
    fn xtal_switch_times_out_without_touching_sys_clk() {
        let soc = SimSoc::da1469x();
        soc.set_xtal_settles(false);
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let mut clocks = ClockControl::new(soc.clone(), &pll, soc.delay());

        assert_eq!(
            clocks.sys_xtal32m_switch_safe(),
            Err(ClockError::Timeout(ClockSubsys::Xtal32m))
        );
        assert_eq!(soc.sys_clock(), SysClock::Rc32m);
        assert_eq!(
            soc.count_events(|e| matches!(e, SimEvent::BusyWait(_))),
            XTAL32M_SETTLE_POLLS as usize
        );
    }

    #[test]
    fn xtal_switch_is_noop_when_already_running() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let mut clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());
        clocks.sys_xtal32m_switch_safe().unwrap();
        soc.clear_events();

        clocks.sys_xtal32m_switch_safe().unwrap();
        assert!(soc.events().is_empty());
    }

    #[test]
    fn pll_on_off_counts_as_holder() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let mut clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());

        clocks.on(ClockSubsys::Pll96m);
        pll.request();
        assert_eq!(pll.lock_count(), 2);
        assert_eq!(clocks.rate(ClockSubsys::Pll96m), Ok(96_000_000));

        clocks.off(ClockSubsys::Pll96m).unwrap();
        assert!(soc.pll_running());
        pll.release();
        assert_eq!(
            clocks.rate(ClockSubsys::Pll96m),
            Err(ClockError::Off(ClockSubsys::Pll96m))
        );
    }

    #[test]
    fn cannot_stop_active_clocks() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let mut clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());

        // Reset state: RC32M drives the system, RC32K the LP domain.
        assert_eq!(
            clocks.off(ClockSubsys::Rc32m),
            Err(ClockError::InUse(ClockSubsys::Rc32m))
        );
        assert_eq!(
            clocks.off(ClockSubsys::Rc32k),
            Err(ClockError::InUse(ClockSubsys::Rc32k))
        );

        clocks.on(ClockSubsys::Pll96m);
        assert_eq!(
            clocks.off(ClockSubsys::Xtal32m),
            Err(ClockError::InUse(ClockSubsys::Xtal32m))
        );
    }

    #[test]
    fn lp_clock_selection_requires_running_source() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let mut clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());

        assert_eq!(
            clocks.select_lp_clock(LowPowerClock::Xtal32k),
            Err(ClockError::Off(ClockSubsys::Xtal32k))
        );

        clocks.on(ClockSubsys::Xtal32k);
        clocks.select_lp_clock(LowPowerClock::Xtal32k).unwrap();
        assert_eq!(soc.lp_clock(), LowPowerClock::Xtal32k);
        assert_eq!(clocks.rate(ClockSubsys::Xtal32k), Ok(32_768));

        clocks.off(ClockSubsys::Rc32k).unwrap();
        assert_eq!(
            clocks.rate(ClockSubsys::Rc32k),
            Err(ClockError::Off(ClockSubsys::Rc32k))
        );
    }

    #[test]
    fn pll_sys_clock_needs_crystal_and_lock() {
        let soc = SimSoc::da1469x();
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let mut clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());

        assert_eq!(
            clocks.switch_sys_clock(SysClock::Pll96m),
            Err(ClockError::Off(ClockSubsys::Xtal32m))
        );

        clocks.switch_sys_clock(SysClock::Xtal32m).unwrap();
        assert_eq!(
            clocks.switch_sys_clock(SysClock::Pll96m),
            Err(ClockError::Off(ClockSubsys::Pll96m))
        );

        clocks.on(ClockSubsys::Pll96m);
        clocks.switch_sys_clock(SysClock::Pll96m).unwrap();
        assert!(soc.is_set(CrgTop::ClkCtrl, crg_top::RUNNING_AT_PLL96M));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            ClockError::Timeout(ClockSubsys::Xtal32m).to_string(),
            "clock XTAL32M did not become ready"
        );
    }
}
