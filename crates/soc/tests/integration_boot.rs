//! Boot-to-first-sleep integration tests
//!
//! Runs the bring-up a board performs (SoC init, domain trims, power manager
//! construction) and then the idle path, all on the simulated SoC.
//!
//! Run with: cargo test -p soc --test integration_boot
// Integration test file: unwrap/indexing/arithmetic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use embedded_hal_mock::eh1::delay::NoopDelay;
use platform::clock::{ClockSwitch, CrgTopExt, LowPowerClock, SysClock};
use platform::config::BoardConfig;
use platform::mocks::{SimEvent, SimRegister, SimSoc};
use platform::power::{PmState, PowerDomain};
use platform::regs::{gpreg, Gpreg, RegisterFile, TrimAddress};
use soc::boot::{apply_preferred, soc_init, BOOT_SEQUENCE_STEPS};
use soc::clock_control::{ClockControl, ClockSubsys, SysPll};
use soc::idle::suspend;
use soc::power::PowerManager;

// ─── Bring-up ────────────────────────────────────────────────────────────────

#[test]
fn boot_sequence_has_four_steps() {
    assert_eq!(BOOT_SEQUENCE_STEPS.len(), 4);
}

#[test]
fn watchdog_frozen_before_wake_sources_registered() {
    let soc = SimSoc::da1469x();

    soc_init(&soc);
    let pm = PowerManager::new(soc.clone(), NoopSwitch, BoardConfig::DA1469X_DEFAULT).unwrap();

    let events = soc.events();
    let freeze = events
        .iter()
        .position(|e| {
            matches!(e, SimEvent::Write(SimRegister::Gpreg(Gpreg::SetFreeze), _))
        })
        .unwrap();
    let first_add = events
        .iter()
        .position(|e| matches!(e, SimEvent::PdcAdd(_)))
        .unwrap();
    assert!(freeze < first_add);
    assert!(soc.is_set(Gpreg::SetFreeze, gpreg::FRZ_SYS_WDOG));
    assert_eq!(soc.pdc_entries().len(), 2);
    assert!(!pm.waiting_for_jtag());
}

#[test]
fn domain_trims_applied_on_power_up() {
    let soc = SimSoc::da1470x();
    soc_init(&soc);

    for domain in [PowerDomain::Aon, PowerDomain::Sys, PowerDomain::Tim] {
        apply_preferred(&soc, domain);
    }

    assert_eq!(soc.read(TrimAddress(0x5000_00a4)), 0x0000_00ca);
    assert_eq!(soc.read(TrimAddress(0x5004_0454)), 0x0000_0002);
    assert_eq!(soc.read(TrimAddress(0x5001_0040)), 0x00c0_0000);
}

// ─── First idle ──────────────────────────────────────────────────────────────

struct NoopSwitch;

impl ClockSwitch for NoopSwitch {
    type Error = ();

    fn sys_xtal32m_switch_safe(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

#[test]
fn boot_then_idle_returns_on_crystal_with_interrupts_open() {
    let soc = SimSoc::da1469x();
    soc_init(&soc);
    let pll = SysPll::new(soc.clone(), NoopDelay::new());
    let mut clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());
    clocks.switch_sys_clock(SysClock::Xtal32m).unwrap();
    clocks.on(ClockSubsys::Xtal32k);
    clocks.select_lp_clock(LowPowerClock::Xtal32k).unwrap();
    assert_eq!(soc.lp_clock(), LowPowerClock::Xtal32k);

    let mut pm = PowerManager::new(soc.clone(), clocks, BoardConfig::DA1469X_DEFAULT).unwrap();
    soc.clear_events();

    suspend(&mut pm, PmState::Standby);

    assert_eq!(soc.count_events(|e| *e == SimEvent::DeepSleep { slept: true }), 1);
    assert_eq!(soc.sys_clock(), SysClock::Xtal32m);
    assert!(soc.is_set(Gpreg::SetFreeze, gpreg::FRZ_SYS_WDOG));
    assert_eq!(soc.domain_refcount(PowerDomain::Sys), 1);
    assert!(!soc.primask());
    assert_eq!(soc.basepri(), 0);
}

#[test]
fn idle_without_slow_clock_stays_shallow() {
    let soc = SimSoc::da1470x();
    soc_init(&soc);
    let mut pm = PowerManager::new(soc.clone(), NoopSwitch, BoardConfig::DA1470X_DEFAULT).unwrap();
    soc.clear_events();

    for _ in 0..10 {
        suspend(&mut pm, PmState::Standby);
    }

    assert_eq!(soc.count_events(|e| *e == SimEvent::Wfi), 10);
    assert_eq!(soc.count_events(|e| matches!(e, SimEvent::DeepSleep { .. })), 0);
    assert!(!soc.primask());
}
