//! Idle-path entry, as the host power-management framework drives it.
//!
//! The framework masks interrupts by priority, hands the chosen state to the
//! registered hooks, runs its own wake-up handlers and finally calls the
//! exit hook. [`suspend`] performs that sequence against a
//! [`PowerManager`](crate::power::PowerManager) so that boards without a
//! framework (and the tests) exercise the same two-phase exit.

use platform::clock::ClockSwitch;
use platform::cpu::Core;
use platform::power::{PmHardware, PmState, PmStateHooks};

use crate::power::PowerManager;

/// Substate passed to the hooks. The SoC defines none.
pub const DEFAULT_SUBSTATE: u8 = 0;

/// Enter `state` from the idle loop and return once the core runs again.
///
/// Interrupts are unmasked on return.
pub fn suspend<H, C>(pm: &mut PowerManager<H, C>, state: PmState)
where
    H: PmHardware,
    C: ClockSwitch,
{
    let key = Core::irq_lock(pm.hardware_mut());
    pm.set_state(state, DEFAULT_SUBSTATE);
    pm.exit_post_ops(state, DEFAULT_SUBSTATE);
    Core::irq_unlock(pm.hardware_mut(), key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use platform::clock::LowPowerClock;
    use platform::config::BoardConfig;
    use platform::mocks::{SimEvent, SimSoc};

    use crate::clock_control::{ClockControl, SysPll};

    #[test]
    fn standby_leaves_interrupts_unmasked() {
        let soc = SimSoc::da1469x();
        soc.set_lp_clock(LowPowerClock::Xtal32k);
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());
        let mut pm = PowerManager::new(soc.clone(), clocks, BoardConfig::DA1469X_DEFAULT).unwrap();

        suspend(&mut pm, PmState::Standby);

        assert!(!soc.primask());
        assert_eq!(soc.basepri(), 0);
        assert_eq!(soc.count_events(|e| matches!(e, SimEvent::DeepSleep { slept: true })), 1);
    }

    #[test]
    fn unsupported_state_is_ignored() {
        let soc = SimSoc::da1469x();
        soc.set_lp_clock(LowPowerClock::Xtal32k);
        let pll = SysPll::new(soc.clone(), NoopDelay::new());
        let clocks = ClockControl::new(soc.clone(), &pll, NoopDelay::new());
        let mut pm = PowerManager::new(soc.clone(), clocks, BoardConfig::DA1469X_DEFAULT).unwrap();
        soc.clear_events();

        suspend(&mut pm, PmState::SuspendToRam);

        assert_eq!(
            soc.events(),
            vec![
                SimEvent::IrqLock,
                SimEvent::EnableIrq,
                SimEvent::IrqUnlock(0),
            ]
        );
    }
}
