//! Cortex-M33 implementation of [`Core`], plus system reset.
//!
//! Only built with the `hardware` feature. Deep-sleep entry needs the vendor
//! context save/restore and is provided by the board as [`SleepEntry`](platform::cpu::SleepEntry).

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::{NVIC, SCB};
use cortex_m::register::{basepri, basepri_max};
use platform::cpu::{Core, Irq};

/// BASEPRI installed by [`Core::irq_lock`]. With 3 implemented priority bits
/// this is priority 1, so only priority 0 (zero-latency) stays live.
pub const LOCKED_BASEPRI: u8 = 0x20;

/// Priority bits implemented by the NVIC.
const NVIC_PRIO_BITS: u8 = 3;

// Masks priority values 1 to 7.
const _: () = assert!(LOCKED_BASEPRI >> (8 - NVIC_PRIO_BITS) == 1);

#[derive(Clone, Copy)]
struct Line(u16);

// SAFETY: `Line` only ever wraps numbers below `Irq::COUNT`, all of which
// are valid external interrupts on this SoC.
unsafe impl InterruptNumber for Line {
    fn number(self) -> u16 {
        self.0
    }
}

/// The application core.
#[derive(Debug, Default)]
pub struct CortexM33 {
    _private: (),
}

impl CortexM33 {
    /// Handle to the running core.
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

fn line(irq: Irq) -> Option<Line> {
    (irq.number() < Irq::COUNT).then_some(Line(irq.number()))
}

impl Core for CortexM33 {
    fn irq_lock(&mut self) -> u32 {
        let key = basepri::read();
        basepri_max::write(LOCKED_BASEPRI);
        u32::from(key)
    }

    fn irq_unlock(&mut self, key: u32) {
        let key = u8::try_from(key).unwrap_or(0);
        // SAFETY: restores a BASEPRI value previously returned by `irq_lock`
        // (or 0). Lowering the mask cannot break a critical section here: the
        // caller owns the lock being released.
        unsafe { basepri::write(key) };
    }

    fn disable_irq(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn enable_irq(&mut self) {
        // SAFETY: called on the idle path outside any `critical_section::with`.
        unsafe { cortex_m::interrupt::enable() };
    }

    fn dsb(&mut self) {
        cortex_m::asm::dsb();
    }

    fn wfi(&mut self) {
        cortex_m::asm::wfi();
    }

    fn is_irq_pending(&self, irq: Irq) -> bool {
        line(irq).is_some_and(NVIC::is_pending)
    }

    fn any_enabled_irq_pending(&self) -> bool {
        (0..Irq::COUNT)
            .map(Line)
            .any(|l| NVIC::is_enabled(l) && NVIC::is_pending(l))
    }
}

/// Reset the SoC.
pub fn reboot() -> ! {
    SCB::sys_reset()
}
