//! Application-core primitives.
//!
//! The power manager never touches the CPU directly: interrupt masking,
//! barriers, WFI and NVIC queries go through [`Core`], and the jump into
//! extended sleep (plus the context restore on the way back) goes through
//! [`SleepEntry`].

/// NVIC interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Irq(u16);

impl Irq {
    /// CMAC to system mailbox.
    pub const CMAC2SYS: Irq = Irq(4);
    /// Wake-up controller (GPIO key wake-up).
    pub const KEY_WKUP_GPIO: Irq = Irq(19);
    /// VBUS attach/detach.
    pub const VBUS: Irq = Irq(21);
    /// XTAL32M ready.
    pub const XTAL32M_RDY: Irq = Irq(26);
    /// PLL lock.
    pub const PLL_LOCK: Irq = Irq(33);

    /// Number of interrupt lines the NVIC implements on this family.
    pub const COUNT: u16 = 40;

    /// Wrap a raw IRQ number.
    #[must_use]
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    /// Raw IRQ number.
    #[must_use]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Index of the 32-bit ISER/ISPR word holding this line.
    #[must_use]
    pub const fn word(self) -> usize {
        self.0.wrapping_shr(5) as usize
    }

    /// Bit of this line within its ISER/ISPR word.
    #[must_use]
    pub const fn mask(self) -> u32 {
        1u32.wrapping_shl((self.0 & 31) as u32)
    }
}

/// Interrupt masking, barriers and NVIC status for the application core.
pub trait Core {
    /// Raise the priority mask (BASEPRI) so that only zero-latency exceptions
    /// are taken. Returns the previous mask for [`irq_unlock`](Self::irq_unlock).
    fn irq_lock(&mut self) -> u32;

    /// Restore the priority mask returned by [`irq_lock`](Self::irq_lock).
    fn irq_unlock(&mut self, key: u32);

    /// Mask every configurable interrupt (PRIMASK). Unlike the priority mask,
    /// pending interrupts still end a WFI.
    fn disable_irq(&mut self);

    /// Clear PRIMASK.
    fn enable_irq(&mut self);

    /// Data synchronisation barrier.
    fn dsb(&mut self);

    /// Wait for interrupt.
    fn wfi(&mut self);

    /// `true` when `irq` is pending in the NVIC, enabled or not.
    fn is_irq_pending(&self, irq: Irq) -> bool;

    /// `true` when any interrupt is both enabled and pending.
    fn any_enabled_irq_pending(&self) -> bool;
}

/// Entry into extended sleep.
///
/// Saves the CPU context, powers PD_SYS down and halts. On a real wake-up the
/// boot ROM jumps to the resume handler, which restores the context and
/// returns from this call with `true`. If a wake event was already pending,
/// the sleep is abandoned before power-down and the call returns `false`.
pub trait SleepEntry {
    /// Attempt extended sleep. Returns whether the core actually slept.
    fn enter_deep_sleep(&mut self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_word_and_mask() {
        assert_eq!(Irq::CMAC2SYS.word(), 0);
        assert_eq!(Irq::CMAC2SYS.mask(), 1 << 4);
        assert_eq!(Irq::PLL_LOCK.word(), 1);
        assert_eq!(Irq::PLL_LOCK.mask(), 1 << 1);
    }
}
