//! Clock sources and system-clock switching.

use crate::regs::{crg_top, CrgTop, RegisterFile};

/// Low-power clock source (CLK_CTRL.LP_CLK_SEL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LowPowerClock {
    /// Internal 32 kHz RC oscillator.
    Rc32k,
    /// Internal RCX oscillator.
    Rcx,
    /// External 32.768 kHz crystal.
    Xtal32k,
    /// External square-wave input.
    External,
}

impl LowPowerClock {
    /// Decode LP_CLK_SEL.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Self::Rc32k,
            1 => Self::Rcx,
            2 => Self::Xtal32k,
            _ => Self::External,
        }
    }

    /// Encode for LP_CLK_SEL.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Rc32k => 0,
            Self::Rcx => 1,
            Self::Xtal32k => 2,
            Self::External => 3,
        }
    }

    /// Extended sleep keeps only the LP clock running, and RC32K is too
    /// inaccurate to time the wake-up.
    #[must_use]
    pub const fn supports_extended_sleep(self) -> bool {
        !matches!(self, Self::Rc32k)
    }

    /// Nominal frequency in Hz. RCX is calibrated at runtime; the value here is
    /// its nominal rate.
    #[must_use]
    pub const fn nominal_hz(self) -> u32 {
        match self {
            Self::Rc32k => 32_000,
            Self::Rcx => 15_000,
            Self::Xtal32k | Self::External => 32_768,
        }
    }
}

/// System clock source (CLK_CTRL.SYS_CLK_SEL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysClock {
    /// 32 MHz crystal.
    Xtal32m,
    /// 32 MHz RC oscillator (reset default).
    Rc32m,
    /// The low-power clock.
    LowPower,
    /// 96 MHz system PLL.
    Pll96m,
}

impl SysClock {
    /// Decode SYS_CLK_SEL.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Self::Xtal32m,
            1 => Self::Rc32m,
            2 => Self::LowPower,
            _ => Self::Pll96m,
        }
    }

    /// Encode for SYS_CLK_SEL.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Xtal32m => 0,
            Self::Rc32m => 1,
            Self::LowPower => 2,
            Self::Pll96m => 3,
        }
    }
}

/// Switches the system clock back onto the 32 MHz crystal after wake-up.
///
/// The crystal is off while PD_SYS is down, so the switch has to wait for it
/// to settle before SYS_CLK_SEL may point at it.
pub trait ClockSwitch {
    /// Error reported when the crystal does not settle.
    type Error: core::fmt::Debug;

    /// Enable XTAL32M, wait until it settles, then select it as system clock.
    fn sys_xtal32m_switch_safe(&mut self) -> Result<(), Self::Error>;
}

impl<T: ClockSwitch + ?Sized> ClockSwitch for &mut T {
    type Error = T::Error;

    fn sys_xtal32m_switch_safe(&mut self) -> Result<(), Self::Error> {
        (**self).sys_xtal32m_switch_safe()
    }
}

/// Named CRG_TOP queries used by the sleep gate and the regulator.
pub trait CrgTopExt: RegisterFile<CrgTop> {
    /// Currently selected low-power clock.
    fn lp_clock(&self) -> LowPowerClock {
        LowPowerClock::from_bits(self.field(CrgTop::ClkCtrl, crg_top::LP_CLK_SEL))
    }

    /// Currently selected system clock.
    fn sys_clock(&self) -> SysClock {
        SysClock::from_bits(self.field(CrgTop::ClkCtrl, crg_top::SYS_CLK_SEL))
    }

    /// `true` while a debugger holds the debug port.
    fn debugger_active(&self) -> bool {
        self.is_set(CrgTop::SysStat, crg_top::DBG_IS_ACTIVE)
    }

    /// Battery comparator: VBAT is high enough for the DC-DC converter.
    fn vbat_high(&self) -> bool {
        self.is_set(CrgTop::AnaStatus, crg_top::COMP_VBAT_HIGH)
    }
}

impl<T: RegisterFile<CrgTop> + ?Sized> CrgTopExt for T {}
