//! SoC and board descriptors
//!
//! The DA1469x and DA1470x differ in which GPIO banks exist and in which
//! registers need software help to survive a PD_SYS power cycle. Those
//! differences are data: a [`SocConfig`] is chosen at build time and handed to
//! the power manager, which turns every absent capability into a no-op.

use crate::clock::SysClock;
use crate::pdc::PdcFlags;

/// One GPIO port and the number of pins it implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioBank {
    /// Port number.
    pub port: u8,
    /// Implemented pins, counted from pin 0.
    pub pins: u8,
}

impl GpioBank {
    /// Bit mask of the implemented pins.
    #[must_use]
    pub const fn pin_mask(self) -> u32 {
        if self.pins >= 32 {
            u32::MAX
        } else {
            1u32.wrapping_shl(self.pins as u32).wrapping_sub(1)
        }
    }
}

/// Most GPIO banks any supported SoC has.
pub const MAX_GPIO_BANKS: usize = 3;

/// Most pins per GPIO bank.
pub const MAX_PINS_PER_BANK: usize = 32;

/// Static description of one SoC family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocConfig {
    /// Marketing name.
    pub name: &'static str,
    /// Implemented GPIO banks.
    pub gpio_banks: &'static [GpioBank],
    /// Pads lose their state when PD_SYS goes down unless latched first.
    pub gpio_latch: bool,
    /// DC-DC registers reset across a PD_SYS cycle and must be restored.
    pub dcdc_retention: bool,
}

impl SocConfig {
    /// DA1469x: P0[0..32], P1[0..23].
    pub const DA1469X: SocConfig = SocConfig {
        name: "DA1469x",
        gpio_banks: &[GpioBank { port: 0, pins: 32 }, GpioBank { port: 1, pins: 23 }],
        gpio_latch: true,
        dcdc_retention: false,
    };

    /// DA1470x: P0[0..32], P1[0..32], P2[0..12].
    pub const DA1470X: SocConfig = SocConfig {
        name: "DA1470x",
        gpio_banks: &[
            GpioBank { port: 0, pins: 32 },
            GpioBank { port: 1, pins: 32 },
            GpioBank { port: 2, pins: 12 },
        ],
        gpio_latch: true,
        dcdc_retention: true,
    };
}

/// Build-time description of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    /// The SoC on the board.
    pub soc: SocConfig,
    /// System clock the board runs from.
    pub sys_clock: SysClock,
    /// XTAL32M is fitted and enabled.
    pub xtal32m_enabled: bool,
    /// A watchdog driver feeds SYS_WDOG. Without one the watchdog stays frozen.
    pub watchdog_driver: bool,
}

impl BoardConfig {
    /// A DA1469x board on XTAL32M with no watchdog driver.
    pub const DA1469X_DEFAULT: BoardConfig = BoardConfig {
        soc: SocConfig::DA1469X,
        sys_clock: SysClock::Xtal32m,
        xtal32m_enabled: true,
        watchdog_driver: false,
    };

    /// A DA1470x board on XTAL32M with no watchdog driver.
    pub const DA1470X_DEFAULT: BoardConfig = BoardConfig {
        soc: SocConfig::DA1470X,
        sys_clock: SysClock::Xtal32m,
        xtal32m_enabled: true,
        watchdog_driver: false,
    };

    /// Flags for PDC entries that wake the application core.
    #[must_use]
    pub const fn wake_flags(&self) -> PdcFlags {
        if self.xtal32m_enabled {
            PdcFlags::EN_XTAL
        } else {
            PdcFlags::NONE
        }
    }
}
