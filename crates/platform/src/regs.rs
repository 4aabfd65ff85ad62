//! Typed register access.
//!
//! Every hardware block is modelled as a `Copy` enum naming its registers plus
//! a set of [`Field`] constants naming the bit ranges inside them. Drivers talk
//! to a block through [`RegisterFile<Block>`], which a board implements over
//! its memory map and [`SimSoc`](crate::mocks::SimSoc) implements on the host.
//!
//! ```text
//!     driver ──► RegisterFile<CrgXtal>::set_bits(PllSysCtrl1, PLL_EN)
//!                          │
//!          ┌───────────────┴───────────────┐
//!       MMIO (target)                 SimSoc (host tests)
//! ```
//!
//! Methods take `&self`: memory-mapped registers behave like shared cells, and
//! the PLL reference counter calls into them from several execution contexts.
//!
//! Bit positions follow the DA1469x register map closely enough for
//! sequencing and simulation. They are not a substitute for the vendor header.

/// A bit range inside a 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    offset: u8,
    width: u8,
}

impl Field {
    /// Field of `width` bits starting at bit `offset`.
    #[must_use]
    pub const fn new(offset: u8, width: u8) -> Self {
        Self { offset, width }
    }

    /// Single-bit field at bit `offset`.
    #[must_use]
    pub const fn bit(offset: u8) -> Self {
        Self { offset, width: 1 }
    }

    /// Position of the least significant bit.
    #[must_use]
    pub const fn offset(self) -> u8 {
        self.offset
    }

    /// Number of bits in the field.
    #[must_use]
    pub const fn width(self) -> u8 {
        self.width
    }

    /// Largest value the field can hold, unshifted.
    #[must_use]
    pub const fn max_value(self) -> u32 {
        match self.width {
            0 => 0,
            w if w >= 32 => u32::MAX,
            w => u32::MAX.wrapping_shr(32u32.wrapping_sub(w as u32)),
        }
    }

    /// Mask of the field in register position.
    #[must_use]
    pub const fn mask(self) -> u32 {
        self.max_value().wrapping_shl(self.offset as u32)
    }

    /// Extract the field from a raw register value.
    #[must_use]
    pub const fn extract(self, raw: u32) -> u32 {
        (raw & self.mask()).wrapping_shr(self.offset as u32)
    }

    /// Replace the field inside `raw` with `value`. Excess high bits of `value`
    /// are discarded.
    #[must_use]
    pub const fn insert(self, raw: u32, value: u32) -> u32 {
        (raw & !self.mask()) | (value.wrapping_shl(self.offset as u32) & self.mask())
    }
}

/// Register-level access to one hardware block.
///
/// `R` is the block's register enum (e.g. [`CrgXtal`]). Implementors provide
/// raw `read`/`write`; the field helpers are read-modify-write sequences built
/// on top of them and are *not* atomic with respect to interrupts. Callers
/// sharing a register across contexts wrap the sequence in a critical section.
pub trait RegisterFile<R: Copy> {
    /// Read the raw register value.
    fn read(&self, reg: R) -> u32;

    /// Write the raw register value.
    fn write(&self, reg: R, value: u32);

    /// Read a single field.
    fn field(&self, reg: R, field: Field) -> u32 {
        field.extract(self.read(reg))
    }

    /// `true` when any bit of `field` is set.
    fn is_set(&self, reg: R, field: Field) -> bool {
        self.field(reg, field) != 0
    }

    /// Read-modify-write one field.
    fn modify(&self, reg: R, field: Field, value: u32) {
        let raw = self.read(reg);
        self.write(reg, field.insert(raw, value));
    }

    /// Set every bit of `field`.
    fn set_bits(&self, reg: R, field: Field) {
        self.modify(reg, field, field.max_value());
    }

    /// Clear every bit of `field`.
    fn clear_bits(&self, reg: R, field: Field) {
        self.modify(reg, field, 0);
    }
}

impl<R: Copy, T: RegisterFile<R> + ?Sized> RegisterFile<R> for &T {
    fn read(&self, reg: R) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: R, value: u32) {
        (**self).write(reg, value);
    }
}

// ── CRG_TOP ──────────────────────────────────────────────────────────────────

/// Clock/reset/power control block (always-on part).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrgTop {
    /// CLK_CTRL_REG: system and low-power clock selection.
    ClkCtrl,
    /// CLK_AMBA_REG: AHB/APB dividers.
    ClkAmba,
    /// CLK_RC32K_REG
    ClkRc32k,
    /// CLK_RCX_REG
    ClkRcx,
    /// CLK_XTAL32K_REG
    ClkXtal32k,
    /// CLK_RC32M_REG
    ClkRc32m,
    /// PMU_CTRL_REG: power-domain sleep requests.
    PmuCtrl,
    /// SYS_STAT_REG: domain and debugger status.
    SysStat,
    /// ANA_STATUS_REG: analog comparators.
    AnaStatus,
    /// POWER_CTRL_REG: LDO enables and rail levels.
    PowerCtrl,
}

/// Field constants for [`CrgTop`] registers.
pub mod crg_top {
    use super::Field;

    /// CLK_CTRL.SYS_CLK_SEL (0 XTAL32M, 1 RC32M, 2 LP clock, 3 PLL96M).
    pub const SYS_CLK_SEL: Field = Field::new(0, 2);
    /// CLK_CTRL.LP_CLK_SEL (0 RC32K, 1 RCX, 2 XTAL32K, 3 external).
    pub const LP_CLK_SEL: Field = Field::new(2, 2);
    /// CLK_CTRL.RUNNING_AT_LP_CLK
    pub const RUNNING_AT_LP_CLK: Field = Field::bit(12);
    /// CLK_CTRL.RUNNING_AT_RC32M
    pub const RUNNING_AT_RC32M: Field = Field::bit(13);
    /// CLK_CTRL.RUNNING_AT_XTAL32M
    pub const RUNNING_AT_XTAL32M: Field = Field::bit(14);
    /// CLK_CTRL.RUNNING_AT_PLL96M
    pub const RUNNING_AT_PLL96M: Field = Field::bit(15);

    /// CLK_AMBA.HCLK_DIV
    pub const HCLK_DIV: Field = Field::new(0, 3);
    /// CLK_AMBA.PCLK_DIV
    pub const PCLK_DIV: Field = Field::new(4, 2);

    /// Enable bit shared by CLK_RC32K / CLK_RCX / CLK_XTAL32K / CLK_RC32M.
    pub const OSC_ENABLE: Field = Field::bit(0);

    /// PMU_CTRL.RADIO_SLEEP
    pub const RADIO_SLEEP: Field = Field::bit(1);
    /// PMU_CTRL.PERIPH_SLEEP
    pub const PERIPH_SLEEP: Field = Field::bit(2);
    /// PMU_CTRL.COM_SLEEP
    pub const COM_SLEEP: Field = Field::bit(3);
    /// PMU_CTRL.TIM_SLEEP
    pub const TIM_SLEEP: Field = Field::bit(4);

    /// SYS_STAT.DBG_IS_ACTIVE
    pub const DBG_IS_ACTIVE: Field = Field::bit(13);

    /// ANA_STATUS.COMP_VBAT_HIGH
    pub const COMP_VBAT_HIGH: Field = Field::bit(9);

    /// POWER_CTRL.LDO_3V0_MODE (bit 1 VBUS, bit 0 VBAT)
    pub const LDO_3V0_MODE: Field = Field::new(0, 2);
    /// POWER_CTRL.LDO_3V0_REF (bandgap reference when set)
    pub const LDO_3V0_REF: Field = Field::bit(2);
    /// POWER_CTRL.LDO_3V0_RET_ENABLE_SLEEP
    pub const LDO_3V0_RET_ENABLE_SLEEP: Field = Field::bit(3);
    /// POWER_CTRL.LDO_1V8P_ENABLE
    pub const LDO_1V8P_ENABLE: Field = Field::bit(4);
    /// POWER_CTRL.LDO_1V8P_RET_ENABLE_SLEEP
    pub const LDO_1V8P_RET_ENABLE_SLEEP: Field = Field::bit(5);
    /// POWER_CTRL.LDO_1V8_ENABLE
    pub const LDO_1V8_ENABLE: Field = Field::bit(6);
    /// POWER_CTRL.LDO_1V8_RET_ENABLE_SLEEP
    pub const LDO_1V8_RET_ENABLE_SLEEP: Field = Field::bit(7);
    /// POWER_CTRL.LDO_RADIO_ENABLE
    pub const LDO_RADIO_ENABLE: Field = Field::bit(8);
    /// POWER_CTRL.LDO_CORE_RET_ENABLE_SLEEP
    pub const LDO_CORE_RET_ENABLE_SLEEP: Field = Field::bit(9);
    /// POWER_CTRL.LDO_CORE_ENABLE
    pub const LDO_CORE_ENABLE: Field = Field::bit(10);
    /// POWER_CTRL.V30_LEVEL
    pub const V30_LEVEL: Field = Field::new(11, 2);
    /// POWER_CTRL.V18_LEVEL
    pub const V18_LEVEL: Field = Field::bit(13);
    /// POWER_CTRL.V14_LEVEL
    pub const V14_LEVEL: Field = Field::new(14, 3);
    /// POWER_CTRL.VDD_SLEEP_LEVEL
    pub const VDD_SLEEP_LEVEL: Field = Field::new(17, 2);
    /// POWER_CTRL.VDD_LEVEL
    pub const VDD_LEVEL: Field = Field::new(19, 2);
    /// POWER_CTRL.VDD_CLAMP_LEVEL
    pub const VDD_CLAMP_LEVEL: Field = Field::new(21, 4);
}

// ── CRG_XTAL ─────────────────────────────────────────────────────────────────

/// Crystal oscillator and system PLL control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrgXtal {
    /// XTAL32M_CTRL0_REG
    Xtal32mCtrl0,
    /// XTAL32M_CTRL1_REG
    Xtal32mCtrl1,
    /// XTAL32M_STAT1_REG
    Xtal32mStat1,
    /// PLL_SYS_CTRL1_REG
    PllSysCtrl1,
    /// PLL_SYS_CTRL2_REG
    PllSysCtrl2,
    /// PLL_SYS_STATUS_REG
    PllSysStatus,
}

/// Field constants for [`CrgXtal`] registers.
pub mod crg_xtal {
    use super::Field;

    /// XTAL32M_CTRL0.XTAL32M_DXTAL_SYSPLL_ENABLE
    pub const DXTAL_SYSPLL_ENABLE: Field = Field::bit(5);
    /// XTAL32M_CTRL1.XTAL32M_XTAL_ENABLE
    pub const XTAL_ENABLE: Field = Field::bit(0);
    /// XTAL32M_STAT1.XTAL32M_STATE == settled
    pub const XTAL_SETTLED: Field = Field::bit(4);

    /// PLL_SYS_CTRL1.PLL_EN
    pub const PLL_EN: Field = Field::bit(1);
    /// PLL_SYS_CTRL1.LDO_PLL_ENABLE
    pub const LDO_PLL_ENABLE: Field = Field::bit(2);
    /// PLL_SYS_CTRL1.PLL_SEL_MIN_CUR_INT
    pub const PLL_SEL_MIN_CUR_INT: Field = Field::bit(14);
    /// PLL_SYS_CTRL2.PLL_RECALIB
    pub const PLL_RECALIB: Field = Field::bit(15);
    /// PLL_SYS_STATUS.PLL_LOCK_FINE
    pub const PLL_LOCK_FINE: Field = Field::bit(0);
    /// PLL_SYS_STATUS.LDO_PLL_OK
    pub const LDO_PLL_OK: Field = Field::bit(15);
}

// ── GPREG / SYS_WDOG ─────────────────────────────────────────────────────────

/// General-purpose register block (freeze control).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gpreg {
    /// SET_FREEZE_REG: write 1 to freeze; reads back the frozen set.
    SetFreeze,
    /// RESET_FREEZE_REG: write 1 to unfreeze.
    ResetFreeze,
}

/// Field constants for [`Gpreg`] registers.
pub mod gpreg {
    use super::Field;

    /// FRZ_SYS_WDOG
    pub const FRZ_SYS_WDOG: Field = Field::bit(3);
}

/// System watchdog block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysWdog {
    /// WATCHDOG_REG: counter reload value.
    Watchdog,
    /// WATCHDOG_CTRL_REG
    WatchdogCtrl,
}

/// Field constants for [`SysWdog`] registers.
pub mod sys_wdog {
    use super::Field;

    /// WATCHDOG.WDOG_VAL
    pub const WDOG_VAL: Field = Field::new(0, 14);
}

// ── DCDC ─────────────────────────────────────────────────────────────────────

/// DC-DC converter block. Lives in PD_SYS and resets to defaults when the
/// domain powers down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dcdc {
    /// DCDC_CTRL0_REG
    Ctrl0,
    /// DCDC_CTRL1_REG
    Ctrl1,
    /// DCDC_VDD_REG
    Vdd,
    /// DCDC_V14_REG
    V14,
    /// DCDC_V18_REG
    V18,
    /// DCDC_V18P_REG
    V18p,
}

impl Dcdc {
    /// Every register of the block, in the order they are restored: rail and
    /// control configuration first, the converter enable (`Ctrl1`) last.
    pub const ALL: [Dcdc; 6] = [
        Dcdc::Ctrl0,
        Dcdc::Vdd,
        Dcdc::V14,
        Dcdc::V18,
        Dcdc::V18p,
        Dcdc::Ctrl1,
    ];

    /// The per-rail output registers.
    pub const RAILS: [Dcdc; 4] = [Dcdc::Vdd, Dcdc::V14, Dcdc::V18, Dcdc::V18p];
}

/// Field constants for [`Dcdc`] registers.
pub mod dcdc {
    use super::Field;

    /// DCDC_CTRL1.DCDC_ENABLE
    pub const DCDC_ENABLE: Field = Field::bit(0);

    /// Rail register: DCDC_<rail>_ENABLE_HV
    pub const ENABLE_HV: Field = Field::bit(31);
    /// Rail register: DCDC_<rail>_ENABLE_LV
    pub const ENABLE_LV: Field = Field::bit(30);
    /// Rail register: DCDC_<rail>_CUR_LIM_MAX_LV (30 mA steps)
    pub const CUR_LIM_MAX_LV: Field = Field::new(25, 5);
    /// Rail register: DCDC_<rail>_CUR_LIM_MAX_HV (30 mA steps)
    pub const CUR_LIM_MAX_HV: Field = Field::new(20, 5);
    /// Rail register: DCDC_<rail>_CUR_LIM_MIN (30 mA steps)
    pub const CUR_LIM_MIN: Field = Field::new(15, 5);
}

// ── GPIO ─────────────────────────────────────────────────────────────────────

/// GPIO block, indexed by port (and pin for mode registers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gpio {
    /// Px_DATA_REG
    Data(u8),
    /// Px_yy_MODE_REG
    Mode {
        /// Port number.
        port: u8,
        /// Pin number within the port.
        pin: u8,
    },
    /// Px_PAD_LATCH_REG: 1 = pad follows its registers, 0 = pad holds its level.
    PadLatch(u8),
    /// Px_SET_PAD_LATCH_REG: write 1 to release a pad.
    SetPadLatch(u8),
    /// Px_RESET_PAD_LATCH_REG: write 1 to hold a pad.
    ResetPadLatch(u8),
}

// ── Raw address space ────────────────────────────────────────────────────────

/// A raw peripheral address, for the preferred-settings table which pokes
/// registers that have no named block here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrimAddress(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_mask_and_extract() {
        let f = Field::new(4, 3);
        assert_eq!(f.mask(), 0b0111_0000);
        assert_eq!(f.extract(0xFFFF_FFFF), 0b111);
        assert_eq!(f.insert(0, 0b101), 0b0101_0000);
        // Excess bits are dropped.
        assert_eq!(f.insert(0, 0xFF), 0b0111_0000);
    }

    #[test]
    fn full_width_field() {
        let f = Field::new(0, 32);
        assert_eq!(f.mask(), u32::MAX);
        assert_eq!(f.extract(0xDEAD_BEEF), 0xDEAD_BEEF);
    }

    #[test]
    fn insert_preserves_neighbours() {
        let raw = 0xA5A5_A5A5;
        let updated = crg_top::LP_CLK_SEL.insert(raw, 2);
        assert_eq!(updated & !crg_top::LP_CLK_SEL.mask(), raw & !crg_top::LP_CLK_SEL.mask());
        assert_eq!(crg_top::LP_CLK_SEL.extract(updated), 2);
    }

    #[test]
    fn power_ctrl_fields_do_not_overlap() {
        use crg_top::*;
        let fields = [
            LDO_3V0_MODE,
            LDO_3V0_REF,
            LDO_3V0_RET_ENABLE_SLEEP,
            LDO_1V8P_ENABLE,
            LDO_1V8P_RET_ENABLE_SLEEP,
            LDO_1V8_ENABLE,
            LDO_1V8_RET_ENABLE_SLEEP,
            LDO_RADIO_ENABLE,
            LDO_CORE_RET_ENABLE_SLEEP,
            LDO_CORE_ENABLE,
            V30_LEVEL,
            V18_LEVEL,
            V14_LEVEL,
            VDD_SLEEP_LEVEL,
            VDD_LEVEL,
            VDD_CLAMP_LEVEL,
        ];
        let mut seen = 0u32;
        for f in fields {
            assert_eq!(seen & f.mask(), 0, "field at offset {} overlaps", f.offset());
            seen |= f.mask();
        }
    }

    #[test]
    fn dcdc_rail_fields_do_not_overlap() {
        use dcdc::*;
        let fields = [ENABLE_HV, ENABLE_LV, CUR_LIM_MAX_LV, CUR_LIM_MAX_HV, CUR_LIM_MIN];
        let mut seen = 0u32;
        for f in fields {
            assert_eq!(seen & f.mask(), 0);
            seen |= f.mask();
        }
    }

    #[test]
    fn dcdc_restore_order_enables_last() {
        assert_eq!(Dcdc::ALL.last(), Some(&Dcdc::Ctrl1));
    }
}
