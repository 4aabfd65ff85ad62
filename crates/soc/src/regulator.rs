//! On-chip supply rails: LDOs and the DC-DC converter.
//!
//! Each rail is a [`Regulator`] over POWER_CTRL (LDO enables, output levels)
//! and the DC-DC block (per-rail enables, current limits). The DC-DC
//! converter itself is shared: the first rail that asks for it turns it on
//! (provided VBAT is high enough) and the last rail to stop asking turns it
//! off.

use core::fmt;
use core::ops::BitOr;

use platform::clock::CrgTopExt;
use platform::regs::{crg_top, dcdc, CrgTop, Dcdc, Field, RegisterFile};

/// Current-limit step of the DC-DC rail registers.
pub const CURRENT_LIMIT_STEP_UA: u32 = 30_000;

/// Supply rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rail {
    /// Core clamp voltage while sleeping.
    VddClamp,
    /// Core retention voltage while sleeping.
    VddSleep,
    /// Digital core.
    Vdd,
    /// Radio and analog.
    V14,
    /// 1.8 V I/O.
    V18,
    /// 1.8 V peripheral (fixed level).
    V18p,
    /// 3.0 V I/O.
    V30,
}

const VDD_CLAMP_UV: [u32; 16] = [
    1_037_000, 1_005_000, 978_000, 946_000, 1_120_000, 1_089_000, 1_058_000, 1_030_000, 952_000,
    918_000, 889_000, 861_000, 862_000, 828_000, 798_000, 706_000,
];
const VDD_UV: [u32; 4] = [900_000, 1_000_000, 1_100_000, 1_200_000];
const VDD_SLEEP_UV: [u32; 4] = [750_000, 800_000, 850_000, 900_000];
const V14_UV: [u32; 8] = [
    1_200_000, 1_250_000, 1_300_000, 1_350_000, 1_400_000, 1_450_000, 1_500_000, 1_550_000,
];
const V30_UV: [u32; 2] = [3_000_000, 3_300_000];
const V18_UV: [u32; 2] = [1_200_000, 1_800_000];
const V18P_UV: [u32; 1] = [1_800_000];

impl Rail {
    /// Datasheet name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VddClamp => "VDD_CLAMP",
            Self::VddSleep => "VDD_SLEEP",
            Self::Vdd => "VDD",
            Self::V14 => "V14",
            Self::V18 => "V18",
            Self::V18p => "V18P",
            Self::V30 => "V30",
        }
    }

    /// Selectable output voltages in µV, indexed by level register value.
    pub const fn voltages(self) -> &'static [u32] {
        match self {
            Self::VddClamp => &VDD_CLAMP_UV,
            Self::VddSleep => &VDD_SLEEP_UV,
            Self::Vdd => &VDD_UV,
            Self::V14 => &V14_UV,
            Self::V18 => &V18_UV,
            Self::V18p => &V18P_UV,
            Self::V30 => &V30_UV,
        }
    }

    /// POWER_CTRL level field. V18P has a fixed output.
    const fn level_field(self) -> Option<Field> {
        match self {
            Self::VddClamp => Some(crg_top::VDD_CLAMP_LEVEL),
            Self::VddSleep => Some(crg_top::VDD_SLEEP_LEVEL),
            Self::Vdd => Some(crg_top::VDD_LEVEL),
            Self::V14 => Some(crg_top::V14_LEVEL),
            Self::V18 => Some(crg_top::V18_LEVEL),
            Self::V18p => None,
            Self::V30 => Some(crg_top::V30_LEVEL),
        }
    }

    /// DC-DC output register, for rails the converter can supply.
    pub const fn dcdc(self) -> Option<Dcdc> {
        match self {
            Self::Vdd => Some(Dcdc::Vdd),
            Self::V14 => Some(Dcdc::V14),
            Self::V18 => Some(Dcdc::V18),
            Self::V18p => Some(Dcdc::V18p),
            Self::VddClamp | Self::VddSleep | Self::V30 => None,
        }
    }
}

/// Board-level rail options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegulatorMode(u8);

impl RegulatorMode {
    /// No options.
    pub const NONE: Self = Self(0);
    /// Keep the rail's LDO on in sleep.
    pub const SLEEP_LDO: Self = Self(0x01);
    /// Use the DC-DC converter when VBAT is high.
    pub const DCDC_HIGH_BATT: Self = Self(0x02);
    /// Use the DC-DC converter when VBAT is low.
    pub const DCDC_LOW_BATT: Self = Self(0x04);
    /// V30: LDO supplied from VBUS.
    pub const V30_VBUS: Self = Self(0x08);
    /// V30: LDO supplied from VBAT.
    pub const V30_VBAT: Self = Self(0x10);
    /// V30: clamp on VBAT.
    pub const V30_CLAMP: Self = Self(0x20);

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` when every option of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when any option of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for RegulatorMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Static configuration of one rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegulatorConfig {
    /// The rail.
    pub rail: Rail,
    /// Options.
    pub mode: RegulatorMode,
    /// V30 only: reference the LDO to the bandgap.
    pub ref_bandgap: bool,
}

/// Regulator errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegulatorError {
    /// Voltage index out of range.
    InvalidIndex(usize),
    /// No selectable voltage within the requested window.
    VoltageUnavailable,
    /// The rail has no such control.
    NotSupported(Rail),
}

impl fmt::Display for RegulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIndex(i) => write!(f, "voltage index {i} out of range"),
            Self::VoltageUnavailable => f.write_str("no voltage within the requested range"),
            Self::NotSupported(rail) => write!(f, "operation not supported on {}", rail.name()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegulatorError {}

/// One supply rail.
pub struct Regulator<R> {
    regs: R,
    config: RegulatorConfig,
}

impl<R> Regulator<R>
where
    R: RegisterFile<CrgTop> + RegisterFile<Dcdc>,
{
    /// Driver for the rail described by `config`.
    pub fn new(regs: R, config: RegulatorConfig) -> Self {
        Self { regs, config }
    }

    /// The rail this driver controls.
    pub fn rail(&self) -> Rail {
        self.config.rail
    }

    /// One-time set-up.
    pub fn init(&self) {
        if self.config.rail == Rail::V30 {
            self.regs.modify(
                CrgTop::PowerCtrl,
                crg_top::LDO_3V0_REF,
                u32::from(self.config.ref_bandgap),
            );
        }
    }

    fn power(&self, field: Field, on: bool) {
        self.regs.modify(CrgTop::PowerCtrl, field, u32::from(on));
    }

    fn dcdc_outputs(&self, reg: Dcdc, high: bool, low: bool) {
        self.regs.modify(reg, dcdc::ENABLE_HV, u32::from(high));
        self.regs.modify(reg, dcdc::ENABLE_LV, u32::from(low));
    }

    /// Turn the rail on.
    pub fn enable(&self) {
        let mode = self.config.mode;
        let sleep_ldo = mode.contains(RegulatorMode::SLEEP_LDO);
        match self.config.rail {
            Rail::Vdd => self.power(crg_top::LDO_CORE_ENABLE, true),
            Rail::VddClamp => {}
            Rail::VddSleep => self.power(crg_top::LDO_CORE_RET_ENABLE_SLEEP, true),
            Rail::V14 => self.power(crg_top::LDO_RADIO_ENABLE, true),
            Rail::V18 => {
                self.power(crg_top::LDO_1V8_ENABLE, true);
                self.power(crg_top::LDO_1V8_RET_ENABLE_SLEEP, sleep_ldo);
            }
            Rail::V18p => {
                self.power(crg_top::LDO_1V8P_ENABLE, true);
                self.power(crg_top::LDO_1V8P_RET_ENABLE_SLEEP, sleep_ldo);
            }
            Rail::V30 => {
                self.power(crg_top::LDO_3V0_RET_ENABLE_SLEEP, sleep_ldo);
                let source = u32::from(mode.contains(RegulatorMode::V30_VBUS)).wrapping_shl(1)
                    | u32::from(mode.contains(RegulatorMode::V30_VBAT));
                self.regs
                    .modify(CrgTop::PowerCtrl, crg_top::LDO_3V0_MODE, source);
            }
        }

        if let Some(reg) = self.config.rail.dcdc() {
            self.dcdc_outputs(
                reg,
                mode.contains(RegulatorMode::DCDC_HIGH_BATT),
                mode.contains(RegulatorMode::DCDC_LOW_BATT),
            );
        }

        let wants_dcdc =
            mode.intersects(RegulatorMode::DCDC_HIGH_BATT | RegulatorMode::DCDC_LOW_BATT);
        if wants_dcdc
            && !self.regs.is_set(Dcdc::Ctrl1, dcdc::DCDC_ENABLE)
            && self.regs.vbat_high()
        {
            debug!("DC-DC on for {:?}", self.config.rail);
            self.regs.set_bits(Dcdc::Ctrl1, dcdc::DCDC_ENABLE);
        }
    }

    /// Turn the rail off. VDD and the clamp stay on.
    pub fn disable(&self) {
        match self.config.rail {
            Rail::Vdd | Rail::VddClamp => {}
            Rail::VddSleep => self.power(crg_top::LDO_CORE_RET_ENABLE_SLEEP, false),
            Rail::V14 => {
                self.power(crg_top::LDO_RADIO_ENABLE, false);
                self.dcdc_outputs(Dcdc::V14, false, false);
            }
            Rail::V18 => {
                self.power(crg_top::LDO_1V8_ENABLE, false);
                self.power(crg_top::LDO_1V8_RET_ENABLE_SLEEP, false);
                self.dcdc_outputs(Dcdc::V18, false, false);
            }
            Rail::V18p => {
                self.power(crg_top::LDO_1V8P_ENABLE, false);
                self.power(crg_top::LDO_1V8P_RET_ENABLE_SLEEP, false);
                self.dcdc_outputs(Dcdc::V18p, false, false);
            }
            Rail::V30 => {
                self.regs.modify(CrgTop::PowerCtrl, crg_top::LDO_3V0_MODE, 0);
                self.power(crg_top::LDO_3V0_RET_ENABLE_SLEEP, false);
            }
        }

        let requested = Dcdc::RAILS.iter().any(|&reg| {
            self.regs.is_set(reg, dcdc::ENABLE_HV) || self.regs.is_set(reg, dcdc::ENABLE_LV)
        });
        if !requested && self.regs.is_set(Dcdc::Ctrl1, dcdc::DCDC_ENABLE) {
            debug!("DC-DC off");
            self.regs.clear_bits(Dcdc::Ctrl1, dcdc::DCDC_ENABLE);
        }
    }

    /// Number of selectable voltages.
    pub fn count_voltages(&self) -> usize {
        self.config.rail.voltages().len()
    }

    /// Voltage at `index`, in µV.
    pub fn list_voltage(&self, index: usize) -> Result<u32, RegulatorError> {
        self.config
            .rail
            .voltages()
            .get(index)
            .copied()
            .ok_or(RegulatorError::InvalidIndex(index))
    }

    /// Select the first voltage within `min_uv..=max_uv`.
    pub fn set_voltage(&self, min_uv: u32, max_uv: u32) -> Result<(), RegulatorError> {
        let rail = self.config.rail;
        let index = rail
            .voltages()
            .iter()
            .position(|&uv| (min_uv..=max_uv).contains(&uv))
            .ok_or(RegulatorError::VoltageUnavailable)?;
        let level = u32::try_from(index).map_err(|_| RegulatorError::InvalidIndex(index))?;
        // V30 encodes its level in the upper bit of the field.
        let level = if rail == Rail::V30 { level.wrapping_shl(1) } else { level };
        if let Some(field) = rail.level_field() {
            self.regs.modify(CrgTop::PowerCtrl, field, level);
        }
        Ok(())
    }

    /// Currently selected voltage, in µV.
    pub fn get_voltage(&self) -> Result<u32, RegulatorError> {
        let rail = self.config.rail;
        let level = match rail.level_field() {
            Some(field) => self.regs.field(CrgTop::PowerCtrl, field),
            None => 0,
        };
        let level = if rail == Rail::V30 { level.wrapping_shr(1) } else { level };
        let index = usize::try_from(level).map_err(|_| RegulatorError::VoltageUnavailable)?;
        self.list_voltage(index)
    }

    /// Program the DC-DC current limits from `max_ua`.
    pub fn set_current_limit(&self, _min_ua: u32, max_ua: u32) -> Result<(), RegulatorError> {
        let reg = self
            .config
            .rail
            .dcdc()
            .ok_or(RegulatorError::NotSupported(self.config.rail))?;
        let steps = max_ua.wrapping_div(CURRENT_LIMIT_STEP_UA).saturating_sub(1);
        for field in [dcdc::CUR_LIM_MAX_HV, dcdc::CUR_LIM_MAX_LV, dcdc::CUR_LIM_MIN] {
            self.regs.modify(reg, field, steps.min(field.max_value()));
        }
        Ok(())
    }

    /// DC-DC current limit, in µA.
    pub fn get_current_limit(&self) -> Result<u32, RegulatorError> {
        let reg = self
            .config
            .rail
            .dcdc()
            .ok_or(RegulatorError::NotSupported(self.config.rail))?;
        let steps = self.regs.field(reg, dcdc::CUR_LIM_MAX_HV);
        Ok(steps.saturating_add(1).saturating_mul(CURRENT_LIMIT_STEP_UA))
    }
}
