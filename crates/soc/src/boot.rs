//! SoC bring-up and power-domain trim settings.
//!
//! Initialization order (runs before the kernel starts any driver):
//!   1. Freeze SYS_WDOG until a driver (if any) configures it
//!   2. Reset the AHB/APB dividers
//!   3. Power every domain except the radio
//!   4. Register the permanent wake sources (`PowerManager::new`)
//!
//! Whenever the PD registry powers AON, SYS or TIM up it applies that
//! domain's preferred settings through [`apply_preferred`].

use platform::power::PowerDomain;
use platform::regs::{crg_top, gpreg, CrgTop, Gpreg, RegisterFile, TrimAddress};

/// Ordered list of boot steps, for documentation and tests.
///
/// # Correctness Invariants
///
/// - The watchdog is frozen first: it runs from reset and nothing feeds it
///   until a driver takes over.
/// - Wake sources are registered before interrupts are enabled, so the first
///   standby request finds its software-trigger slot.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. SYS_WDOG: freeze until configured",
    "2. CLK_AMBA: HCLK and PCLK dividers to 0",
    "3. PMU_CTRL: all domains on except radio",
    "4. PDC: register combo and software-trigger wake sources",
];

/// PMU_CTRL value written at boot: only RADIO_SLEEP set.
pub const PMU_CTRL_BOOT: u32 = crg_top::RADIO_SLEEP.mask();

/// Early SoC init: steps 1 to 3 of [`BOOT_SEQUENCE_STEPS`].
pub fn soc_init<R>(regs: &R)
where
    R: RegisterFile<CrgTop> + RegisterFile<Gpreg> + ?Sized,
{
    regs.write(Gpreg::SetFreeze, gpreg::FRZ_SYS_WDOG.mask());
    regs.modify(CrgTop::ClkAmba, crg_top::HCLK_DIV, 0);
    regs.modify(CrgTop::ClkAmba, crg_top::PCLK_DIV, 0);
    regs.write(CrgTop::PmuCtrl, PMU_CTRL_BOOT);
    debug!("SoC init done");
}

/// One preferred-settings register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrimWrite {
    /// `reg = (reg & !mask) | (value & mask)`
    Masked {
        /// Register address.
        addr: u32,
        /// Bits to replace.
        mask: u32,
        /// New bits (only those under `mask` are used).
        value: u32,
    },
    /// `reg = value`
    Exact {
        /// Register address.
        addr: u32,
        /// New value.
        value: u32,
    },
    /// `reg = value` only if `reg == expect`.
    Conditional {
        /// Register address.
        addr: u32,
        /// Value the register must hold.
        expect: u32,
        /// New value.
        value: u32,
    },
}

impl TrimWrite {
    /// Perform the write.
    pub fn apply<B: RegisterFile<TrimAddress> + ?Sized>(self, bus: &B) {
        match self {
            Self::Masked { addr, mask, value } => {
                let reg = bus.read(TrimAddress(addr));
                bus.write(TrimAddress(addr), (reg & !mask) | (value & mask));
            }
            Self::Exact { addr, value } => bus.write(TrimAddress(addr), value),
            Self::Conditional {
                addr,
                expect,
                value,
            } => {
                if bus.read(TrimAddress(addr)) == expect {
                    bus.write(TrimAddress(addr), value);
                }
            }
        }
    }
}

const AON_PREFERRED: [TrimWrite; 4] = [
    TrimWrite::Conditional {
        addr: 0x5000_00f8,
        expect: 0x0000_8800,
        value: 0x0000_7700,
    },
    TrimWrite::Masked {
        addr: 0x5000_0050,
        mask: 0x0000_1000,
        value: 0x0000_1020,
    },
    TrimWrite::Exact {
        addr: 0x5000_00a4,
        value: 0x0000_00ca,
    },
    TrimWrite::Masked {
        addr: 0x5000_0064,
        mask: 0x0003_ffff,
        value: 0x041e_6ef4,
    },
];

const SYS_PREFERRED: [TrimWrite; 2] = [
    TrimWrite::Masked {
        addr: 0x5004_0400,
        mask: 0x0000_0c00,
        value: 0x003f_6a78,
    },
    TrimWrite::Masked {
        addr: 0x5004_0454,
        mask: 0x0000_03ff,
        value: 0x0000_0002,
    },
];

const TIM_PREFERRED: [TrimWrite; 8] = [
    TrimWrite::Masked {
        addr: 0x5001_0000,
        mask: 0x3ff0_0000,
        value: 0x000a_fd70,
    },
    TrimWrite::Masked {
        addr: 0x5001_0010,
        mask: 0x0000_00c0,
        value: 0x0000_0562,
    },
    TrimWrite::Masked {
        addr: 0x5001_0030,
        mask: 0x43c3_8002,
        value: 0x4801_e6b6,
    },
    TrimWrite::Masked {
        addr: 0x5001_0034,
        mask: 0x007f_ff00,
        value: 0x7500_a1a4,
    },
    TrimWrite::Masked {
        addr: 0x5001_0038,
        mask: 0x0000_0fff,
        value: 0x001e_45c4,
    },
    TrimWrite::Masked {
        addr: 0x5001_003c,
        mask: 0x4000_0000,
        value: 0x4009_6255,
    },
    TrimWrite::Masked {
        addr: 0x5001_0040,
        mask: 0x00c0_0000,
        value: 0x00c0_0000,
    },
    TrimWrite::Masked {
        addr: 0x5001_0018,
        mask: 0x0000_00ff,
        value: 0x0000_0180,
    },
];

/// Preferred settings for `domain`, in the order they are written.
pub const fn preferred_settings(domain: PowerDomain) -> &'static [TrimWrite] {
    match domain {
        PowerDomain::Aon => &AON_PREFERRED,
        PowerDomain::Sys => &SYS_PREFERRED,
        PowerDomain::Tim => &TIM_PREFERRED,
        PowerDomain::Com | PowerDomain::Periph | PowerDomain::Radio => &[],
    }
}

/// Apply the preferred settings of a domain that just powered up.
pub fn apply_preferred<B: RegisterFile<TrimAddress> + ?Sized>(bus: &B, domain: PowerDomain) {
    let settings = preferred_settings(domain);
    for write in settings {
        write.apply(bus);
    }
    trace!("{} preferred settings applied", settings.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{SimEvent, SimRegister, SimSoc};

    #[test]
    fn boot_steps_freeze_watchdog_first() {
        assert!(BOOT_SEQUENCE_STEPS[0].contains("WDOG"));
        assert!(BOOT_SEQUENCE_STEPS
            .last()
            .is_some_and(|s| s.contains("PDC")));
    }

    #[test]
    fn soc_init_writes() {
        let soc = SimSoc::da1469x();
        soc.poke(SimRegister::CrgTop(CrgTop::ClkAmba), 0x0000_0f37);

        soc_init(&soc);

        assert!(soc.is_set(Gpreg::SetFreeze, gpreg::FRZ_SYS_WDOG));
        assert_eq!(soc.read(CrgTop::ClkAmba), 0x0000_0f00);
        assert_eq!(soc.read(CrgTop::PmuCtrl), 0x02);
    }

    #[test]
    fn masked_write_keeps_other_bits() {
        let soc = SimSoc::da1469x();
        soc.poke(SimRegister::Trim(0x5004_0454), 0xffff_ffff);
        apply_preferred(&soc, PowerDomain::Sys);
        assert_eq!(soc.read(TrimAddress(0x5004_0454)), 0xffff_fc02);
    }

    #[test]
    fn conditional_write_checks_current_value() {
        let soc = SimSoc::da1469x();
        soc.poke(SimRegister::Trim(0x5000_00f8), 0x0000_8800);
        apply_preferred(&soc, PowerDomain::Aon);
        assert_eq!(soc.read(TrimAddress(0x5000_00f8)), 0x0000_7700);

        let soc = SimSoc::da1469x();
        soc.poke(SimRegister::Trim(0x5000_00f8), 0x0000_1234);
        apply_preferred(&soc, PowerDomain::Aon);
        assert_eq!(soc.read(TrimAddress(0x5000_00f8)), 0x0000_1234);
        assert_eq!(soc.read(TrimAddress(0x5000_00a4)), 0x0000_00ca);
    }

    #[test]
    fn domains_without_settings_write_nothing() {
        let soc = SimSoc::da1469x();
        for domain in [PowerDomain::Com, PowerDomain::Periph, PowerDomain::Radio] {
            apply_preferred(&soc, domain);
        }
        assert!(soc.events().is_empty());
    }

    #[test]
    fn tim_settings_written_in_order() {
        let soc = SimSoc::da1469x();
        apply_preferred(&soc, PowerDomain::Tim);
        let addrs: Vec<u32> = soc
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SimEvent::Write(SimRegister::Trim(addr), _) => Some(addr),
                _ => None,
            })
            .collect();
        assert_eq!(
            addrs,
            vec![
                0x5001_0000,
                0x5001_0010,
                0x5001_0030,
                0x5001_0034,
                0x5001_0038,
                0x5001_003c,
                0x5001_0040,
                0x5001_0018,
            ]
        );
        assert_eq!(soc.read(TrimAddress(0x5001_0040)), 0x00c0_0000);
    }
}
