//! Peripheral state that has to survive a PD_SYS power cycle.
//!
//! Each capability the SoC may or may not need is a [`Retention`] strategy.
//! The power manager keeps them as `Option`s, and `None` is the no-op
//! strategy for a SoC that lacks the capability.

use heapless::Vec;
use platform::clock::CrgTopExt;
use platform::config::{GpioBank, MAX_GPIO_BANKS, MAX_PINS_PER_BANK};
use platform::regs::{CrgTop, Dcdc, Gpio, RegisterFile};

/// Snapshot/restore of state lost when PD_SYS powers down.
///
/// `save` runs while the registers are still readable, right before the
/// domain is released; `restore` runs right after the wake-up (or after an
/// aborted attempt), before the domain reference is taken back.
pub trait Retention<H: ?Sized> {
    /// Capture the state.
    fn save(&mut self, hw: &H);

    /// Write the captured state back.
    fn restore(&mut self, hw: &H);
}

impl<H: ?Sized, T: Retention<H>> Retention<H> for Option<T> {
    fn save(&mut self, hw: &H) {
        if let Some(inner) = self {
            inner.save(hw);
        }
    }

    fn restore(&mut self, hw: &H) {
        if let Some(inner) = self {
            inner.restore(hw);
        }
    }
}

// ── GPIO ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct BankSnapshot {
    bank: GpioBank,
    data: u32,
    modes: Vec<u32, MAX_PINS_PER_BANK>,
}

/// Holds pad levels through deep sleep.
///
/// On save every implemented pad is latched (it keeps driving its current
/// level while the GPIO block is unpowered) and the data and mode registers
/// are captured. On restore the registers are written back first and only
/// then are the pads released, so no pad glitches on the way out.
#[derive(Debug, Clone)]
pub struct GpioLatch {
    banks: &'static [GpioBank],
    snapshot: Vec<BankSnapshot, MAX_GPIO_BANKS>,
}

impl GpioLatch {
    /// Latch strategy for the given banks.
    pub const fn new(banks: &'static [GpioBank]) -> Self {
        Self {
            banks,
            snapshot: Vec::new(),
        }
    }

    /// Data register value captured for `port` by the last save.
    pub fn saved_data(&self, port: u8) -> Option<u32> {
        self.snapshot
            .iter()
            .find(|s| s.bank.port == port)
            .map(|s| s.data)
    }
}

impl<H: RegisterFile<Gpio> + ?Sized> Retention<H> for GpioLatch {
    fn save(&mut self, hw: &H) {
        self.snapshot.clear();
        for &bank in self.banks {
            let mut modes = Vec::new();
            for pin in 0..bank.pins {
                if modes.push(hw.read(Gpio::Mode { port: bank.port, pin })).is_err() {
                    break;
                }
            }
            let snap = BankSnapshot {
                bank,
                data: hw.read(Gpio::Data(bank.port)),
                modes,
            };
            if self.snapshot.push(snap).is_err() {
                warn!("GPIO bank P{} not retained", bank.port);
                break;
            }
            hw.write(Gpio::ResetPadLatch(bank.port), bank.pin_mask());
        }
    }

    fn restore(&mut self, hw: &H) {
        for snap in &self.snapshot {
            let port = snap.bank.port;
            for (pin, &mode) in (0u8..).zip(snap.modes.iter()) {
                hw.write(Gpio::Mode { port, pin }, mode);
            }
            hw.write(Gpio::Data(port), snap.data);
            hw.write(Gpio::SetPadLatch(port), snap.bank.pin_mask());
        }
    }
}

// ── DC-DC ────────────────────────────────────────────────────────────────────

/// Saves the DC-DC converter configuration on SoCs where it resets with
/// PD_SYS.
///
/// The restore is skipped when VBAT is too low for the converter; the block
/// then stays at its reset values and the LDOs keep supplying the rails.
#[derive(Debug, Clone, Default)]
pub struct DcdcRetention {
    regs: [u32; Dcdc::ALL.len()],
    valid: bool,
}

impl DcdcRetention {
    /// Empty snapshot.
    pub const fn new() -> Self {
        Self {
            regs: [0; Dcdc::ALL.len()],
            valid: false,
        }
    }
}

impl<H> Retention<H> for DcdcRetention
where
    H: RegisterFile<Dcdc> + RegisterFile<CrgTop> + ?Sized,
{
    fn save(&mut self, hw: &H) {
        for (slot, reg) in self.regs.iter_mut().zip(Dcdc::ALL) {
            *slot = hw.read(reg);
        }
        self.valid = true;
    }

    fn restore(&mut self, hw: &H) {
        if !core::mem::take(&mut self.valid) {
            return;
        }
        if !hw.vbat_high() {
            debug!("VBAT low, DC-DC left at reset values");
            return;
        }
        // Dcdc::ALL ends with CTRL1, so the converter is enabled last.
        for (&value, reg) in self.regs.iter().zip(Dcdc::ALL) {
            hw.write(reg, value);
        }
    }
}
