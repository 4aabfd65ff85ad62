//! Power Domain Controller (PDC) wake-source table.
//!
//! The PDC is a small lookup table. Each entry pairs a wake trigger with the
//! master it wakes and the domains/oscillators to bring up for it. When a
//! trigger fires, the entry latches "pending" until acknowledged; a pending
//! entry for a sleeping master starts the power-up sequence.

use core::fmt;

/// Event that can wake a master through the PDC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdcTrigger {
    /// GPIO pin edge (through the wake-up controller).
    Gpio {
        /// Port number.
        port: u8,
        /// Pin number within the port.
        pin: u8,
    },
    /// Timer block 1..=4.
    Timer(u8),
    /// RTC alarm.
    RtcAlarm,
    /// RTC periodic event.
    RtcTimer,
    /// CMAC (radio MAC) timer.
    MacTimer,
    /// XTAL32M settled.
    Xtal32mReady,
    /// Composite source: VBUS, debugger, CMAC2SYS, JTAG.
    Combo,
    /// Software trigger, set by writing the entry's SET bit.
    SwTrigger,
    /// Debugger attach.
    Debug,
}

/// Master that a PDC entry wakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdcMaster {
    /// Application core (Cortex-M33).
    M33,
    /// Radio MAC core.
    Cmac,
    /// Sensor node controller.
    Snc,
}

/// Extra resources an entry powers up together with its master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PdcFlags(u8);

impl PdcFlags {
    /// No extra resources.
    pub const NONE: Self = Self(0);
    /// Start XTAL32M.
    pub const EN_XTAL: Self = Self(1 << 0);
    /// Power PD_TIM.
    pub const EN_PD_TMR: Self = Self(1 << 1);
    /// Power PD_PER.
    pub const EN_PD_PER: Self = Self(1 << 2);
    /// Power PD_COM.
    pub const EN_PD_COM: Self = Self(1 << 3);

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` when every flag of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOr for PdcFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Index of a registered PDC entry. Handed out by
/// [`WakeSourceController::add`] and valid for the lifetime of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PdcSlot(u8);

impl PdcSlot {
    /// Wrap a raw table index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Raw table index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// PDC table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdcError {
    /// All table entries are in use.
    TableFull,
    /// The slot does not name a registered entry.
    InvalidSlot(PdcSlot),
}

impl fmt::Display for PdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull => f.write_str("PDC table full"),
            Self::InvalidSlot(slot) => write!(f, "PDC slot {} not registered", slot.index()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PdcError {}

/// Wake-source registry backed by the PDC lookup table.
pub trait WakeSourceController {
    /// Register an entry. Boot-time only; entries are never removed.
    fn add(
        &mut self,
        trigger: PdcTrigger,
        master: PdcMaster,
        flags: PdcFlags,
    ) -> Result<PdcSlot, PdcError>;

    /// Software-set the entry's pending bit.
    fn set(&mut self, slot: PdcSlot);

    /// Acknowledge (clear) the entry's pending bit.
    fn ack(&mut self, slot: PdcSlot);

    /// Acknowledge every pending entry that targets `master`.
    fn ack_all(&mut self, master: PdcMaster);

    /// `true` while the entry is pending.
    fn is_pending(&self, slot: PdcSlot) -> bool;
}
