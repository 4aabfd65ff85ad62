//! SmartBond DA1469x/DA1470x SoC support
//!
//! Power management and clocking for the Renesas SmartBond family, written
//! against the [`platform`] traits so that every sequence runs unchanged on
//! the simulated SoC in host tests.
//!
//! # Architecture
//!
//! ```text
//! Host power-management framework (idle path)
//!         ↓
//! idle::suspend → power::PowerManager (PmStateHooks)
//!         ↓                       ↓
//! power::retention        clock_control (SysPll, ClockControl)
//!         ↓                       ↓
//! Platform HAL (registers, PD registry, PDC, core)
//! ```
//!
//! [`boot`] and [`regulator`] sit beside the power manager: the first runs
//! before it is constructed, the second is driven by board code.
//!
//! # Features
//!
//! - `hardware` - Cortex-M33 [`Core`](platform::cpu::Core) implementation over `cortex-m`
//! - `std` - Standard library (error trait impls, simulated SoC)
//! - `defmt` - Log through defmt
//! - `tracing` - Log through tracing (host builds)

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::use_debug)] // enum names in log lines
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects
    )
)]

// MUST be the first module: the logging macros are textually scoped.
mod fmt;

#[cfg(feature = "hardware")]
pub mod arch;
pub mod boot;
pub mod clock_control;
pub mod idle;
pub mod power;
pub mod regulator;

pub use clock_control::{ClockControl, ClockError, ClockSubsys, SysPll};
pub use power::{PmError, PowerManager, StandbyOutcome, WakeSlots};
pub use regulator::{Rail, Regulator, RegulatorConfig, RegulatorError, RegulatorMode};
