//! Hardware Abstraction Layer (HAL) for Renesas SmartBond DA1469x/DA1470x
//!
//! This crate provides the register-level and trait-level abstractions the
//! SoC support code is written against, so that the sleep/wake sequencing can
//! be developed and tested without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Host power-management framework (idle path)
//!         ↓
//! SoC support (soc crate - power manager, clocks, regulator)
//!         ↓
//! Platform HAL (this crate - registers, domains, PDC, core)
//!         ↓
//! Memory-mapped registers / vendor power-domain and PDC drivers
//! ```
//!
//! # Abstraction Levels
//!
//! - [`regs`] - typed register blocks and [`RegisterFile`] access
//! - [`power`] - power domains, power states and the [`PmHardware`] bound
//! - [`pdc`] - wake-source (PDC) table
//! - [`cpu`] - interrupt masking, WFI and the deep-sleep entry
//! - [`clock`] - clock sources and the post-wake crystal switch
//! - [`config`] - SoC capability and board descriptors
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] simulation
//! - `defmt`: Enable defmt logging derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects
    )
)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod clock;
pub mod config;
pub mod cpu;
pub mod mocks;
pub mod pdc;
pub mod power;
pub mod regs;

pub use clock::{ClockSwitch, CrgTopExt, LowPowerClock, SysClock};
pub use config::{BoardConfig, GpioBank, SocConfig};
pub use cpu::{Core, Irq, SleepEntry};
pub use pdc::{PdcError, PdcFlags, PdcMaster, PdcSlot, PdcTrigger, WakeSourceController};
pub use power::{PmHardware, PmState, PmStateHooks, PowerDomain, PowerDomainRegistry};
pub use regs::{Field, RegisterFile};
