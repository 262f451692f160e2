#![no_std]

// Accessory detection engine for Micro-USB interface controllers.
//
// The crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Register transport and platform notifications are
// supplied through the traits in `registers` and `hooks`.

pub mod cable;
pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod edge;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod path;
pub mod registers;
pub mod status;
pub mod telemetry;

pub use cable::{CableType, JigVariant, UsbPort, classify};
pub use config::MuicConfig;
pub use engine::{CycleOutcome, CycleReport, MuicEngine};
pub use error::MuicError;
pub use hooks::{DockMode, HookError, NoopHooks, PlatformHooks, ProcessorPath, UsbEvent};
pub use path::{PathConfig, SwitchRoute};
pub use registers::{BusFault, Register, RegisterAccess};
pub use status::{ResolvedStatus, StatusBits, StatusSnapshot};
