//! Deterministic timing core for a GameCube emulator.
//!
//! Everything here runs on a virtual clock measured in emulated CPU cycles: time only moves
//! when the CPU core reports executed cycles, never from a wall clock. The CPU core cooperates
//! through a downcount register and [`System::advance`], and every other subsystem hangs its
//! work off scheduled events.

pub mod primitive;
pub mod stream;

pub mod modules;
pub mod system;

pub use primitive::Primitive;
pub use system::{Config, Modules, System};

/// The CPU frequency, in cycles per second.
pub const FREQUENCY: u64 = 486_000_000;
