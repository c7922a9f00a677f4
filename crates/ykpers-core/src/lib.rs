//! ykpers-core - Core library for OTP token personalization
//!
//! This crate builds the binary configuration record of a one-time-password
//! token slot, encodes it into the checksummed wire frame the device expects,
//! and drives the feature-report write/poll protocol that programs it. It also
//! contains the PBKDF2 variant used to derive key material from passphrases.
//!
//! The crate is `no_std` (with `alloc`). The `std` feature (on by default)
//! adds salt sourcing from the operating system, `std::error::Error` impls
//! and the JSON import/export adapter.
//!
//! # Example
//!
//! ```ignore
//! use ykpers_core::config::{Config, Flag};
//! use ykpers_core::protocol::{self, ConfigWrite};
//!
//! fn program<D: ykpers_core::device::HidDevice>(dev: &mut D) -> ykpers_core::Result<()> {
//!     let status = protocol::read_status(dev)?;
//!     let mut cfg = Config::new();
//!     cfg.configure_for(2, &status)?;
//!     cfg.set_flag(Flag::AppendCr, false)?;
//!     ConfigWrite::new(cfg.slot(), cfg.record()).run(dev)?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
pub mod config;
pub mod crc;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod frame;
#[cfg(feature = "std")]
pub mod json;
pub mod kdf;
pub mod protocol;
pub mod slot;
pub mod status;

pub use error::{ConfigError, Error, Result, TransportError};
