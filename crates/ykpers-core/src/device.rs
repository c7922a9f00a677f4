//! Device transport trait
//!
//! The token speaks in 8-byte HID feature reports. Backends (USB, the
//! emulator, scripted test doubles) implement [`HidDevice`]; everything in
//! [`protocol`](crate::protocol) is written against it.

use crate::error::Result;
use crate::frame::REPORT_SIZE;

/// A feature report
pub type Report = [u8; REPORT_SIZE];

/// Byte-oriented handle to one token
///
/// A handle is driven from one thread at a time; the protocol keeps no
/// locking of its own.
pub trait HidDevice {
    /// Read the current feature report
    fn get_feature_report(&mut self, report: &mut Report) -> Result<()>;

    /// Send a feature report
    fn set_feature_report(&mut self, report: &Report) -> Result<()>;

    /// Sleep for `ms` milliseconds
    ///
    /// Polling loops measure elapsed time as the sum of requested delays,
    /// so test doubles can make this a no-op and get deterministic timing.
    fn delay_ms(&mut self, ms: u32);
}

impl<D: HidDevice + ?Sized> HidDevice for &mut D {
    fn get_feature_report(&mut self, report: &mut Report) -> Result<()> {
        (**self).get_feature_report(report)
    }

    fn set_feature_report(&mut self, report: &Report) -> Result<()> {
        (**self).set_feature_report(report)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

// Blanket impl so the CLI can pick a backend at runtime
impl HidDevice for alloc::boxed::Box<dyn HidDevice + Send> {
    fn get_feature_report(&mut self, report: &mut Report) -> Result<()> {
        (**self).get_feature_report(report)
    }

    fn set_feature_report(&mut self, report: &Report) -> Result<()> {
        (**self).set_feature_report(report)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
