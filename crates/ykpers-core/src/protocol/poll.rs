//! Status polling with exponential backoff

use crate::device::{HidDevice, Report};
use crate::error::{Result, TransportError};
use crate::frame::{REPORT_PAYLOAD, RESP_TIMEOUT_WAIT_FLAG};

/// First sleep between status reads
pub const INITIAL_POLL_SLEEP_MS: u32 = 1;
/// Longest sleep between status reads
pub const MAX_POLL_SLEEP_MS: u32 = 500;
/// Extra time granted once while the device waits for a touch
pub const TOUCH_EXTENSION_MS: u32 = 15000;

/// How masked status bits are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    /// Every masked bit must match
    And,
    /// One matching masked bit suffices
    Or,
}

/// Which state the masked bits must be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Bits set
    Set,
    /// Bits cleared
    Clear,
}

/// Condition on the status byte of a feature report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitCondition {
    /// Bits looked at
    pub mask: u8,
    /// How they are combined
    pub logic: Logic,
    /// What they must be
    pub polarity: Polarity,
}

impl WaitCondition {
    /// All bits of `mask` set
    pub const fn all_set(mask: u8) -> Self {
        Self {
            mask,
            logic: Logic::And,
            polarity: Polarity::Set,
        }
    }

    /// Any bit of `mask` set
    pub const fn any_set(mask: u8) -> Self {
        Self {
            mask,
            logic: Logic::Or,
            polarity: Polarity::Set,
        }
    }

    /// All bits of `mask` cleared
    pub const fn all_clear(mask: u8) -> Self {
        Self {
            mask,
            logic: Logic::And,
            polarity: Polarity::Clear,
        }
    }

    /// Whether `status` satisfies the condition
    pub const fn matches(&self, status: u8) -> bool {
        let bits = match self.polarity {
            Polarity::Set => status & self.mask,
            Polarity::Clear => !status & self.mask,
        };
        match self.logic {
            Logic::And => bits == self.mask,
            Logic::Or => bits != 0,
        }
    }
}

/// Poll the device until its status byte satisfies `cond`
///
/// Sleeps 1 ms before the first read and doubles the sleep up to 500 ms.
/// Elapsed time is the sum of requested sleeps; once it reaches
/// `timeout_ms` the call fails with `Timeout`. `last` always holds the
/// last report read, also on failure.
///
/// When the device signals that it waits for a touch, `may_block` extends
/// the timeout once by 15 s. Without it the device's response state is
/// reset and the call fails with `WouldBlock`.
pub fn wait_for_status<D: HidDevice + ?Sized>(
    dev: &mut D,
    cond: WaitCondition,
    timeout_ms: u32,
    may_block: bool,
    last: &mut Report,
) -> Result<()> {
    let mut sleep = INITIAL_POLL_SLEEP_MS;
    let mut slept = 0u32;
    let mut deadline = timeout_ms;
    let mut blocking = false;

    while slept < deadline {
        dev.delay_ms(sleep);
        slept = slept.saturating_add(sleep);
        sleep = (sleep * 2).min(MAX_POLL_SLEEP_MS);

        dev.get_feature_report(last)?;
        let status = last[REPORT_PAYLOAD];
        log::trace!("poll: status {:#04x} after {} ms", status, slept);

        if cond.matches(status) {
            return Ok(());
        }

        if status & RESP_TIMEOUT_WAIT_FLAG != 0 {
            if !may_block {
                super::ops::force_key_update(dev)?;
                return Err(TransportError::WouldBlock.into());
            }
            if !blocking {
                log::info!("Touch the token to continue");
                blocking = true;
                deadline = deadline.saturating_add(TOUCH_EXTENSION_MS);
            }
        } else if blocking {
            // Device gave up waiting for the touch
            break;
        }
    }

    log::debug!("poll: timed out after {} ms (status {:#04x})", slept, last[REPORT_PAYLOAD]);
    Err(TransportError::Timeout.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::testing::ScriptedDevice;

    fn status_report(status: u8) -> Report {
        let mut r = [0u8; 8];
        r[7] = status;
        r
    }

    fn bit0_from_third_read() -> ScriptedDevice {
        ScriptedDevice::with_reads(&[status_report(0x00), status_report(0x00), status_report(0x01)])
    }

    #[test]
    fn test_condition_combinators() {
        assert!(WaitCondition::all_set(0x03).matches(0x07));
        assert!(!WaitCondition::all_set(0x03).matches(0x01));
        assert!(WaitCondition::any_set(0x03).matches(0x02));
        assert!(!WaitCondition::any_set(0x03).matches(0x04));
        assert!(WaitCondition::all_clear(0x80).matches(0x7f));
        assert!(!WaitCondition::all_clear(0x80).matches(0x80));

        let any_clear = WaitCondition {
            mask: 0x03,
            logic: Logic::Or,
            polarity: Polarity::Clear,
        };
        assert!(any_clear.matches(0x01));
        assert!(!any_clear.matches(0x03));
    }

    #[test]
    fn test_succeeds_on_third_read() {
        let mut dev = bit0_from_third_read();
        let mut last = [0u8; 8];
        wait_for_status(&mut dev, WaitCondition::all_set(0x01), 4, false, &mut last).unwrap();
        assert_eq!(dev.reads, 3);
        assert_eq!(dev.slept_ms, 1 + 2 + 4);
        assert_eq!(last[7], 0x01);
    }

    #[test]
    fn test_times_out_before_third_read() {
        let mut dev = bit0_from_third_read();
        let mut last = [0xffu8; 8];
        let err = wait_for_status(&mut dev, WaitCondition::all_set(0x01), 3, false, &mut last)
            .unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Timeout));
        assert!(err.is_retryable());
        assert_eq!(dev.reads, 2);
        // Last observed status is still reported
        assert_eq!(last, status_report(0x00));
    }

    /// Never reports the awaited bit; only counts polls
    struct NeverReady(u32);

    impl HidDevice for NeverReady {
        fn get_feature_report(&mut self, report: &mut Report) -> Result<()> {
            self.0 += 1;
            *report = [0u8; 8];
            Ok(())
        }

        fn set_feature_report(&mut self, _report: &Report) -> Result<()> {
            Ok(())
        }

        fn delay_ms(&mut self, _ms: u32) {}
    }

    #[test]
    fn test_longest_timeout_does_not_overflow() {
        let mut dev = NeverReady(0);
        let mut last = [0u8; 8];
        let err = wait_for_status(&mut dev, WaitCondition::all_set(0x01), u32::MAX, false, &mut last)
            .unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Timeout));
        // 1 + 2 + .. + 256 ms, then 500 ms per poll up to u32::MAX
        assert_eq!(dev.0, 9 + (u32::MAX - 511).div_ceil(500));
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut dev = ScriptedDevice::with_reads(&[status_report(0x00)]);
        let mut last = [0u8; 8];
        let _ = wait_for_status(&mut dev, WaitCondition::all_set(0x01), 2000, false, &mut last);
        assert!(dev.delays.iter().all(|&d| d <= MAX_POLL_SLEEP_MS));
        assert_eq!(dev.delays[..4], [1, 2, 4, 8]);
        assert!(dev.slept_ms >= 2000);
    }

    #[test]
    fn test_touch_wait_would_block() {
        let mut dev = ScriptedDevice::with_reads(&[status_report(RESP_TIMEOUT_WAIT_FLAG)]);
        let mut last = [0u8; 8];
        let err = wait_for_status(&mut dev, WaitCondition::all_set(0x40), 1000, false, &mut last)
            .unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::WouldBlock));
        // Response state was reset
        assert_eq!(dev.writes.last().map(|r| r[7]), Some(0x8f));
    }

    #[test]
    fn test_touch_wait_extends_timeout() {
        let mut reads = [status_report(RESP_TIMEOUT_WAIT_FLAG); 12];
        reads[11] = status_report(0x40);
        let mut dev = ScriptedDevice::with_reads(&reads);
        let mut last = [0u8; 8];
        wait_for_status(&mut dev, WaitCondition::all_set(0x40), 1000, true, &mut last).unwrap();
        assert!(dev.slept_ms > 1000);
    }

    #[test]
    fn test_touch_abandoned() {
        let mut dev = ScriptedDevice::with_reads(&[
            status_report(RESP_TIMEOUT_WAIT_FLAG),
            status_report(0x00),
            status_report(0x40),
        ]);
        let mut last = [0u8; 8];
        let err = wait_for_status(&mut dev, WaitCondition::all_set(0x40), 1000, true, &mut last)
            .unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Timeout));
        assert_eq!(dev.reads, 2);
    }
}
