//! Device protocol
//!
//! Everything here is synchronous and blocks in [`HidDevice::delay_ms`]
//! while polling. There is no cancellation besides the timeouts.
//!
//! [`HidDevice::delay_ms`]: crate::device::HidDevice::delay_ms

mod ops;
mod poll;
#[cfg(test)]
pub(crate) mod testing;
mod write;

pub use ops::{
    challenge_response, check_firmware, force_key_update, read_response, read_serial,
    read_status, write_to_key, Response, RESPONSE_CAPACITY, WAIT_FOR_RESPONSE_MS,
    WAIT_FOR_WRITE_FLAG_MS,
};
pub use poll::{
    wait_for_status, Logic, Polarity, WaitCondition, INITIAL_POLL_SLEEP_MS, MAX_POLL_SLEEP_MS,
    TOUCH_EXTENSION_MS,
};
pub use write::{ConfigWrite, WriteState};
