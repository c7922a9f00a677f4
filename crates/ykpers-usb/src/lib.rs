//! ykpers-usb - USB HID transport
//!
//! Talks to the token's keyboard interface through HID class control
//! transfers: GET_REPORT / SET_REPORT on feature report 0, always 8 bytes.
//!
//! # Example
//!
//! ```no_run
//! use ykpers_usb::YubiKeyUsb;
//!
//! let mut key = YubiKeyUsb::open_first()?;
//! let status = ykpers_core::protocol::read_status(&mut key)?;
//! println!("firmware {}", status.version());
//! key.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;
mod protocol;

pub use device::{DeviceInfo, YubiKeyUsb};
pub use error::{Result, UsbError};
pub use protocol::{PRODUCT_IDS, VENDOR_ID};
