//! Serial number command

use crate::devices::Device;
use std::error::Error;
use ykpers_core::error::ConfigError;
use ykpers_core::protocol;

/// Print the device serial number
pub fn cmd_serial(dev: &mut Device) -> Result<(), Box<dyn Error>> {
    let status = protocol::check_firmware(dev)?;
    if !status.at_least(2, 0) {
        return Err(ykpers_core::Error::from(ConfigError::OldYubikey).into());
    }
    let serial = protocol::read_serial(dev)?;
    println!("serial: {}", serial);
    Ok(())
}
