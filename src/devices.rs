//! Device backend registration and dispatch
//!
//! Backends are feature-gated. A device string is a backend name,
//! optionally followed by options: `usb:index=1`, `dummy:firmware=2.4`.

use std::error::Error;
use ykpers_core::device::HidDevice;

/// An opened device of any backend
pub type Device = Box<dyn HidDevice + Send>;

/// Information about a device backend
pub struct DeviceInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// All backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    #[cfg(feature = "usb")]
    devices.push(DeviceInfo {
        name: "usb",
        aliases: &["yubikey"],
        description: "Token on USB (VID:1050) (index=<n>)",
    });

    #[cfg(feature = "dummy")]
    devices.push(DeviceInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory token emulator (firmware=<x.y[.z]>,serial=<n>)",
    });

    devices
}

/// Short list of backend names for CLI help
pub fn device_names_short() -> String {
    let devices = available_devices();
    let names: Vec<&str> = devices.iter().map(|d| d.name).collect();
    names.join(", ")
}

/// Resolve a backend name or alias
pub fn find_device(name: &str) -> Option<&'static str> {
    available_devices()
        .into_iter()
        .find(|d| d.name == name || d.aliases.contains(&name))
        .map(|d| d.name)
}

/// Split `name:key=value,key=value`
pub fn parse_device_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the device described by `device`
#[allow(unused_variables)]
pub fn open_device(device: &str) -> Result<Device, Box<dyn Error>> {
    let (name, options) = parse_device_string(device);

    let canonical = match find_device(name) {
        Some(n) => n,
        None => {
            return Err(format!(
                "Unknown device backend '{}'. Available: {}",
                name,
                device_names_short()
            )
            .into())
        }
    };

    match canonical {
        #[cfg(feature = "usb")]
        "usb" => open_usb(&options),
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&options),
        _ => Err(format!("Device backend '{}' is not enabled", canonical).into()),
    }
}

#[cfg(feature = "usb")]
fn open_usb(options: &[(&str, &str)]) -> Result<Device, Box<dyn Error>> {
    use ykpers_usb::YubiKeyUsb;

    let mut index = 0usize;
    for &(key, value) in options {
        match key {
            "index" => {
                index = value
                    .parse()
                    .map_err(|e| format!("Invalid index '{}': {}", value, e))?
            }
            _ => log::warn!("Ignoring unknown usb option '{}'", key),
        }
    }
    Ok(Box::new(YubiKeyUsb::open_nth(index)?))
}

#[cfg(feature = "dummy")]
fn open_dummy(options: &[(&str, &str)]) -> Result<Device, Box<dyn Error>> {
    use ykpers_dummy::{DummyConfig, DummyKey};

    let mut config = DummyConfig::default();
    for &(key, value) in options {
        match key {
            "firmware" => {
                let (major, minor, build) = parse_firmware(value)?;
                config.major = major;
                config.minor = minor;
                config.build = build;
            }
            "serial" => {
                config.serial = value
                    .parse()
                    .map_err(|e| format!("Invalid serial '{}': {}", value, e))?
            }
            _ => log::warn!("Ignoring unknown dummy option '{}'", key),
        }
    }
    log::info!(
        "Using emulated token, firmware {}.{}.{}",
        config.major,
        config.minor,
        config.build
    );
    Ok(Box::new(DummyKey::new(config)))
}

/// Parse `major.minor[.build]`
#[allow(dead_code)]
fn parse_firmware(s: &str) -> Result<(u8, u8, u8), Box<dyn Error>> {
    let parts = s
        .split('.')
        .map(|p| p.parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Invalid firmware version '{}': {}", s, e))?;
    match parts[..] {
        [major, minor] => Ok((major, minor, 0)),
        [major, minor, build] => Ok((major, minor, build)),
        _ => Err(format!("Invalid firmware version '{}'", s).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_string() {
        assert_eq!(parse_device_string("usb"), ("usb", vec![]));
        assert_eq!(
            parse_device_string("dummy:firmware=2.4,serial=7"),
            ("dummy", vec![("firmware", "2.4"), ("serial", "7")])
        );
    }

    #[test]
    fn test_parse_firmware() {
        assert_eq!(parse_firmware("2.2").unwrap(), (2, 2, 0));
        assert_eq!(parse_firmware("1.3.7").unwrap(), (1, 3, 7));
        assert!(parse_firmware("2").is_err());
        assert!(parse_firmware("two.one").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        let mut dev = open_device("emulator:firmware=2.4.1").unwrap();
        let status = ykpers_core::protocol::read_status(&mut dev).unwrap();
        assert_eq!((status.major, status.minor, status.build), (2, 4, 1));
    }

    #[test]
    fn test_unknown_backend() {
        assert!(open_device("floppy").is_err());
    }
}
