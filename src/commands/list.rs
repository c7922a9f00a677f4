//! List command implementation

use crate::devices;

/// List device backends and, for USB, the connected tokens
pub fn list_devices() {
    println!("Device backends:");
    println!();
    for d in devices::available_devices() {
        println!("  {:8} - {}", d.name, d.description);
    }

    #[cfg(feature = "usb")]
    {
        println!();
        match ykpers_usb::YubiKeyUsb::list_devices() {
            Ok(found) if found.is_empty() => println!("No tokens connected"),
            Ok(found) => {
                println!("Connected tokens:");
                for (i, info) in found.iter().enumerate() {
                    println!("  [{}] {}", i, info);
                }
            }
            Err(e) => log::warn!("USB enumeration failed: {}", e),
        }
    }
}
