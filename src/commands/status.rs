//! Status command

use crate::devices::Device;
use serde::Serialize;
use std::error::Error;
use ykpers_core::protocol;
use ykpers_core::slot::Slot;
use ykpers_core::status::DeviceStatus;

/// Device status as printed by `status --json`
#[derive(Debug, Serialize)]
struct StatusView {
    firmware: String,
    supported: bool,
    program_sequence: u8,
    touch_level: u16,
    slot1_configured: bool,
    slot2_configured: bool,
}

impl From<&DeviceStatus> for StatusView {
    fn from(st: &DeviceStatus) -> Self {
        Self {
            firmware: st.version().to_string(),
            supported: st.is_supported_firmware(),
            program_sequence: st.pgm_seq,
            touch_level: st.touch_level.bits(),
            slot1_configured: st.slot_configured(Slot::One),
            slot2_configured: st.slot_configured(Slot::Two),
        }
    }
}

/// Print firmware version and slot state
pub fn cmd_status(dev: &mut Device, json: bool) -> Result<(), Box<dyn Error>> {
    let status = protocol::read_status(dev)?;
    let view = StatusView::from(&status);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Firmware version:  {}", view.firmware);
    if !view.supported {
        println!("                   (not supported by this tool)");
    }
    println!("Program sequence:  {}", view.program_sequence);
    println!("Touch level:       {:#06x}", view.touch_level);
    // Slot state bits only exist from firmware 2.0 on
    if status.at_least(2, 0) {
        println!(
            "Slot 1:            {}",
            if view.slot1_configured { "configured" } else { "empty" }
        );
        println!(
            "Slot 2:            {}",
            if view.slot2_configured { "configured" } else { "empty" }
        );
    }
    Ok(())
}
