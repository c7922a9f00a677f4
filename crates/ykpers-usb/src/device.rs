//! USB device handle

use std::fmt;
use std::time::Duration;

use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient};
use nusb::MaybeFuture;
use ykpers_core::device::{HidDevice, Report};
use ykpers_core::error::Result as CoreResult;
use ykpers_core::frame::REPORT_SIZE;

use crate::error::{Result, UsbError};
use crate::protocol::*;

/// An opened token
pub struct YubiKeyUsb {
    interface: nusb::Interface,
    info: DeviceInfo,
}

/// A connected token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    /// USB product id
    pub product_id: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "YubiKey {:04x}:{:04x} at bus {} address {}",
            VENDOR_ID, self.product_id, self.bus, self.address
        )
    }
}

fn supported_devices() -> Result<Vec<nusb::DeviceInfo>> {
    Ok(nusb::list_devices()
        .wait()
        .map_err(|e| UsbError::OpenFailed(e.to_string()))?
        .filter(|d| d.vendor_id() == VENDOR_ID && is_supported_product(d.product_id()))
        .collect())
}

impl YubiKeyUsb {
    /// Open the first connected token
    pub fn open_first() -> Result<Self> {
        Self::open_nth(0)
    }

    /// Open the nth connected token (0-indexed)
    pub fn open_nth(index: usize) -> Result<Self> {
        let devices = supported_devices()?;
        let device_info = devices.get(index).ok_or(UsbError::DeviceNotFound)?;

        let info = DeviceInfo {
            bus: device_info.busnum(),
            address: device_info.device_address(),
            product_id: device_info.product_id(),
        };
        log::info!("Opening {}", info);

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        // The keyboard interface is normally bound to the kernel HID driver
        let interface = device
            .detach_and_claim_interface(HID_INTERFACE)
            .wait()
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        Ok(Self { interface, info })
    }

    /// List connected tokens
    pub fn list_devices() -> Result<Vec<DeviceInfo>> {
        Ok(supported_devices()?
            .into_iter()
            .map(|d| DeviceInfo {
                bus: d.busnum(),
                address: d.device_address(),
                product_id: d.product_id(),
            })
            .collect())
    }

    /// Which device this handle talks to
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Release the interface
    pub fn close(self) {
        log::debug!("Closing {}", self.info);
    }

    fn get_report(&mut self, report: &mut Report) -> Result<()> {
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Class,
                    recipient: Recipient::Interface,
                    request: HID_GET_REPORT,
                    value: REPORT_TYPE_FEATURE,
                    index: HID_INTERFACE as u16,
                    length: REPORT_SIZE as u16,
                },
                Duration::from_millis(USB_TIMEOUT_MS),
            )
            .wait()
            .map_err(|e| UsbError::TransferFailed(format!("GET_REPORT: {}", e)))?;

        if data.len() < REPORT_SIZE {
            return Err(UsbError::ShortReport(data.len()));
        }
        report.copy_from_slice(&data[..REPORT_SIZE]);
        Ok(())
    }

    fn set_report(&mut self, report: &Report) -> Result<()> {
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Class,
                    recipient: Recipient::Interface,
                    request: HID_SET_REPORT,
                    value: REPORT_TYPE_FEATURE,
                    index: HID_INTERFACE as u16,
                    data: report,
                },
                Duration::from_millis(USB_TIMEOUT_MS),
            )
            .wait()
            .map_err(|e| UsbError::TransferFailed(format!("SET_REPORT: {}", e)))?;
        Ok(())
    }
}

impl HidDevice for YubiKeyUsb {
    fn get_feature_report(&mut self, report: &mut Report) -> CoreResult<()> {
        self.get_report(report).map_err(Into::into)
    }

    fn set_feature_report(&mut self, report: &Report) -> CoreResult<()> {
        self.set_report(report).map_err(Into::into)
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}
