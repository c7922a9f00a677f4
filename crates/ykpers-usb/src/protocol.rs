//! USB identifiers and HID request constants

/// Yubico vendor id
pub const VENDOR_ID: u16 = 0x1050;

/// Product ids that expose the OTP keyboard interface
pub const PRODUCT_IDS: &[u16] = &[
    0x0010, // YubiKey
    0x0110, // NEO OTP
    0x0111, // NEO OTP+CCID
    0x0114, // NEO OTP+U2F
    0x0116, // NEO OTP+U2F+CCID
    0x0401, // YubiKey 4 OTP
    0x0403, // YubiKey 4 OTP+U2F
    0x0405, // YubiKey 4 OTP+CCID
    0x0407, // YubiKey 4 OTP+U2F+CCID
    0x0410, // YubiKey Plus U2F+OTP
];

/// HID keyboard interface
pub const HID_INTERFACE: u8 = 0;

/// HID class request GET_REPORT
pub const HID_GET_REPORT: u8 = 0x01;
/// HID class request SET_REPORT
pub const HID_SET_REPORT: u8 = 0x09;
/// Report type "feature" in the high byte, report id 0
pub const REPORT_TYPE_FEATURE: u16 = 0x0300;

/// Timeout of a single control transfer, in milliseconds
pub const USB_TIMEOUT_MS: u64 = 1000;

/// Whether `product_id` is one of ours
pub fn is_supported_product(product_id: u16) -> bool {
    PRODUCT_IDS.contains(&product_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_products() {
        assert!(is_supported_product(0x0010));
        assert!(is_supported_product(0x0407));
        assert!(!is_supported_product(0x0402));
    }

    #[test]
    fn test_feature_report_value() {
        // wValue = (report type << 8) | report id
        assert_eq!(REPORT_TYPE_FEATURE >> 8, 3);
        assert_eq!(REPORT_TYPE_FEATURE & 0xff, 0);
    }
}
