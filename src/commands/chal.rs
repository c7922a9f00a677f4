//! Challenge-response command

use crate::devices::Device;
use std::error::Error;
use ykpers_core::codec;
use ykpers_core::error::ConfigError;
use ykpers_core::protocol;
use ykpers_core::slot::{ChallengeKind, Slot};

/// Send `challenge` to slot `slot_num` and print the response in hex
pub fn cmd_chal_resp(
    dev: &mut Device,
    slot_num: u8,
    yubico: bool,
    hex: bool,
    may_block: bool,
    challenge: &str,
) -> Result<(), Box<dyn Error>> {
    let slot = Slot::from_number(slot_num)?;
    let status = protocol::check_firmware(dev)?;
    if !status.at_least(2, 2) {
        return Err(ykpers_core::Error::from(ConfigError::OldYubikey).into());
    }

    let bytes = if hex {
        codec::hex_decode(challenge).map_err(|e| format!("Invalid hex challenge: {}", e))?
    } else {
        challenge.as_bytes().to_vec()
    };
    let kind = if yubico {
        ChallengeKind::YubicoOtp
    } else {
        ChallengeKind::Hmac
    };

    if may_block {
        log::info!("Touch the token if it is blinking");
    }
    let response = protocol::challenge_response(dev, slot, kind, &bytes, may_block)?;
    println!("{}", codec::hex_encode(&response));
    Ok(())
}
