//! JSON import/export of a configuration
//!
//! ```json
//! {
//!   "yubiProdConfig": {
//!     "mode": "oathHOTP",
//!     "targetConfig": 1,
//!     "protection": "none",
//!     "scope": "privatePrefix",
//!     "prefix": "cccb",
//!     "options": { "oathDigits": 6, "randomSeed": false, "appendCR": true }
//!   }
//! }
//! ```
//!
//! Options hold every flag that has a JSON name and applies to the mode.

use std::string::String;

use serde_json::{json, Map, Value};

use crate::codec;
use crate::config::{flags, Config, Flag, FlagGroup, Mode};
use crate::error::{ConfigError, Result};

const ROOT: &str = "yubiProdConfig";

/// Export `cfg` as a JSON value
pub fn export(cfg: &Config) -> Value {
    let rec = cfg.record();
    let mode = cfg.mode();
    let mut prod = Map::new();
    let mut options = Map::new();

    prod.insert("mode".into(), json!(mode.json_name()));
    prod.insert("targetConfig".into(), json!(cfg.slot().number()));
    prod.insert("protection".into(), json!(cfg.protection().json_name()));

    if rec.fixed_size != 0 && mode != Mode::StaticTicket {
        let scope = if mode == Mode::OtpYubico && rec.fixed[0] == 0 && rec.fixed[1] == 0 {
            "yubiCloud"
        } else {
            "privatePrefix"
        };
        prod.insert("scope".into(), json!(scope));

        let mut prefix = codec::modhex_encode(&rec.fixed[..2]);
        if mode == Mode::OathHotp {
            let all_modhex = Flag::OathFixedModhex.bits();
            let modhex = rec.cfg_flags & all_modhex;
            options.insert("fixedModhex".into(), json!(modhex == all_modhex));
            if modhex == 0 {
                prefix = codec::hex_encode(&rec.fixed[..2]);
            } else if modhex == Flag::OathFixedModhex1.bits() {
                prefix.truncate(2);
                prefix.push_str(&codec::hex_encode(&rec.fixed[1..2]));
            }
        }
        prod.insert("prefix".into(), json!(prefix));
    } else if mode != Mode::StaticTicket {
        prod.insert("scope".into(), json!("noPublicId"));
    }

    if mode == Mode::OathHotp {
        let digits = if cfg.flag(Flag::OathHotp8) { 8 } else { 6 };
        options.insert("oathDigits".into(), json!(digits));
        let fixed_seed = (rec.uid[5] == 0x00 || rec.uid[5] == 0x01) && rec.uid[4] == 0x00;
        if fixed_seed {
            options.insert("fixedSeedvalue".into(), json!(cfg.oath_imf()));
        }
        options.insert("randomSeed".into(), json!(!fixed_seed));
    }

    for group in [FlagGroup::Ticket, FlagGroup::Config, FlagGroup::Extended] {
        for def in flags::group(group) {
            if let Some(name) = def.json {
                if def.modes.includes(mode) {
                    options.insert(name.into(), json!(cfg.flag(def.flag)));
                }
            }
        }
    }

    prod.insert("options".into(), Value::Object(options));
    let mut root = Map::new();
    root.insert(ROOT.into(), Value::Object(prod));
    Value::Object(root)
}

/// Export `cfg` as pretty-printed JSON text
pub fn export_string(cfg: &Config) -> String {
    // Serializing a Value cannot fail
    serde_json::to_string_pretty(&export(cfg)).unwrap_or_default()
}

/// Apply a JSON configuration to `cfg`
///
/// The flag bytes are rebuilt from the mode and the options; fields are
/// left alone. `targetConfig`, when present, must match the slot `cfg` was
/// configured for.
pub fn import(cfg: &mut Config, text: &str) -> Result<()> {
    let root: Value = serde_json::from_str(text).map_err(|e| {
        log::debug!("JSON parse error: {}", e);
        ConfigError::InvalidValue
    })?;
    let prod = root.get(ROOT).ok_or(ConfigError::InvalidValue)?;
    let mode_name = prod
        .get("mode")
        .and_then(Value::as_str)
        .ok_or(ConfigError::InvalidValue)?;
    let options = prod
        .get("options")
        .and_then(Value::as_object)
        .ok_or(ConfigError::InvalidValue)?;

    if let Some(target) = prod.get("targetConfig") {
        let target = target.as_u64().ok_or(ConfigError::InvalidValue)?;
        if target != cfg.slot().number() as u64 {
            return Err(ConfigError::InvalidValue.into());
        }
    }

    let mode = Mode::from_json_name(mode_name).unwrap_or_else(|| {
        log::warn!("Unknown mode {:?}, using {}", mode_name, Mode::OtpYubico);
        Mode::OtpYubico
    });

    // Built on a copy so a rejected flag leaves `cfg` as it was
    let mut staged = cfg.clone();
    apply_mode(&mut staged, mode, options)?;
    *cfg = staged;
    Ok(())
}

fn apply_mode(cfg: &mut Config, mode: Mode, options: &Map<String, Value>) -> Result<()> {
    cfg.reset_flags();
    match mode {
        Mode::OtpYubico => {}
        Mode::StaticTicket => cfg.set_flag(Flag::StaticTicket, true)?,
        Mode::OathHotp => {
            cfg.set_flag(Flag::OathHotp, true)?;
            if options.get("oathDigits").and_then(Value::as_u64) == Some(8) {
                cfg.set_flag(Flag::OathHotp8, true)?;
            }
            if let Some(random) = options.get("randomSeed").and_then(Value::as_bool) {
                let seed = if random {
                    0
                } else {
                    options
                        .get("fixedSeedvalue")
                        .and_then(Value::as_u64)
                        .unwrap_or(0)
                };
                let seed = u32::try_from(seed).map_err(|_| ConfigError::InvalidValue)?;
                cfg.set_oath_imf(seed)?;
            }
        }
        Mode::ChalYubico => {
            cfg.set_flag(Flag::ChalResp, true)?;
            cfg.set_flag(Flag::ChalYubico, true)?;
        }
        Mode::ChalHmac => {
            cfg.set_flag(Flag::ChalResp, true)?;
            cfg.set_flag(Flag::ChalHmac, true)?;
        }
    }

    for def in flags::FLAGS {
        let Some(name) = def.json else { continue };
        if !def.modes.includes(mode) {
            continue;
        }
        if let Some(on) = options.get(name).and_then(Value::as_bool) {
            if on != cfg.flag(def.flag) {
                cfg.set_flag(def.flag, on)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FLAGS;
    use crate::error::Error;
    use crate::status::DeviceStatus;

    fn config(slot: u8) -> Config {
        let status = DeviceStatus {
            major: 2,
            minor: 4,
            ..Default::default()
        };
        let mut cfg = Config::new();
        cfg.configure_for(slot, &status).unwrap();
        cfg
    }

    #[test]
    fn test_export_defaults() {
        let v = export(&config(1));
        let prod = &v["yubiProdConfig"];
        assert_eq!(prod["mode"], "yubicoOTP");
        assert_eq!(prod["targetConfig"], 1);
        assert_eq!(prod["protection"], "none");
        assert_eq!(prod["scope"], "noPublicId");
        assert_eq!(prod["options"]["appendCR"], true);
        assert_eq!(prod["options"]["tabFirst"], false);
        // Static-only flags are not listed in OTP mode
        assert!(prod["options"].get("strongPw1").is_none());
    }

    #[test]
    fn test_export_oath() {
        let mut cfg = config(1);
        cfg.reset_flags();
        cfg.set_flag(Flag::OathHotp, true).unwrap();
        cfg.set_flag(Flag::OathHotp8, true).unwrap();
        cfg.set_fixed(&[0x01, 0x02, 0x03]);
        cfg.set_oath_imf(16).unwrap();
        let v = export(&cfg);
        let prod = &v["yubiProdConfig"];
        assert_eq!(prod["mode"], "oathHOTP");
        assert_eq!(prod["scope"], "privatePrefix");
        assert_eq!(prod["prefix"], "0102");
        assert_eq!(prod["options"]["oathDigits"], 8);
        assert_eq!(prod["options"]["randomSeed"], false);
        assert_eq!(prod["options"]["fixedSeedvalue"], 16);
        assert_eq!(prod["options"]["fixedModhex"], false);
    }

    #[test]
    fn test_round_trip_every_flag() {
        for mode in Mode::ALL {
            let applicable = FLAGS
                .iter()
                .filter(|d| d.json.is_some() && d.modes.includes(mode) && d.version.allows(2, 4));
            for def in applicable {
                let mut src = config(1);
                src.reset_flags();
                match mode {
                    Mode::OtpYubico => {}
                    Mode::StaticTicket => src.set_flag(Flag::StaticTicket, true).unwrap(),
                    Mode::OathHotp => src.set_flag(Flag::OathHotp, true).unwrap(),
                    Mode::ChalYubico => {
                        src.set_flag(Flag::ChalResp, true).unwrap();
                        src.set_flag(Flag::ChalYubico, true).unwrap();
                    }
                    Mode::ChalHmac => {
                        src.set_flag(Flag::ChalResp, true).unwrap();
                        src.set_flag(Flag::ChalHmac, true).unwrap();
                    }
                }
                src.set_flag(def.flag, true).unwrap();

                let text = export_string(&src);
                let mut dst = config(1);
                import(&mut dst, &text).unwrap();
                assert_eq!(dst.mode(), mode, "{} in {}", def.name, mode);
                assert!(dst.flag(def.flag), "{} lost in {}", def.name, mode);
                assert_eq!(
                    dst.flag_byte(def.group),
                    src.flag_byte(def.group),
                    "{} in {}",
                    def.name,
                    mode
                );
            }
        }
    }

    #[test]
    fn test_import_rejects() {
        let mut cfg = config(1);
        assert!(import(&mut cfg, "not json").is_err());
        assert!(import(&mut cfg, r#"{"yubiProdConfig": {"mode": "yubicoOTP"}}"#).is_err());
        assert!(import(
            &mut cfg,
            r#"{"yubiProdConfig": {"mode": "yubicoOTP", "targetConfig": 2, "options": {}}}"#
        )
        .is_err());
    }

    #[test]
    fn test_import_version_gated() {
        let mut cfg = Config::new();
        let before = *cfg.record();
        let text = r#"{"yubiProdConfig": {"mode": "hmacCR", "options": {}}}"#;
        assert_eq!(
            import(&mut cfg, text).unwrap_err(),
            Error::Config(ConfigError::YubikeyVersion)
        );
        assert_eq!(*cfg.record(), before);
        assert!(cfg.flag(Flag::AppendCr));
    }
}
