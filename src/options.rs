//! `-o` configuration options
//!
//! `key=value` options set fields; anything else names a flag from the
//! flag table, with a leading `-` to clear it.

use thiserror::Error;
use ykpers_core::codec::{decode_prefixed, Encoding};
use ykpers_core::config::{Config, Flag};
use ykpers_core::frame::{ACC_CODE_SIZE, FIXED_SIZE, UID_SIZE};

/// Option parsing errors
#[derive(Debug, Error)]
pub enum OptionError {
    /// Neither a known `key=` option nor a flag name
    #[error("Unknown option '{0}'")]
    Unknown(String),

    /// The value could not be parsed
    #[error("Invalid value for '{option}': {reason}")]
    InvalidValue { option: String, reason: String },

    /// The configuration refused the option
    #[error("Option '{option}' rejected: {source}")]
    Rejected {
        option: String,
        #[source]
        source: ykpers_core::Error,
    },
}

/// Values that are consumed after all options have been applied
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptionState {
    /// Salt for passphrase derivation
    pub salt: Option<Vec<u8>>,
    /// Derive the access code from the device serial
    pub access_by_serial: bool,
}

/// Apply every option in order
pub fn apply_options(cfg: &mut Config, options: &[String]) -> Result<OptionState, OptionError> {
    let mut state = OptionState::default();
    for opt in options {
        apply_option(cfg, &mut state, opt)?;
    }
    Ok(state)
}

fn invalid(option: &str, reason: impl ToString) -> OptionError {
    OptionError::InvalidValue {
        option: option.to_string(),
        reason: reason.to_string(),
    }
}

fn rejected(option: &str, source: ykpers_core::Error) -> OptionError {
    OptionError::Rejected {
        option: option.to_string(),
        source,
    }
}

/// Apply a single option
pub fn apply_option(cfg: &mut Config, state: &mut OptionState, opt: &str) -> Result<(), OptionError> {
    if let Some((key, value)) = opt.split_once('=') {
        match key {
            "fixed" => {
                let fixed = decode_prefixed(value, Encoding::Modhex, 0, FIXED_SIZE * 2)
                    .map_err(|e| invalid(opt, e))?;
                cfg.set_fixed(&fixed);
            }
            "uid" => {
                let uid = decode_prefixed(value, Encoding::Hex, UID_SIZE * 2, UID_SIZE * 2)
                    .map_err(|e| invalid(opt, e))?;
                cfg.set_uid(&uid).map_err(|e| rejected(opt, e))?;
            }
            "access" if value == "serial" => state.access_by_serial = true,
            "access" => {
                let code =
                    decode_prefixed(value, Encoding::Hex, ACC_CODE_SIZE * 2, ACC_CODE_SIZE * 2)
                        .map_err(|e| invalid(opt, e))?;
                cfg.set_access_code(&code);
                state.access_by_serial = false;
            }
            "salt" => state.salt = Some(value.as_bytes().to_vec()),
            "oath-imf" => {
                let imf: u32 = value.parse().map_err(|e| invalid(opt, e))?;
                cfg.set_oath_imf(imf).map_err(|e| rejected(opt, e))?;
            }
            _ => return Err(OptionError::Unknown(opt.to_string())),
        }
        return Ok(());
    }

    let (on, name) = match opt.strip_prefix('-') {
        Some(name) => (false, name),
        None => (true, opt),
    };
    let flag = Flag::from_option(name).ok_or_else(|| OptionError::Unknown(opt.to_string()))?;

    // Selecting OATH-HOTP or challenge-response starts from empty flags
    if on && matches!(flag, Flag::OathHotp | Flag::ChalResp) {
        cfg.reset_flags();
    }
    cfg.set_flag(flag, on).map_err(|e| rejected(opt, e))?;
    log::debug!("{} {}", if on { "set" } else { "cleared" }, flag.def().name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ykpers_core::config::Mode;
    use ykpers_core::error::ConfigError;
    use ykpers_core::status::DeviceStatus;

    fn config(major: u8, minor: u8) -> Config {
        let status = DeviceStatus {
            major,
            minor,
            ..Default::default()
        };
        let mut cfg = Config::new();
        cfg.configure_for(1, &status).unwrap();
        cfg
    }

    fn opts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fields() {
        let mut cfg = config(2, 2);
        let state = apply_options(
            &mut cfg,
            &opts(&["fixed=cbdefg", "uid=h:010203040506", "access=0a0b0c0d0e0f", "salt=pepper"]),
        )
        .unwrap();
        assert_eq!(cfg.fixed(), &[0x01, 0x23, 0x45]);
        assert_eq!(cfg.record().uid, [1, 2, 3, 4, 5, 6]);
        assert_eq!(cfg.record().acc_code, [0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f]);
        assert_eq!(state.salt.as_deref(), Some(&b"pepper"[..]));
    }

    #[test]
    fn test_bad_values() {
        let mut cfg = config(2, 2);
        assert!(matches!(
            apply_options(&mut cfg, &opts(&["uid=0102"])),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            apply_options(&mut cfg, &opts(&["fixed=zz"])),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            apply_options(&mut cfg, &opts(&["frobnicate"])),
            Err(OptionError::Unknown(_))
        ));
    }

    #[test]
    fn test_flags() {
        let mut cfg = config(2, 2);
        apply_options(&mut cfg, &opts(&["-append-cr", "tab-first"])).unwrap();
        assert!(!cfg.flag(Flag::AppendCr));
        assert!(cfg.flag(Flag::TabFirst));
    }

    #[test]
    fn test_version_gated_flag() {
        let mut cfg = config(1, 3);
        match apply_options(&mut cfg, &opts(&["serial-api-visible"])) {
            Err(OptionError::Rejected { source, .. }) => {
                assert_eq!(source, ykpers_core::Error::Config(ConfigError::YubikeyVersion))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mode_selection_resets_flags() {
        let mut cfg = config(2, 2);
        apply_options(&mut cfg, &opts(&["chal-resp", "chal-hmac", "hmac-lt64"])).unwrap();
        assert_eq!(cfg.mode(), Mode::ChalHmac);
        assert!(!cfg.flag(Flag::AppendCr));

        let mut cfg = config(2, 2);
        apply_options(&mut cfg, &opts(&["oath-hotp", "oath-imf=32"])).unwrap();
        assert_eq!(cfg.mode(), Mode::OathHotp);
        assert_eq!(cfg.oath_imf(), 32);
    }

    #[test]
    fn test_access_by_serial() {
        let mut cfg = config(2, 2);
        let state = apply_options(&mut cfg, &opts(&["access=serial"])).unwrap();
        assert!(state.access_by_serial);
    }
}
