//! Flag table
//!
//! One row per flag: wire bits, names for the dump, command line and JSON,
//! the firmware versions that understand it and the operating modes it
//! applies to. Setters, the dump, mode derivation and the JSON adapter all
//! read this table.

use bitflags::bitflags;

use super::mode::Mode;

/// Which flag byte of the record a flag lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagGroup {
    /// `tkt_flags`
    Ticket,
    /// `cfg_flags`
    Config,
    /// `ext_flags`
    Extended,
}

impl FlagGroup {
    /// Key used for this group in the key/value dump
    pub const fn dump_key(self) -> &'static str {
        match self {
            FlagGroup::Ticket => "ticket_flags",
            FlagGroup::Config => "config_flags",
            FlagGroup::Extended => "extended_flags",
        }
    }
}

/// Firmware versions that understand a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionReq {
    /// Every firmware
    Always,
    /// Major version 1 only
    MajorOne,
    /// Major version 2 and later
    MajorAbove1,
    /// At least `major.minor`
    AtLeast(u8, u8),
}

impl VersionReq {
    /// Whether firmware `major.minor` satisfies this requirement
    pub const fn allows(self, major: u8, minor: u8) -> bool {
        match self {
            VersionReq::Always => true,
            VersionReq::MajorOne => major == 1,
            VersionReq::MajorAbove1 => major > 1,
            VersionReq::AtLeast(maj, min) => major > maj || (major == maj && minor >= min),
        }
    }
}

bitflags! {
    /// Set of operating modes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modes: u8 {
        /// Yubico OTP
        const OTP_YUBICO = 0x01;
        /// Static password
        const STATIC_TICKET = 0x02;
        /// OATH-HOTP
        const OATH_HOTP = 0x04;
        /// Yubico OTP challenge-response
        const CHAL_YUBICO = 0x08;
        /// HMAC-SHA-1 challenge-response
        const CHAL_HMAC = 0x10;

        /// Modes that type their output
        const KEYBOARD = Self::OTP_YUBICO.bits() | Self::STATIC_TICKET.bits() | Self::OATH_HOTP.bits();
        /// Challenge-response modes
        const CHAL = Self::CHAL_YUBICO.bits() | Self::CHAL_HMAC.bits();
    }
}

impl Modes {
    /// The set containing only `mode`
    pub const fn of(mode: Mode) -> Self {
        match mode {
            Mode::OtpYubico => Self::OTP_YUBICO,
            Mode::StaticTicket => Self::STATIC_TICKET,
            Mode::OathHotp => Self::OATH_HOTP,
            Mode::ChalYubico => Self::CHAL_YUBICO,
            Mode::ChalHmac => Self::CHAL_HMAC,
        }
    }

    /// Whether `mode` is in the set
    pub const fn includes(self, mode: Mode) -> bool {
        self.contains(Self::of(mode))
    }
}

/// Every flag the record knows about
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    TabFirst,
    AppendTab1,
    AppendTab2,
    AppendDelay1,
    AppendDelay2,
    AppendCr,
    ProtectCfg2,
    OathHotp,
    ChalResp,
    SendRef,
    TicketFirst,
    Pacing10Ms,
    Pacing20Ms,
    AllowHidtrig,
    StaticTicket,
    ShortTicket,
    StrongPw1,
    StrongPw2,
    ManUpdate,
    OathHotp8,
    OathFixedModhex1,
    OathFixedModhex2,
    OathFixedModhex,
    ChalYubico,
    ChalHmac,
    HmacLt64,
    ChalBtnTrig,
    SerialBtnVisible,
    SerialUsbVisible,
    SerialApiVisible,
    UseNumericKeypad,
    FastTrig,
    AllowUpdate,
    Dormant,
    LedInv,
}

/// One row of the flag table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDef {
    /// Flag this row describes
    pub flag: Flag,
    /// Name in the key/value dump
    pub name: &'static str,
    /// Command line option (`-o <option>` / `-o -<option>`)
    pub option: &'static str,
    /// JSON option name; `None` for flags that select the mode
    pub json: Option<&'static str>,
    /// Flag byte
    pub group: FlagGroup,
    /// Bit value; set means all bits present
    pub bits: u8,
    /// Firmware requirement
    pub version: VersionReq,
    /// Modes the flag is meaningful in
    pub modes: Modes,
}

macro_rules! flag_table {
    ($( $flag:ident, $name:literal, $option:literal, $json:expr, $group:ident, $bits:literal, $version:expr, $modes:expr; )*) => {
        /// The flag table, in dump order
        pub const FLAGS: &[FlagDef] = &[
            $( FlagDef {
                flag: Flag::$flag,
                name: $name,
                option: $option,
                json: $json,
                group: FlagGroup::$group,
                bits: $bits,
                version: $version,
                modes: $modes,
            }, )*
        ];
    };
}

use VersionReq::{Always, AtLeast, MajorAbove1, MajorOne};

const ALL: Modes = Modes::all();
const KBD: Modes = Modes::KEYBOARD;
const CHAL: Modes = Modes::CHAL;
const OTP_STATIC: Modes = Modes::OTP_YUBICO.union(Modes::STATIC_TICKET);
const STATIC: Modes = Modes::STATIC_TICKET;
const HOTP: Modes = Modes::OATH_HOTP;

flag_table! {
    TabFirst,          "TAB_FIRST",          "tab-first",          Some("tabFirst"),         Ticket,   0x01, Always,          KBD;
    AppendTab1,        "APPEND_TAB1",        "append-tab1",        Some("tabBetween"),       Ticket,   0x02, Always,          KBD;
    AppendTab2,        "APPEND_TAB2",        "append-tab2",        Some("tabLast"),          Ticket,   0x04, Always,          KBD;
    AppendDelay1,      "APPEND_DELAY1",      "append-delay1",      Some("appendDelay1"),     Ticket,   0x08, Always,          KBD;
    AppendDelay2,      "APPEND_DELAY2",      "append-delay2",      Some("appendDelay2"),     Ticket,   0x10, Always,          KBD;
    AppendCr,          "APPEND_CR",          "append-cr",          Some("appendCR"),         Ticket,   0x20, Always,          KBD;
    ProtectCfg2,       "PROTECT_CFG2",       "protect-cfg2",       Some("protectSecond"),    Ticket,   0x80, MajorAbove1,     ALL;
    OathHotp,          "OATH_HOTP",          "oath-hotp",          None,                     Ticket,   0x40, AtLeast(2, 1),   HOTP;
    ChalResp,          "CHAL_RESP",          "chal-resp",          None,                     Ticket,   0x40, AtLeast(2, 2),   CHAL;
    SendRef,           "SEND_REF",           "send-ref",           Some("sendRef"),          Config,   0x01, Always,          OTP_STATIC;
    TicketFirst,       "TICKET_FIRST",       "ticket-first",       Some("ticketFirst"),      Config,   0x02, MajorOne,        OTP_STATIC;
    Pacing10Ms,        "PACING_10MS",        "pacing-10ms",        Some("pacing10MS"),       Config,   0x04, Always,          KBD;
    Pacing20Ms,        "PACING_20MS",        "pacing-20ms",        Some("pacing20MS"),       Config,   0x08, Always,          KBD;
    AllowHidtrig,      "ALLOW_HIDTRIG",      "allow-hidtrig",      Some("allowHidtrig"),     Config,   0x10, MajorOne,        KBD;
    StaticTicket,      "STATIC_TICKET",      "static-ticket",      None,                     Config,   0x20, Always,          STATIC;
    ShortTicket,       "SHORT_TICKET",       "short-ticket",       Some("shortTicket"),      Config,   0x02, MajorAbove1,     STATIC;
    StrongPw1,         "STRONG_PW1",         "strong-pw1",         Some("strongPw1"),        Config,   0x10, MajorAbove1,     STATIC;
    StrongPw2,         "STRONG_PW2",         "strong-pw2",         Some("strongPw2"),        Config,   0x40, MajorAbove1,     STATIC;
    ManUpdate,         "MAN_UPDATE",         "man-update",         Some("manUpdate"),        Config,   0x80, MajorAbove1,     STATIC;
    OathHotp8,         "OATH_HOTP8",         "oath-hotp8",         None,                     Config,   0x02, AtLeast(2, 1),   HOTP;
    OathFixedModhex1,  "OATH_FIXED_MODHEX1", "oath-fixed-modhex1", None,                     Config,   0x10, AtLeast(2, 1),   HOTP;
    OathFixedModhex2,  "OATH_FIXED_MODHEX2", "oath-fixed-modhex2", None,                     Config,   0x40, AtLeast(2, 1),   HOTP;
    OathFixedModhex,   "OATH_FIXED_MODHEX",  "oath-fixed-modhex",  None,                     Config,   0x50, AtLeast(2, 1),   HOTP;
    ChalYubico,        "CHAL_YUBICO",        "chal-yubico",        None,                     Config,   0x20, AtLeast(2, 2),   Modes::CHAL_YUBICO;
    ChalHmac,          "CHAL_HMAC",          "chal-hmac",          None,                     Config,   0x22, AtLeast(2, 2),   Modes::CHAL_HMAC;
    HmacLt64,          "HMAC_LT64",          "hmac-lt64",          Some("hmacLT64"),         Config,   0x04, AtLeast(2, 2),   Modes::CHAL_HMAC;
    ChalBtnTrig,       "CHAL_BTN_TRIG",      "chal-btn-trig",      Some("buttonReqd"),       Config,   0x08, AtLeast(2, 2),   CHAL;
    SerialBtnVisible,  "SERIAL_BTN_VISIBLE", "serial-btn-visible", Some("serialBtnVisible"), Extended, 0x01, AtLeast(2, 2),   ALL;
    SerialUsbVisible,  "SERIAL_USB_VISIBLE", "serial-usb-visible", Some("serialUsbVisible"), Extended, 0x02, AtLeast(2, 2),   ALL;
    SerialApiVisible,  "SERIAL_API_VISIBLE", "serial-api-visible", Some("serialApiVisible"), Extended, 0x04, AtLeast(2, 2),   ALL;
    UseNumericKeypad,  "USE_NUMERIC_KEYPAD", "use-numeric-keypad", Some("useNumericKeypad"), Extended, 0x08, AtLeast(2, 3),   ALL;
    FastTrig,          "FAST_TRIG",          "fast-trig",          Some("fastTrig"),         Extended, 0x10, AtLeast(2, 3),   ALL;
    AllowUpdate,       "ALLOW_UPDATE",       "allow-update",       Some("allowUpdate"),      Extended, 0x20, AtLeast(2, 3),   ALL;
    Dormant,           "DORMANT",            "dormant",            Some("dormant"),          Extended, 0x40, AtLeast(2, 3),   ALL;
    LedInv,            "LED_INV",            "led-inv",            Some("ledInverted"),      Extended, 0x80, AtLeast(2, 4),   ALL;
}

impl Flag {
    /// Table row of this flag
    pub fn def(self) -> &'static FlagDef {
        // Rows are in declaration order
        &FLAGS[self as usize]
    }

    /// Wire bits of this flag within its group byte
    pub fn bits(self) -> u8 {
        self.def().bits
    }

    /// Look up a flag by its command line option
    pub fn from_option(option: &str) -> Option<Self> {
        FLAGS.iter().find(|d| d.option == option).map(|d| d.flag)
    }

    /// Look up a flag by its JSON option name
    pub fn from_json(name: &str) -> Option<Self> {
        FLAGS.iter().find(|d| d.json == Some(name)).map(|d| d.flag)
    }

    /// Look up a flag by its dump name
    pub fn from_name(name: &str) -> Option<Self> {
        FLAGS.iter().find(|d| d.name == name).map(|d| d.flag)
    }
}

/// Rows of one flag byte, in table order
pub fn group(group: FlagGroup) -> impl Iterator<Item = &'static FlagDef> {
    FLAGS.iter().filter(move |d| d.group == group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for (i, def) in FLAGS.iter().enumerate() {
            assert_eq!(def.flag as usize, i, "{} out of order", def.name);
        }
        assert_eq!(Flag::LedInv.def().name, "LED_INV");
    }

    #[test]
    fn test_names_unique() {
        for (i, a) in FLAGS.iter().enumerate() {
            for b in &FLAGS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.option, b.option);
                if a.json.is_some() {
                    assert_ne!(a.json, b.json);
                }
            }
        }
    }

    #[test]
    fn test_version_req() {
        assert!(Always.allows(0, 9));
        assert!(MajorOne.allows(1, 3));
        assert!(!MajorOne.allows(2, 0));
        assert!(MajorAbove1.allows(2, 0));
        assert!(!MajorAbove1.allows(1, 9));
        assert!(AtLeast(2, 2).allows(2, 2));
        assert!(AtLeast(2, 2).allows(3, 0));
        assert!(!AtLeast(2, 2).allows(2, 1));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Flag::from_option("chal-hmac"), Some(Flag::ChalHmac));
        assert_eq!(Flag::from_json("appendCR"), Some(Flag::AppendCr));
        assert_eq!(Flag::from_name("STRONG_PW2"), Some(Flag::StrongPw2));
        assert_eq!(Flag::from_option("bogus"), None);
        assert_eq!(Flag::ChalHmac.def().bits, 0x22);
        assert_eq!(group(FlagGroup::Extended).count(), 8);
    }

    #[test]
    fn test_modes() {
        assert!(Modes::KEYBOARD.includes(Mode::StaticTicket));
        assert!(!Modes::KEYBOARD.includes(Mode::ChalHmac));
        assert!(Modes::all().includes(Mode::ChalYubico));
    }
}
