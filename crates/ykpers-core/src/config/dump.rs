//! Key/value text dump of a configuration

use alloc::string::String;
use core::fmt::{self, Write};

use crate::codec::{self, Encoding};
use crate::error::{ConfigError, Result};

use super::flags::{self, FlagGroup};
use super::handle::Config;

/// Write the dump of `cfg` to `out`
///
/// ```text
/// fixed: m:<modhex>
/// uid: h:<hex>
/// key: h:<hex>
/// acc_code: h:<hex>
/// ticket_flags: A|B
/// config_flags: C
/// extended_flags:
/// ```
///
/// A flag is listed when all its bits are set, the target firmware knows
/// it and it applies to the current mode.
pub fn write_dump<W: Write>(cfg: &Config, out: &mut W) -> fmt::Result {
    let rec = cfg.record();
    let modhex = Encoding::Modhex.prefix();
    let hex = Encoding::Hex.prefix();
    writeln!(out, "fixed: {}{}", modhex, codec::modhex_encode(cfg.fixed()))?;
    writeln!(out, "uid: {}{}", hex, codec::hex_encode(&rec.uid))?;
    writeln!(out, "key: {}{}", hex, codec::hex_encode(&rec.key))?;
    writeln!(out, "acc_code: {}{}", hex, codec::hex_encode(&rec.acc_code))?;

    let (major, minor) = cfg.version();
    let mode = cfg.mode();
    for group in [FlagGroup::Ticket, FlagGroup::Config, FlagGroup::Extended] {
        write!(out, "{}: ", group.dump_key())?;
        let listed = flags::group(group).filter(|def| {
            cfg.flag(def.flag) && def.version.allows(major, minor) && def.modes.includes(mode)
        });
        for (i, def) in listed.enumerate() {
            if i > 0 {
                out.write_char('|')?;
            }
            out.write_str(def.name)?;
        }
        out.write_char('\n')?;
    }
    Ok(())
}

/// Dump of `cfg` as a string
pub fn dump(cfg: &Config) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_dump(cfg, &mut out);
    out
}

/// Parse a dump back into a configuration
///
/// Not supported; always fails with `NotYetImplemented`.
pub fn read_dump(_text: &str) -> Result<Config> {
    Err(ConfigError::NotYetImplemented.into())
}
