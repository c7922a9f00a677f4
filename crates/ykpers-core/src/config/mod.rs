//! Configuration model
//!
//! A [`Config`] owns one [`ConfigRecord`](crate::frame::ConfigRecord) and
//! the firmware version and slot it is validated against. All flag access
//! goes through the table in [`flags`]; the operating mode is always
//! recomputed from the flag bytes by [`derive_mode`].

pub mod dump;
pub mod flags;
mod handle;
mod mode;

pub use dump::{dump, read_dump, write_dump};
pub use flags::{Flag, FlagDef, FlagGroup, Modes, VersionReq, FLAGS};
pub use handle::{Config, Protection, HMAC_KEY_SIZE, MAX_OATH_IMF};
pub use mode::{derive_mode, Mode};
