//! CLI command implementations
//!
//! Every command takes an opened [`Device`](crate::devices::Device) and
//! starts by reading the device status, so unsupported firmware is refused
//! before anything is written.

mod chal;
mod list;
mod serial;
mod status;
mod write;

pub use chal::cmd_chal_resp;
pub use list::list_devices;
pub use serial::cmd_serial;
pub use status::cmd_status;
pub use write::{cmd_export, cmd_write, cmd_zap, WriteArgs};
