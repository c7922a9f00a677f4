//! Scripted device for protocol tests

use alloc::vec::Vec;

use crate::device::{HidDevice, Report};
use crate::error::Result;

/// Replays a list of reports; the last one repeats once the list runs out
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    script: Vec<Report>,
    after_writes: Option<(usize, Report)>,
    pub reads: usize,
    pub writes: Vec<Report>,
    pub delays: Vec<u32>,
    pub slept_ms: u32,
}

impl ScriptedDevice {
    pub fn with_reads(reads: &[Report]) -> Self {
        Self {
            script: reads.to_vec(),
            ..Default::default()
        }
    }

    /// Answer every read with `report` once `n` reports have been written
    pub fn after_writes(mut self, n: usize, report: Report) -> Self {
        self.after_writes = Some((n, report));
        self
    }
}

impl HidDevice for ScriptedDevice {
    fn get_feature_report(&mut self, report: &mut Report) -> Result<()> {
        let idx = self.reads.min(self.script.len().saturating_sub(1));
        *report = match self.after_writes {
            Some((n, r)) if self.writes.len() >= n => r,
            _ => self.script.get(idx).copied().unwrap_or_default(),
        };
        self.reads += 1;
        Ok(())
    }

    fn set_feature_report(&mut self, report: &Report) -> Result<()> {
        self.writes.push(*report);
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.slept_ms += ms;
    }
}
