// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain `HH:MM:SS` parsing, shared by the constraint evaluator's
//! `constrain_start_time`/`constrain_end_time` and the kernel API's
//! `parse_time` (spec §4.5, §6).

use crate::error::KernelError;

/// Seconds since local midnight.
pub fn parse_clock_str(s: &str) -> Result<u32, KernelError> {
    let parts: Vec<&str> = s.splitn(3, ':').collect();
    if parts.len() != 3 {
        return Err(KernelError::InvalidTimeString(s.to_string()));
    }
    let h: u32 = parts[0].parse().map_err(|_| KernelError::InvalidTimeString(s.to_string()))?;
    let m: u32 = parts[1].parse().map_err(|_| KernelError::InvalidTimeString(s.to_string()))?;
    let sec: u32 = parts[2].parse().map_err(|_| KernelError::InvalidTimeString(s.to_string()))?;
    if h > 23 || m > 59 || sec > 59 {
        return Err(KernelError::InvalidTimeString(s.to_string()));
    }
    Ok(h * 3600 + m * 60 + sec)
}

/// Format seconds-since-midnight back into `HH:MM:SS`.
pub fn format_clock_secs(secs: u32) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
