// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared sun-state types. The actual sunrise/sunset computation lives in
//! `autod-engine::sun`; this crate only carries the resulting state so that
//! the constraint evaluator and scheduler (both downstream of `autod-core`,
//! neither of the other) can agree on its shape.

use serde::{Deserialize, Serialize};

/// Which sun transition a sun-relative schedule entry tracks (spec §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SunEvent {
    NextRising,
    NextSetting,
}

crate::simple_display! {
    SunEvent {
        NextRising => "next_rising",
        NextSetting => "next_setting",
    }
}

/// `{ next_rising, next_setting }`, recomputed each tick (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunState {
    pub next_rising: i64,
    pub next_setting: i64,
}

impl SunState {
    pub fn get(&self, event: SunEvent) -> i64 {
        match event {
            SunEvent::NextRising => self.next_rising,
            SunEvent::NextSetting => self.next_setting,
        }
    }
}
