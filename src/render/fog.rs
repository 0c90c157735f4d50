use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::rendering::{RenderFlags, RgbColor};

/// Internal units per world unit.
pub const WORLD_ONE: f32 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FogType {
    AboveLiquid,
    BelowLiquid,
}

impl FogType {
    pub const COUNT: usize = 2;
    pub const ALL: [FogType; Self::COUNT] = [FogType::AboveLiquid, FogType::BelowLiquid];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogData {
    pub color: RgbColor,
    /// In world units
    pub depth: f32,
    pub is_present: bool,
    pub affects_landscapes: bool,
}

impl Default for FogData {
    fn default() -> Self {
        Self {
            color: RgbColor::new(0x8000, 0x8000, 0x8000),
            depth: 8.0,
            is_present: false,
            affects_landscapes: false,
        }
    }
}

impl FogData {
    /// Fog is only drawn when the level supplies it and the player has not
    /// switched it off.
    pub fn is_drawn(&self, flags: RenderFlags) -> bool {
        self.is_present && flags.contains(RenderFlags::FOG)
    }

    pub fn depth_internal(&self) -> f32 {
        self.depth * WORLD_ONE
    }
}

#[derive(Debug, Default)]
pub struct FogTable {
    records: [RwLock<FogData>; FogType::COUNT],
}

impl FogTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: FogType) -> &RwLock<FogData> {
        &self.records[kind.index()]
    }

    pub fn get_index(&self, index: usize) -> Option<&RwLock<FogData>> {
        self.records.get(index)
    }

    pub fn set(&self, kind: FogType, data: FogData) {
        *self.records[kind.index()].write() = data;
    }

    pub fn snapshot(&self) -> [FogData; FogType::COUNT] {
        [*self.records[0].read(), *self.records[1].read()]
    }

    pub fn reset(&self) {
        for record in &self.records {
            *record.write() = FogData::default();
        }
    }
}

static FOG_TABLE: Lazy<FogTable> = Lazy::new(FogTable::new);

pub fn fog_table() -> &'static FogTable {
    &FOG_TABLE
}

/// Stable for the life of the process.
pub fn fog_data(kind: FogType) -> &'static RwLock<FogData> {
    FOG_TABLE.get(kind)
}

pub fn fog_data_at(index: usize) -> Option<&'static RwLock<FogData>> {
    FOG_TABLE.get_index(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_records() {
        let table = FogTable::new();
        for record in table.snapshot() {
            assert_eq!(record, FogData::default());
            assert!(!record.is_present);
            assert_eq!(record.depth_internal(), 8.0 * 1024.0);
        }
    }

    #[test]
    fn test_drawn_needs_flag_and_presence() {
        let mut fog = FogData::default();
        assert!(!fog.is_drawn(RenderFlags::FOG));
        fog.is_present = true;
        assert!(fog.is_drawn(RenderFlags::FOG | RenderFlags::ZBUFFER));
        assert!(!fog.is_drawn(RenderFlags::ZBUFFER));
    }

    #[test]
    fn test_table_set_and_reset() {
        let table = FogTable::new();
        let below = FogData {
            color: RgbColor::new(0, 0, 0xffff),
            depth: 2.5,
            is_present: true,
            affects_landscapes: true,
        };
        table.set(FogType::BelowLiquid, below);
        assert_eq!(*table.get(FogType::BelowLiquid).read(), below);
        assert_eq!(*table.get(FogType::AboveLiquid).read(), FogData::default());
        assert!(table.get_index(FogType::COUNT).is_none());

        table.reset();
        assert_eq!(*table.get(FogType::BelowLiquid).read(), FogData::default());
    }

    #[test]
    fn test_global_accessor_is_stable() {
        for kind in FogType::ALL {
            let a = fog_data(kind);
            let b = fog_data(kind);
            assert!(std::ptr::eq(a, b));
            assert!(std::ptr::eq(a, fog_data_at(kind.index()).unwrap()));
        }
        assert!(!std::ptr::eq(fog_data(FogType::AboveLiquid), fog_data(FogType::BelowLiquid)));
        assert!(fog_data_at(2).is_none());
    }
}
