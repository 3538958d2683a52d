//! Book-keeping side of the stream-volume collaborator: nominal per-usage
//! gains plus the engine's current adjustments, with a snapshot type for
//! query and test paths.

use parking_lot::Mutex;
use stream_types::StreamUsage;

use crate::reporting::StreamVolumeSink;

#[derive(Clone, Copy)]
struct VolumeState {
    gains: [f32; StreamUsage::COUNT],
    adjustments: [f32; StreamUsage::COUNT],
}

/// Holds the authoritative per-usage gain state. The engine writes
/// adjustments through [`StreamVolumeSink`]; everything else reads
/// snapshots via [`StreamVolumeManager::gain_settings`].
pub struct StreamVolumeManager {
    state: Mutex<VolumeState>,
}

impl StreamVolumeManager {
    pub fn new() -> StreamVolumeManager {
        StreamVolumeManager {
            state: Mutex::new(VolumeState {
                gains: [0.0; StreamUsage::COUNT],
                adjustments: [0.0; StreamUsage::COUNT],
            }),
        }
    }

    /// Set the usage's own configured gain, independent of policy.
    pub fn set_usage_gain(&self, usage: StreamUsage, gain_db: f32) {
        self.state.lock().gains[usage.index()] = gain_db;
    }

    pub fn gain_settings(&self) -> UsageGainSettings {
        let state = *self.state.lock();
        UsageGainSettings {
            gains: state.gains,
            adjustments: state.adjustments,
        }
    }
}

impl Default for StreamVolumeManager {
    fn default() -> Self {
        StreamVolumeManager::new()
    }
}

impl StreamVolumeSink for StreamVolumeManager {
    fn set_usage_gain_adjustment(&self, usage: StreamUsage, gain_db: f32) {
        self.state.lock().adjustments[usage.index()] = gain_db;
    }
}

/// Point-in-time copy of the volume manager's state.
#[derive(Debug, Clone, Copy)]
pub struct UsageGainSettings {
    gains: [f32; StreamUsage::COUNT],
    adjustments: [f32; StreamUsage::COUNT],
}

impl UsageGainSettings {
    pub fn usage_gain(&self, usage: StreamUsage) -> f32 {
        self.gains[usage.index()]
    }

    pub fn usage_gain_adjustment(&self, usage: StreamUsage) -> f32 {
        self.adjustments[usage.index()]
    }

    /// Nominal gain plus the engine's adjustment.
    pub fn adjusted_usage_gain(&self, usage: StreamUsage) -> f32 {
        self.gains[usage.index()] + self.adjustments[usage.index()]
    }
}
