#![allow(dead_code)]

//! Shared fixtures for the end-to-end scenarios: recording collaborators
//! and an engine wired to a deterministic dispatcher.

use parking_lot::Mutex;
use std::sync::Arc;

use audio_admin::{
    ActiveStreamCountReporter, ActivityDispatcher, AudioAdmin, PolicyActionReporter,
    StreamVolumeManager, StreamVolumeSink,
};
use serial_dispatcher::Dispatcher;
use stream_types::{
    Behavior, BehaviorGain, CaptureActivity, CaptureUsage, RenderActivity, RenderUsage,
    StreamUsage,
};

/// Distinct, non-default gains so every behavior transition is observable.
pub const TEST_GAIN: BehaviorGain = BehaviorGain {
    none_gain_db: -1.0,
    duck_gain_db: -2.0,
    mute_gain_db: -3.0,
};

/// Nominal stream gain used wherever adjusted gains are asserted.
pub const STREAM_GAIN: f32 = 1.0;

/// Records every adjustment write, forwarding to the real volume manager.
pub struct RecordingVolume {
    pub manager: Arc<StreamVolumeManager>,
    pub writes: Mutex<Vec<(StreamUsage, f32)>>,
}

impl StreamVolumeSink for RecordingVolume {
    fn set_usage_gain_adjustment(&self, usage: StreamUsage, gain_db: f32) {
        self.writes.lock().push((usage, gain_db));
        self.manager.set_usage_gain_adjustment(usage, gain_db);
    }
}

#[derive(Default)]
pub struct RecordingActions {
    pub actions: Mutex<Vec<(StreamUsage, Behavior)>>,
}

impl PolicyActionReporter for RecordingActions {
    fn report_policy_action(&self, usage: StreamUsage, behavior: Behavior) {
        self.actions.lock().push((usage, behavior));
    }
}

#[derive(Default)]
pub struct RecordingActivity {
    pub render: Mutex<Vec<RenderActivity>>,
    pub capture: Mutex<Vec<CaptureActivity>>,
}

impl RecordingActivity {
    pub fn last_render(&self) -> RenderActivity {
        self.render.lock().last().copied().unwrap_or_default()
    }

    pub fn last_capture(&self) -> CaptureActivity {
        self.capture.lock().last().copied().unwrap_or_default()
    }
}

impl ActivityDispatcher for RecordingActivity {
    fn on_render_activity_changed(&self, activity: RenderActivity) {
        self.render.lock().push(activity);
    }
    fn on_capture_activity_changed(&self, activity: CaptureActivity) {
        self.capture.lock().push(activity);
    }
}

#[derive(Default)]
pub struct RecordingCounts {
    pub render: Mutex<Vec<(RenderUsage, usize)>>,
    pub capture: Mutex<Vec<(CaptureUsage, usize)>>,
}

impl ActiveStreamCountReporter for RecordingCounts {
    fn on_active_render_count_changed(&self, usage: RenderUsage, count: usize) {
        self.render.lock().push((usage, count));
    }
    fn on_active_capture_count_changed(&self, usage: CaptureUsage, count: usize) {
        self.capture.lock().push((usage, count));
    }
}

pub struct Fixture {
    pub dispatcher: Dispatcher,
    pub admin: AudioAdmin,
    pub manager: Arc<StreamVolumeManager>,
    pub volume: Arc<RecordingVolume>,
    pub actions: Arc<RecordingActions>,
    pub activity: Arc<RecordingActivity>,
    pub counts: Arc<RecordingCounts>,
}

impl Fixture {
    pub fn new() -> Fixture {
        let dispatcher = Dispatcher::new();
        let manager = Arc::new(StreamVolumeManager::new());
        let volume = Arc::new(RecordingVolume {
            manager: manager.clone(),
            writes: Mutex::new(Vec::new()),
        });
        let actions = Arc::new(RecordingActions::default());
        let activity = Arc::new(RecordingActivity::default());
        let counts = Arc::new(RecordingCounts::default());
        let admin = AudioAdmin::new(
            TEST_GAIN,
            dispatcher.clone(),
            volume.clone(),
            actions.clone(),
            activity.clone(),
            counts.clone(),
        );
        Fixture {
            dispatcher,
            admin,
            manager,
            volume,
            actions,
            activity,
            counts,
        }
    }

    /// Set the nominal gain of every usage to [`STREAM_GAIN`].
    pub fn with_stream_gains(self) -> Fixture {
        for usage in StreamUsage::ALL {
            self.manager.set_usage_gain(usage, STREAM_GAIN);
        }
        self
    }

    pub fn adjusted_gain(&self, usage: StreamUsage) -> f32 {
        self.manager.gain_settings().adjusted_usage_gain(usage)
    }

    pub fn volume_writes_for(&self, usage: StreamUsage) -> usize {
        self.volume
            .writes
            .lock()
            .iter()
            .filter(|(u, _)| *u == usage)
            .count()
    }
}
