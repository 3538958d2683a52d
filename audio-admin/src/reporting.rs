//! Collaborator contracts the admin engine publishes to. Each is a narrow
//! capability set implemented by an external subsystem; all calls are
//! one-way and must not re-enter the engine synchronously (callbacks that
//! need the engine post to its dispatcher instead).

use stream_types::{
    Behavior, CaptureActivity, CaptureUsage, RenderActivity, RenderUsage, StreamUsage,
};

/// Receives absolute per-usage gain adjustments, in dB on top of the
/// usage's own configured gain.
pub trait StreamVolumeSink: Send + Sync {
    fn set_usage_gain_adjustment(&self, usage: StreamUsage, gain_db: f32);
}

/// Told which behavior the engine decided to apply to a usage.
pub trait PolicyActionReporter: Send + Sync {
    fn report_policy_action(&self, usage: StreamUsage, behavior: Behavior);
}

/// Receives the externally visible activity bitmaps whenever the set of
/// usages with at least one active stream changes.
pub trait ActivityDispatcher: Send + Sync {
    fn on_render_activity_changed(&self, activity: RenderActivity);
    fn on_capture_activity_changed(&self, activity: CaptureActivity);
}

/// Receives per-usage active stream counts on every transition, internal
/// usages included.
pub trait ActiveStreamCountReporter: Send + Sync {
    fn on_active_render_count_changed(&self, usage: RenderUsage, count: usize);
    fn on_active_capture_count_changed(&self, usage: CaptureUsage, count: usize);
}
