//! The audio admin engine: tracks which stream usages are active, applies
//! the declarative interaction policy, and fans the results out to the
//! stream-volume, policy-action, activity, and stream-count collaborators.

pub mod admin;
pub mod reporting;
pub mod volume;

pub use admin::AudioAdmin;
pub use reporting::{
    ActiveStreamCountReporter, ActivityDispatcher, PolicyActionReporter, StreamVolumeSink,
};
pub use volume::{StreamVolumeManager, UsageGainSettings};
