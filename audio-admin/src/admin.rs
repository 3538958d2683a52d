//! The admin engine proper: active-stream registry, the interaction
//! decision loop, and deduplicated publication to the collaborators.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use audio_policy::{PolicyDocument, PolicyRules};
use serial_dispatcher::Dispatcher;
use stream_types::{
    Behavior, BehaviorGain, CaptureActivity, CaptureUsage, RenderActivity, RenderUsage,
    StreamHandle, StreamUsage,
};

use crate::reporting::{
    ActiveStreamCountReporter, ActivityDispatcher, PolicyActionReporter, StreamVolumeSink,
};

struct AdminState {
    rules: PolicyRules,
    active_render: [HashSet<StreamHandle>; RenderUsage::COUNT],
    active_capture: [HashSet<StreamHandle>; CaptureUsage::COUNT],
    // Last values handed to each collaborator, used to suppress redundant
    // publications. Adjustments start at 0 dB.
    published_adjustments: [f32; StreamUsage::COUNT],
    published_behaviors: [Behavior; StreamUsage::COUNT],
    last_render_activity: RenderActivity,
    last_capture_activity: CaptureActivity,
    last_render_counts: [usize; RenderUsage::COUNT],
    last_capture_counts: [usize; CaptureUsage::COUNT],
}

impl AdminState {
    fn new() -> AdminState {
        AdminState {
            rules: PolicyRules::new(),
            active_render: std::array::from_fn(|_| HashSet::new()),
            active_capture: std::array::from_fn(|_| HashSet::new()),
            published_adjustments: [0.0; StreamUsage::COUNT],
            published_behaviors: [Behavior::None; StreamUsage::COUNT],
            last_render_activity: RenderActivity::empty(),
            last_capture_activity: CaptureActivity::empty(),
            last_render_counts: [0; RenderUsage::COUNT],
            last_capture_counts: [0; CaptureUsage::COUNT],
        }
    }

    fn active_count(&self, usage: StreamUsage) -> usize {
        match usage {
            StreamUsage::Render(u) => self.active_render[u.index()].len(),
            StreamUsage::Capture(u) => self.active_capture[u.index()].len(),
        }
    }
}

struct AdminInner {
    behavior_gain: BehaviorGain,
    state: Mutex<AdminState>,
    // Behaviors as last published, readable from any thread without posting.
    published: ArcSwap<[Behavior; StreamUsage::COUNT]>,
    volume: Arc<dyn StreamVolumeSink>,
    policy_actions: Arc<dyn PolicyActionReporter>,
    activity: Arc<dyn ActivityDispatcher>,
    counts: Arc<dyn ActiveStreamCountReporter>,
}

/// Decides how concurrently active stream usages interact.
///
/// Every operation posts onto the engine's dispatcher and returns
/// immediately; effects are observed in submission order. Cheap to clone.
#[derive(Clone)]
pub struct AudioAdmin {
    inner: Arc<AdminInner>,
    dispatcher: Dispatcher,
}

impl AudioAdmin {
    pub fn new(
        behavior_gain: BehaviorGain,
        dispatcher: Dispatcher,
        volume: Arc<dyn StreamVolumeSink>,
        policy_actions: Arc<dyn PolicyActionReporter>,
        activity: Arc<dyn ActivityDispatcher>,
        counts: Arc<dyn ActiveStreamCountReporter>,
    ) -> AudioAdmin {
        AudioAdmin {
            inner: Arc::new(AdminInner {
                behavior_gain,
                state: Mutex::new(AdminState::new()),
                published: ArcSwap::from_pointee([Behavior::None; StreamUsage::COUNT]),
                volume,
                policy_actions,
                activity,
                counts,
            }),
            dispatcher,
        }
    }

    /// Overwrite one interaction rule, then recompute.
    pub fn set_interaction(&self, active: StreamUsage, affected: StreamUsage, behavior: Behavior) {
        let inner = self.inner.clone();
        self.dispatcher.post(move || {
            let mut state = inner.state.lock();
            state.rules.set_rule(active, affected, behavior);
            inner.publish_adjustments(&mut state);
        });
    }

    /// Clear the whole matrix back to NONE, then recompute.
    pub fn reset_interactions(&self) {
        let inner = self.inner.clone();
        self.dispatcher.post(move || {
            let mut state = inner.state.lock();
            state.rules.reset_interactions();
            inner.publish_adjustments(&mut state);
        });
    }

    /// Replace the matrix with the rules of a validated policy document.
    /// Reset and replay happen inside one dispatcher task, so no
    /// intermediate matrix is ever observable.
    pub fn set_interactions_from_policy(&self, policy: PolicyDocument) {
        let inner = self.inner.clone();
        self.dispatcher.post(move || {
            let mut state = inner.state.lock();
            state.rules.reset_interactions();
            for rule in policy.rules() {
                state.rules.set_rule(rule.active, rule.affected, rule.behavior);
            }
            tracing::info!(rules = policy.rules().len(), "installed audio policy");
            inner.publish_adjustments(&mut state);
        });
    }

    /// Record that a renderer stream started or stopped flowing.
    pub fn update_renderer_state(&self, usage: RenderUsage, active: bool, handle: StreamHandle) {
        let inner = self.inner.clone();
        self.dispatcher
            .post(move || inner.apply_renderer_update(usage, active, handle));
    }

    /// Record that a capturer stream started or stopped flowing.
    pub fn update_capturer_state(&self, usage: CaptureUsage, active: bool, handle: StreamHandle) {
        let inner = self.inner.clone();
        self.dispatcher
            .post(move || inner.apply_capturer_update(usage, active, handle));
    }

    /// Current rule for a pair, as installed. Reads the live matrix.
    pub fn interaction(&self, active: StreamUsage, affected: StreamUsage) -> Behavior {
        self.inner.state.lock().rules.rule(active, affected)
    }

    /// Whether the engine's last published behavior for the usage is MUTE.
    /// Answered from the engine's own state, never from the collaborator.
    pub fn is_usage_muted(&self, usage: StreamUsage) -> bool {
        self.inner.published.load()[usage.index()] == Behavior::Mute
    }

    /// Whether the engine's last published behavior for the usage is DUCK.
    pub fn is_usage_ducked(&self, usage: StreamUsage) -> bool {
        self.inner.published.load()[usage.index()] == Behavior::Duck
    }
}

impl AdminInner {
    fn apply_renderer_update(&self, usage: RenderUsage, active: bool, handle: StreamHandle) {
        let mut state = self.state.lock();
        let set = &mut state.active_render[usage.index()];
        if active {
            set.insert(handle);
        } else {
            // Removing a handle that was never added is a no-op.
            set.remove(&handle);
        }
        tracing::debug!(%usage, active, handle = handle.raw(), "renderer state updated");

        self.publish_adjustments(&mut state);
        self.publish_activity(&mut state);
        self.publish_render_count(&mut state, usage);
    }

    fn apply_capturer_update(&self, usage: CaptureUsage, active: bool, handle: StreamHandle) {
        let mut state = self.state.lock();
        let set = &mut state.active_capture[usage.index()];
        if active {
            set.insert(handle);
        } else {
            set.remove(&handle);
        }
        tracing::debug!(%usage, active, handle = handle.raw(), "capturer state updated");

        self.publish_adjustments(&mut state);
        self.publish_activity(&mut state);
        self.publish_capture_count(&mut state, usage);
    }

    /// The decision loop. Severity is resolved in one pass: MUTE is computed
    /// over the unrestricted active set, then DUCK/NONE are recomputed with
    /// the muted sources removed, so a muted source keeps its own MUTE but
    /// stops imposing anything on other usages.
    fn compute_behaviors(state: &AdminState) -> [Behavior; StreamUsage::COUNT] {
        let is_active: [bool; StreamUsage::COUNT] =
            StreamUsage::ALL.map(|usage| state.active_count(usage) > 0);

        let mut first_pass = [Behavior::None; StreamUsage::COUNT];
        for affected in StreamUsage::ALL {
            let mut severity = Behavior::None;
            for (i, active) in StreamUsage::ALL.iter().enumerate() {
                if is_active[i] {
                    severity = severity.max(state.rules.rule(*active, affected));
                }
            }
            first_pass[affected.index()] = severity;
        }

        let muted_source: [bool; StreamUsage::COUNT] =
            std::array::from_fn(|i| is_active[i] && first_pass[i] == Behavior::Mute);

        let mut behaviors = [Behavior::None; StreamUsage::COUNT];
        for affected in StreamUsage::ALL {
            let mut severity = Behavior::None;
            for (i, active) in StreamUsage::ALL.iter().enumerate() {
                if is_active[i] && !muted_source[i] {
                    severity = severity.max(state.rules.rule(*active, affected));
                }
            }
            if muted_source[affected.index()] {
                severity = Behavior::Mute;
            }
            behaviors[affected.index()] = severity;
        }
        behaviors
    }

    /// Recompute all behaviors, then publish the gain adjustment and policy
    /// action for each usage whose adjustment actually changed.
    fn publish_adjustments(&self, state: &mut AdminState) {
        let behaviors = Self::compute_behaviors(state);
        for usage in StreamUsage::ALL {
            let i = usage.index();
            let behavior = behaviors[i];
            let adjustment = self.behavior_gain.gain_db(behavior);
            if adjustment != state.published_adjustments[i] {
                state.published_adjustments[i] = adjustment;
                state.published_behaviors[i] = behavior;
                self.volume.set_usage_gain_adjustment(usage, adjustment);
                self.policy_actions.report_policy_action(usage, behavior);
            }
        }
        self.published.store(Arc::new(state.published_behaviors));
    }

    fn publish_activity(&self, state: &mut AdminState) {
        let mut render = RenderActivity::empty();
        for usage in RenderUsage::ALL {
            if !state.active_render[usage.index()].is_empty() {
                render |= RenderActivity::from_usage(usage);
            }
        }
        if render != state.last_render_activity {
            state.last_render_activity = render;
            self.activity.on_render_activity_changed(render);
        }

        let mut capture = CaptureActivity::empty();
        for usage in CaptureUsage::ALL {
            if !state.active_capture[usage.index()].is_empty() {
                capture |= CaptureActivity::from_usage(usage);
            }
        }
        if capture != state.last_capture_activity {
            state.last_capture_activity = capture;
            self.activity.on_capture_activity_changed(capture);
        }
    }

    fn publish_render_count(&self, state: &mut AdminState, usage: RenderUsage) {
        let count = state.active_render[usage.index()].len();
        if count != state.last_render_counts[usage.index()] {
            state.last_render_counts[usage.index()] = count;
            self.counts.on_active_render_count_changed(usage, count);
        }
    }

    fn publish_capture_count(&self, state: &mut AdminState, usage: CaptureUsage) {
        let count = state.active_capture[usage.index()].len();
        if count != state.last_capture_counts[usage.index()] {
            state.last_capture_counts[usage.index()] = count;
            self.counts.on_active_capture_count_changed(usage, count);
        }
    }
}
