//! Idle-output power policy: disables output-device channels that have no
//! render streams flowing to them, and re-enables them before samples
//! arrive. Audible and ultrasonic channel sets are tracked independently.
//!
//! Consumes the admin engine's active-render-count transitions and the
//! routing graph's device membership; countdowns are delayed dispatcher
//! tasks guarded by per-(device, scope) generation counters, so any
//! re-enable silently cancels a pending disable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use audio_admin::ActiveStreamCountReporter;
use serial_dispatcher::Dispatcher;
use stream_types::{CaptureUsage, RenderUsage};

/// Master switch for powering down idle output channels.
pub const DISABLE_ON_IDLE: bool = true;
/// Whether a device starts an idle countdown the moment it is routed.
pub const SET_INITIAL_IDLE_COUNTDOWN_WHEN_CONFIGURED: bool = true;
/// When several routed devices are ultrasound-capable, enable only the first.
pub const ONLY_ENABLE_FIRST_ULTRASONIC_CHANNEL: bool = true;
/// Idle period after the last stream stops before channels are disabled.
pub const IDLE_COUNTDOWN_AFTER_LAST_STREAM: Duration = Duration::from_secs(5);
/// Idle period granted to a freshly routed device before first use.
pub const INITIAL_IDLE_COUNTDOWN_FOR_NEW_DEVICE: Duration = Duration::from_secs(120);

/// Which channel set of a device a transition concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    Audible,
    Ultrasonic,
}

fn scope_of(usage: RenderUsage) -> ChannelScope {
    if usage == RenderUsage::Ultrasound {
        ChannelScope::Ultrasonic
    } else {
        ChannelScope::Audible
    }
}

/// Power control surface of one output device. Identity is `Arc` pointer
/// identity; the policy never inspects the device beyond these calls.
pub trait OutputDevice: Send + Sync {
    fn name(&self) -> &str;
    fn set_audible_enabled(&self, enabled: bool);
    fn set_ultrasonic_enabled(&self, enabled: bool);
}

/// Routing lookup implemented by the routing graph.
pub trait RenderRouter: Send + Sync {
    fn targets_for_render_usage(&self, usage: RenderUsage) -> Vec<Arc<dyn OutputDevice>>;
}

fn device_key(device: &Arc<dyn OutputDevice>) -> usize {
    Arc::as_ptr(device) as *const () as usize
}

fn set_scope_enabled(device: &dyn OutputDevice, scope: ChannelScope, enabled: bool) {
    match scope {
        ChannelScope::Audible => device.set_audible_enabled(enabled),
        ChannelScope::Ultrasonic => device.set_ultrasonic_enabled(enabled),
    }
}

struct ScopeState {
    // Devices join the routing graph powered; the initial countdown, not an
    // explicit enable, is what follows configuration.
    enabled: bool,
    generation: u64,
}

struct DeviceEntry {
    device: Arc<dyn OutputDevice>,
    audible: ScopeState,
    ultrasonic: ScopeState,
}

impl DeviceEntry {
    fn scope_mut(&mut self, scope: ChannelScope) -> &mut ScopeState {
        match scope {
            ChannelScope::Audible => &mut self.audible,
            ChannelScope::Ultrasonic => &mut self.ultrasonic,
        }
    }
}

struct IdleState {
    active_render_usages: [bool; RenderUsage::COUNT],
    devices: HashMap<usize, DeviceEntry>,
}

struct IdleInner {
    dispatcher: Dispatcher,
    router: Arc<dyn RenderRouter>,
    state: Mutex<IdleState>,
}

/// The idle-output subsystem. Registered with the admin engine as its
/// active-stream-count reporter; capture transitions are ignored.
#[derive(Clone)]
pub struct IdlePolicy {
    inner: Arc<IdleInner>,
}

impl IdlePolicy {
    pub fn new(dispatcher: Dispatcher, router: Arc<dyn RenderRouter>) -> IdlePolicy {
        IdlePolicy {
            inner: Arc::new(IdleInner {
                dispatcher,
                router,
                state: Mutex::new(IdleState {
                    active_render_usages: [false; RenderUsage::COUNT],
                    devices: HashMap::new(),
                }),
            }),
        }
    }

    /// A device joined the routing graph. If its scopes are already routed
    /// by active usages they stay powered; otherwise the initial idle
    /// countdown begins.
    pub fn add_device_to_routes(&self, device: &Arc<dyn OutputDevice>) {
        let key = device_key(device);
        let mut state = self.inner.state.lock();
        state.devices.insert(
            key,
            DeviceEntry {
                device: device.clone(),
                audible: ScopeState {
                    enabled: true,
                    generation: 0,
                },
                ultrasonic: ScopeState {
                    enabled: true,
                    generation: 0,
                },
            },
        );
        tracing::info!(device = device.name(), "device added to routes");

        for scope in [ChannelScope::Audible, ChannelScope::Ultrasonic] {
            if self.inner.active_device_keys(&state, scope).contains(&key) {
                self.inner.enable(&mut state, key, scope);
            } else if SET_INITIAL_IDLE_COUNTDOWN_WHEN_CONFIGURED {
                IdleInner::start_idle_countdown(
                    &self.inner,
                    &mut state,
                    key,
                    scope,
                    INITIAL_IDLE_COUNTDOWN_FOR_NEW_DEVICE,
                );
            }
        }
    }

    /// A device left the routing graph; pending countdowns become no-ops.
    pub fn remove_device_from_routes(&self, device: &Arc<dyn OutputDevice>) {
        let key = device_key(device);
        let mut state = self.inner.state.lock();
        if state.devices.remove(&key).is_some() {
            tracing::info!(device = device.name(), "device removed from routes");
        }
    }

    fn handle_render_count(&self, usage: RenderUsage, count: usize) {
        let scope = scope_of(usage);
        let mut state = self.inner.state.lock();

        let before = self.inner.active_device_keys(&state, scope);
        state.active_render_usages[usage.index()] = count > 0;
        let after = self.inner.active_device_keys(&state, scope);

        // Devices whose routed activity just dropped to zero idle out after
        // the countdown; newly routed-active devices power up immediately,
        // before the admin engine's publication sequence delivers samples.
        for key in &before {
            if !after.contains(key) {
                IdleInner::start_idle_countdown(
                    &self.inner,
                    &mut state,
                    *key,
                    scope,
                    IDLE_COUNTDOWN_AFTER_LAST_STREAM,
                );
            }
        }
        for key in &after {
            if !before.contains(key) {
                self.inner.enable(&mut state, *key, scope);
            }
        }
    }
}

impl ActiveStreamCountReporter for IdlePolicy {
    fn on_active_render_count_changed(&self, usage: RenderUsage, count: usize) {
        self.handle_render_count(usage, count);
    }

    fn on_active_capture_count_changed(&self, _usage: CaptureUsage, _count: usize) {
        // Capture streams do not drive output power.
    }
}

impl IdleInner {
    /// Registered devices currently routed by an active usage of `scope`,
    /// in routing order.
    fn active_device_keys(&self, state: &IdleState, scope: ChannelScope) -> Vec<usize> {
        let mut keys = Vec::new();
        for usage in RenderUsage::ALL {
            if scope_of(usage) != scope || !state.active_render_usages[usage.index()] {
                continue;
            }
            for device in self.router.targets_for_render_usage(usage) {
                let key = device_key(&device);
                if state.devices.contains_key(&key) && !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        if scope == ChannelScope::Ultrasonic && ONLY_ENABLE_FIRST_ULTRASONIC_CHANNEL {
            keys.truncate(1);
        }
        keys
    }

    fn enable(&self, state: &mut IdleState, key: usize, scope: ChannelScope) {
        let Some(entry) = state.devices.get_mut(&key) else {
            return;
        };
        let scope_state = entry.scope_mut(scope);
        // Bumping the generation cancels any pending disable.
        scope_state.generation += 1;
        if !scope_state.enabled {
            scope_state.enabled = true;
            set_scope_enabled(entry.device.as_ref(), scope, true);
            tracing::info!(device = entry.device.name(), ?scope, "enabled output channels");
        }
    }

    fn start_idle_countdown(
        this: &Arc<IdleInner>,
        state: &mut IdleState,
        key: usize,
        scope: ChannelScope,
        delay: Duration,
    ) {
        if !DISABLE_ON_IDLE {
            return;
        }
        let Some(entry) = state.devices.get_mut(&key) else {
            return;
        };
        let scope_state = entry.scope_mut(scope);
        scope_state.generation += 1;
        let generation = scope_state.generation;
        tracing::debug!(
            device = entry.device.name(),
            ?scope,
            ?delay,
            "idle countdown started"
        );

        let inner = this.clone();
        this.dispatcher
            .post_delayed(delay, move || inner.finish_idle_countdown(key, scope, generation));
    }

    fn finish_idle_countdown(&self, key: usize, scope: ChannelScope, generation: u64) {
        let mut state = self.state.lock();
        let Some(entry) = state.devices.get_mut(&key) else {
            return;
        };
        let scope_state = entry.scope_mut(scope);
        if scope_state.generation != generation {
            // Re-enabled or rescheduled since; this countdown is stale.
            return;
        }
        if scope_state.enabled {
            scope_state.enabled = false;
            set_scope_enabled(entry.device.as_ref(), scope, false);
            tracing::info!(
                device = entry.device.name(),
                ?scope,
                "disabled idle output channels"
            );
        }
    }
}
