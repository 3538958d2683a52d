//! Drives the whole policy stack from the command line: installs a small
//! interaction policy, walks a phone-call-over-music scenario, and prints
//! every publication the engine makes.

use std::sync::Arc;
use std::time::Duration;

use audio_admin::{
    ActiveStreamCountReporter, ActivityDispatcher, AudioAdmin, PolicyActionReporter,
    StreamVolumeManager,
};
use audio_policy::PolicyDocument;
use serial_dispatcher::Dispatcher;
use stream_types::{
    Behavior, BehaviorGain, CaptureActivity, CaptureUsage, RenderActivity, RenderUsage,
    StreamHandle, StreamUsage,
};

const DEMO_POLICY: &str = r#"{
    "audio_policy_rules": [
        { "active":   { "render_usage": "COMMUNICATION" },
          "affected": { "render_usage": "MEDIA" },
          "behavior": "DUCK" },
        { "active":   { "capture_usage": "COMMUNICATION" },
          "affected": { "render_usage": "BACKGROUND" },
          "behavior": "MUTE" }
    ]
}"#;

struct ConsoleActions;
impl PolicyActionReporter for ConsoleActions {
    fn report_policy_action(&self, usage: StreamUsage, behavior: Behavior) {
        println!("  policy action: {usage} -> {behavior}");
    }
}

struct ConsoleActivity;
impl ActivityDispatcher for ConsoleActivity {
    fn on_render_activity_changed(&self, activity: RenderActivity) {
        println!("  render activity: {activity:?}");
    }
    fn on_capture_activity_changed(&self, activity: CaptureActivity) {
        println!("  capture activity: {activity:?}");
    }
}

struct ConsoleCounts;
impl ActiveStreamCountReporter for ConsoleCounts {
    fn on_active_render_count_changed(&self, usage: RenderUsage, count: usize) {
        println!("  active render streams: {usage} = {count}");
    }
    fn on_active_capture_count_changed(&self, usage: CaptureUsage, count: usize) {
        println!("  active capture streams: {usage} = {count}");
    }
}

fn main() {
    let dispatcher = Dispatcher::new();
    let volume = Arc::new(StreamVolumeManager::new());
    let admin = AudioAdmin::new(
        BehaviorGain::default(),
        dispatcher.clone(),
        volume.clone(),
        Arc::new(ConsoleActions),
        Arc::new(ConsoleActivity),
        Arc::new(ConsoleCounts),
    );
    let loop_thread = dispatcher.spawn();

    let policy = PolicyDocument::parse(DEMO_POLICY).expect("demo policy parses");
    println!("installing {} policy rules", policy.rules().len());
    admin.set_interactions_from_policy(policy);

    let media = StreamHandle::new(1);
    let call = StreamHandle::new(2);
    let mic = StreamHandle::new(3);

    println!("\nmusic starts");
    admin.update_renderer_state(RenderUsage::Media, true, media);
    pause();

    println!("\nincoming call answered (render + capture)");
    admin.update_renderer_state(RenderUsage::Communication, true, call);
    admin.update_capturer_state(CaptureUsage::Communication, true, mic);
    pause();
    report_gain(&volume, StreamUsage::Render(RenderUsage::Media));

    println!("\ncall ends");
    admin.update_renderer_state(RenderUsage::Communication, false, call);
    admin.update_capturer_state(CaptureUsage::Communication, false, mic);
    pause();
    report_gain(&volume, StreamUsage::Render(RenderUsage::Media));

    println!("\nmusic stops");
    admin.update_renderer_state(RenderUsage::Media, false, media);
    pause();

    loop_thread.shutdown();
}

fn report_gain(volume: &StreamVolumeManager, usage: StreamUsage) {
    let settings = volume.gain_settings();
    println!(
        "  {usage}: adjustment {:+.1} dB",
        settings.usage_gain_adjustment(usage)
    );
}

// Give the dispatcher thread time to drain before the next step prints.
fn pause() {
    std::thread::sleep(Duration::from_millis(50));
}
