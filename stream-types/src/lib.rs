//! Core stream-usage vocabulary shared by the audio policy engine crates.
//! - Render and capture usages, including the internal-only variants.
//! - The `StreamUsage` sum type with a flat index over the combined space.
//! - Behavior severity ordering and the gain table attached to it.
//! - Activity masks covering only the externally visible usages.

use bitflags::bitflags;
use std::fmt;

/// Purpose category of an output (render) stream.
///
/// `Ultrasound` is internal-only: it participates in policy decisions and
/// stream counting but never appears in externally published activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderUsage {
    Background,
    Media,
    Interruption,
    SystemAgent,
    Communication,
    Ultrasound,
}

impl RenderUsage {
    pub const COUNT: usize = 6;
    /// Usages visible to external observers; a prefix of `ALL`.
    pub const EXTERNAL_COUNT: usize = 5;
    pub const ALL: [RenderUsage; Self::COUNT] = [
        RenderUsage::Background,
        RenderUsage::Media,
        RenderUsage::Interruption,
        RenderUsage::SystemAgent,
        RenderUsage::Communication,
        RenderUsage::Ultrasound,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<RenderUsage> {
        Self::ALL.get(index).copied()
    }

    pub const fn is_external(self) -> bool {
        self.index() < Self::EXTERNAL_COUNT
    }

    pub const fn name(self) -> &'static str {
        match self {
            RenderUsage::Background => "BACKGROUND",
            RenderUsage::Media => "MEDIA",
            RenderUsage::Interruption => "INTERRUPTION",
            RenderUsage::SystemAgent => "SYSTEM_AGENT",
            RenderUsage::Communication => "COMMUNICATION",
            RenderUsage::Ultrasound => "ULTRASOUND",
        }
    }
}

impl fmt::Display for RenderUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Purpose category of an input (capture) stream.
///
/// `Loopback` and `Ultrasound` are internal-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureUsage {
    Background,
    Foreground,
    SystemAgent,
    Communication,
    Loopback,
    Ultrasound,
}

impl CaptureUsage {
    pub const COUNT: usize = 6;
    pub const EXTERNAL_COUNT: usize = 4;
    pub const ALL: [CaptureUsage; Self::COUNT] = [
        CaptureUsage::Background,
        CaptureUsage::Foreground,
        CaptureUsage::SystemAgent,
        CaptureUsage::Communication,
        CaptureUsage::Loopback,
        CaptureUsage::Ultrasound,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<CaptureUsage> {
        Self::ALL.get(index).copied()
    }

    pub const fn is_external(self) -> bool {
        self.index() < Self::EXTERNAL_COUNT
    }

    pub const fn name(self) -> &'static str {
        match self {
            CaptureUsage::Background => "BACKGROUND",
            CaptureUsage::Foreground => "FOREGROUND",
            CaptureUsage::SystemAgent => "SYSTEM_AGENT",
            CaptureUsage::Communication => "COMMUNICATION",
            CaptureUsage::Loopback => "LOOPBACK",
            CaptureUsage::Ultrasound => "ULTRASOUND",
        }
    }
}

impl fmt::Display for CaptureUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A render or capture usage. Equality and hashing are structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamUsage {
    Render(RenderUsage),
    Capture(CaptureUsage),
}

impl StreamUsage {
    pub const COUNT: usize = RenderUsage::COUNT + CaptureUsage::COUNT;
    /// The full usage space, render block first then capture block. `index`
    /// follows the same layout, so this array is indexable by it.
    pub const ALL: [StreamUsage; Self::COUNT] = [
        StreamUsage::Render(RenderUsage::Background),
        StreamUsage::Render(RenderUsage::Media),
        StreamUsage::Render(RenderUsage::Interruption),
        StreamUsage::Render(RenderUsage::SystemAgent),
        StreamUsage::Render(RenderUsage::Communication),
        StreamUsage::Render(RenderUsage::Ultrasound),
        StreamUsage::Capture(CaptureUsage::Background),
        StreamUsage::Capture(CaptureUsage::Foreground),
        StreamUsage::Capture(CaptureUsage::SystemAgent),
        StreamUsage::Capture(CaptureUsage::Communication),
        StreamUsage::Capture(CaptureUsage::Loopback),
        StreamUsage::Capture(CaptureUsage::Ultrasound),
    ];

    /// Flat index into the combined usage space.
    pub const fn index(self) -> usize {
        match self {
            StreamUsage::Render(u) => u.index(),
            StreamUsage::Capture(u) => RenderUsage::COUNT + u.index(),
        }
    }

    pub const fn is_render(self) -> bool {
        matches!(self, StreamUsage::Render(_))
    }

    pub const fn is_capture(self) -> bool {
        matches!(self, StreamUsage::Capture(_))
    }

    pub const fn is_external(self) -> bool {
        match self {
            StreamUsage::Render(u) => u.is_external(),
            StreamUsage::Capture(u) => u.is_external(),
        }
    }
}

impl From<RenderUsage> for StreamUsage {
    fn from(usage: RenderUsage) -> Self {
        StreamUsage::Render(usage)
    }
}

impl From<CaptureUsage> for StreamUsage {
    fn from(usage: CaptureUsage) -> Self {
        StreamUsage::Capture(usage)
    }
}

impl fmt::Display for StreamUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamUsage::Render(u) => write!(f, "RenderUsage::{u}"),
            StreamUsage::Capture(u) => write!(f, "CaptureUsage::{u}"),
        }
    }
}

/// Action imposed on an affected usage by an active one. The derived order
/// is the severity order used when several active usages impose different
/// behaviors on the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Behavior {
    None,
    Duck,
    Mute,
}

impl Behavior {
    pub const fn name(self) -> &'static str {
        match self {
            Behavior::None => "NONE",
            Behavior::Duck => "DUCK",
            Behavior::Mute => "MUTE",
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// dB adjustment applied on top of a usage's own gain for each behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorGain {
    pub none_gain_db: f32,
    pub duck_gain_db: f32,
    pub mute_gain_db: f32,
}

impl BehaviorGain {
    pub const fn gain_db(&self, behavior: Behavior) -> f32 {
        match behavior {
            Behavior::None => self.none_gain_db,
            Behavior::Duck => self.duck_gain_db,
            Behavior::Mute => self.mute_gain_db,
        }
    }
}

impl Default for BehaviorGain {
    fn default() -> Self {
        BehaviorGain {
            none_gain_db: 0.0,
            duck_gain_db: -35.0,
            mute_gain_db: -160.0,
        }
    }
}

/// Opaque identity of a renderer or capturer stream. The engine never
/// dereferences it; it only tracks set membership per usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u64);

impl StreamHandle {
    pub const fn new(id: u64) -> Self {
        StreamHandle(id)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// One bit per externally visible render usage, set while the usage has
    /// at least one active stream. Internal usages have no bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderActivity: u8 {
        const BACKGROUND = 1 << 0;
        const MEDIA = 1 << 1;
        const INTERRUPTION = 1 << 2;
        const SYSTEM_AGENT = 1 << 3;
        const COMMUNICATION = 1 << 4;
    }
}

impl RenderActivity {
    /// Mask for a single usage; empty for internal-only usages.
    pub fn from_usage(usage: RenderUsage) -> RenderActivity {
        if usage.is_external() {
            RenderActivity::from_bits_truncate(1 << usage.index())
        } else {
            RenderActivity::empty()
        }
    }
}

impl Default for RenderActivity {
    fn default() -> Self {
        RenderActivity::empty()
    }
}

bitflags! {
    /// One bit per externally visible capture usage.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CaptureActivity: u8 {
        const BACKGROUND = 1 << 0;
        const FOREGROUND = 1 << 1;
        const SYSTEM_AGENT = 1 << 2;
        const COMMUNICATION = 1 << 3;
    }
}

impl CaptureActivity {
    pub fn from_usage(usage: CaptureUsage) -> CaptureActivity {
        if usage.is_external() {
            CaptureActivity::from_bits_truncate(1 << usage.index())
        } else {
            CaptureActivity::empty()
        }
    }
}

impl Default for CaptureActivity {
    fn default() -> Self {
        CaptureActivity::empty()
    }
}
