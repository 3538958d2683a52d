//! Parsed form of the JSON policy document.
//!
//! The accepted shape is:
//!
//! ```json
//! {
//!   "audio_policy_rules": [
//!     { "active":   { "render_usage": "COMMUNICATION" },
//!       "affected": { "render_usage": "MEDIA" },
//!       "behavior": "DUCK" }
//!   ]
//! }
//! ```
//!
//! Only the externally visible usages can be named; unknown keys inside a
//! rule or usage object fail the parse, unknown top-level keys are ignored.

use serde::Deserialize;
use stream_types::{Behavior, CaptureUsage, RenderUsage, StreamUsage};

use crate::util::PolicyError;

/// One translated rule from a policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRule {
    pub active: StreamUsage,
    pub affected: StreamUsage,
    pub behavior: Behavior,
}

/// A fully validated policy document. Parsing is all-or-nothing: any invalid
/// rule rejects the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    rules: Vec<PolicyRule>,
}

#[derive(Deserialize)]
struct RawDocument {
    audio_policy_rules: Vec<RawRule>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    active: RawUsage,
    affected: RawUsage,
    behavior: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUsage {
    render_usage: Option<String>,
    capture_usage: Option<String>,
}

fn render_usage_from_name(name: &str) -> Result<RenderUsage, PolicyError> {
    // Externally visible render usages only; ULTRASOUND is not addressable.
    RenderUsage::ALL
        .into_iter()
        .filter(|usage| usage.is_external())
        .find(|usage| usage.name() == name)
        .ok_or_else(|| PolicyError::UnknownRenderUsage(name.to_string()))
}

fn capture_usage_from_name(name: &str) -> Result<CaptureUsage, PolicyError> {
    CaptureUsage::ALL
        .into_iter()
        .filter(|usage| usage.is_external())
        .find(|usage| usage.name() == name)
        .ok_or_else(|| PolicyError::UnknownCaptureUsage(name.to_string()))
}

fn behavior_from_name(name: &str) -> Result<Behavior, PolicyError> {
    match name {
        "NONE" => Ok(Behavior::None),
        "DUCK" => Ok(Behavior::Duck),
        "MUTE" => Ok(Behavior::Mute),
        other => Err(PolicyError::UnknownBehavior(other.to_string())),
    }
}

impl RawUsage {
    fn translate(&self) -> Result<StreamUsage, PolicyError> {
        match (&self.render_usage, &self.capture_usage) {
            (Some(_), Some(_)) => Err(PolicyError::AmbiguousUsage),
            (Some(name), None) => Ok(StreamUsage::Render(render_usage_from_name(name)?)),
            (None, Some(name)) => Ok(StreamUsage::Capture(capture_usage_from_name(name)?)),
            (None, None) => Err(PolicyError::MissingUsage),
        }
    }
}

impl PolicyDocument {
    /// Parse and validate a policy document. Pure: no side effects on any
    /// live rule matrix, so a failed parse leaves previous policy intact.
    pub fn parse(body: &str) -> Result<PolicyDocument, PolicyError> {
        let raw: RawDocument = serde_json::from_str(body)?;
        let mut rules = Vec::with_capacity(raw.audio_policy_rules.len());
        for rule in &raw.audio_policy_rules {
            rules.push(PolicyRule {
                active: rule.active.translate()?,
                affected: rule.affected.translate()?,
                behavior: behavior_from_name(&rule.behavior)?,
            });
        }
        Ok(PolicyDocument { rules })
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }
}
