use stream_types::{Behavior, StreamUsage};

/// Dense (active, affected) -> Behavior matrix over the full usage space.
/// Every cell is defined; the default is `Behavior::None` everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRules {
    cells: [[Behavior; StreamUsage::COUNT]; StreamUsage::COUNT],
}

impl PolicyRules {
    pub fn new() -> PolicyRules {
        PolicyRules {
            cells: [[Behavior::None; StreamUsage::COUNT]; StreamUsage::COUNT],
        }
    }

    /// Overwrite one cell. Idempotent.
    pub fn set_rule(&mut self, active: StreamUsage, affected: StreamUsage, behavior: Behavior) {
        self.cells[active.index()][affected.index()] = behavior;
    }

    /// Total lookup; unset cells read as `Behavior::None`.
    pub fn rule(&self, active: StreamUsage, affected: StreamUsage) -> Behavior {
        self.cells[active.index()][affected.index()]
    }

    /// Set every cell back to `Behavior::None`.
    pub fn reset_interactions(&mut self) {
        self.cells = [[Behavior::None; StreamUsage::COUNT]; StreamUsage::COUNT];
    }
}

impl Default for PolicyRules {
    fn default() -> Self {
        PolicyRules::new()
    }
}
