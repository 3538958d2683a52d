//! Declarative audio interaction policy: the rule matrix and the JSON
//! document format it is loaded from.

pub mod document;
pub mod loader;
pub mod rules;
pub mod util;

pub use document::{PolicyDocument, PolicyRule};
pub use loader::{load_default_policy, load_policy_file};
pub use rules::PolicyRules;
pub use util::{PolicyError, DEFAULT_POLICY_PATHS, MAX_POLICY_FILE_BYTES};
