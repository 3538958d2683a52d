//! On-disk policy loading: bounded file reads and the ordered path probe.

use std::fs;
use std::path::Path;

use crate::document::PolicyDocument;
use crate::util::{PolicyError, MAX_POLICY_FILE_BYTES};

/// Read and parse one policy file. Files over [`MAX_POLICY_FILE_BYTES`] are
/// rejected without being read.
pub fn load_policy_file(path: impl AsRef<Path>) -> Result<PolicyDocument, PolicyError> {
    let path = path.as_ref();
    let size = fs::metadata(path)?.len();
    if size > MAX_POLICY_FILE_BYTES {
        return Err(PolicyError::FileTooLarge(size));
    }
    let body = fs::read_to_string(path)?;
    PolicyDocument::parse(&body)
}

/// Probe `paths` in order and return the first document that loads. Returns
/// `None` when no candidate loads; callers then run with no interactions.
pub fn load_default_policy(paths: &[impl AsRef<Path>]) -> Option<PolicyDocument> {
    for path in paths {
        let path = path.as_ref();
        match load_policy_file(path) {
            Ok(document) => {
                tracing::info!(
                    path = %path.display(),
                    rules = document.rules().len(),
                    "loaded audio policy"
                );
                return Some(document);
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping audio policy candidate");
            }
        }
    }
    tracing::warn!("no audio policy found, continuing without interactions");
    None
}
