//! Inbound push-notification payload.
//!
//! Only the fields the pipeline actually consumes are modelled; anything
//! else the sender includes is ignored by serde.  A payload missing one of
//! these fields fails deserialization and surfaces as the generic pipeline
//! failure.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub repository: Repository,
    /// Fully-qualified ref that was pushed, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// URL the pushed branch is cloned from.
    pub clone_url: String,
    /// Short name used for the local workspace directory.
    pub name: String,
}

/// Derive the branch name from a ref string: the final slash-delimited
/// segment, so `refs/heads/main` yields `main`.
///
/// Multi-segment branch names collapse to their last segment
/// (`refs/heads/feature/x` yields `x`).
// TODO: confirm with the webhook producer whether multi-segment branch names
// should keep their full path below refs/heads/ instead of being truncated.
pub fn branch_from_ref(git_ref: &str) -> Option<&str> {
    match git_ref.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => Some(segment),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_branch_ref() {
        assert_eq!(branch_from_ref("refs/heads/main"), Some("main"));
    }

    #[test]
    fn multi_segment_branch_truncates_to_last_segment() {
        assert_eq!(branch_from_ref("refs/heads/feature/x"), Some("x"));
    }

    #[test]
    fn bare_name_passes_through() {
        assert_eq!(branch_from_ref("main"), Some("main"));
    }

    #[test]
    fn empty_ref_is_rejected() {
        assert_eq!(branch_from_ref(""), None);
    }

    #[test]
    fn trailing_slash_is_rejected() {
        assert_eq!(branch_from_ref("refs/heads/"), None);
    }

    #[test]
    fn payload_parses_with_extra_fields_ignored() {
        let payload = serde_json::json!({
            "ref": "refs/heads/main",
            "before": "0000",
            "repository": {
                "clone_url": "https://github.com/acme/demo.git",
                "name": "demo",
                "private": false,
            },
            "pusher": { "name": "octocat" },
        });

        let event: PushEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.git_ref, "refs/heads/main");
        assert_eq!(event.repository.clone_url, "https://github.com/acme/demo.git");
        assert_eq!(event.repository.name, "demo");
    }

    #[test]
    fn payload_missing_clone_url_fails() {
        let payload = serde_json::json!({
            "ref": "refs/heads/main",
            "repository": { "name": "demo" },
        });
        assert!(serde_json::from_value::<PushEvent>(payload).is_err());
    }

    #[test]
    fn payload_missing_ref_fails() {
        let payload = serde_json::json!({
            "repository": {
                "clone_url": "https://github.com/acme/demo.git",
                "name": "demo",
            },
        });
        assert!(serde_json::from_value::<PushEvent>(payload).is_err());
    }
}
