//! MCP `ToolAnnotations` derived from the HTTP method behind each tool.

use crate::spec::HttpMethod;
use rmcp::model::ToolAnnotations;

/// `openWorldHint` is always `true`: every tool talks to the remote API.
#[must_use]
pub fn annotations_for_method(method: HttpMethod) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match method {
        HttpMethod::Get | HttpMethod::Head | HttpMethod::Options => {
            (Some(true), Some(false), Some(true))
        }
        HttpMethod::Post => (Some(false), Some(false), Some(false)),
        HttpMethod::Put | HttpMethod::Delete => (Some(false), Some(true), Some(true)),
        // PATCH may or may not be idempotent; do not guess.
        HttpMethod::Patch => (Some(false), Some(true), None),
    };

    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::annotations_for_method;
    use crate::spec::HttpMethod;

    #[test]
    fn get_is_read_only_and_idempotent() {
        let a = annotations_for_method(HttpMethod::Get);
        assert_eq!(a.read_only_hint, Some(true));
        assert_eq!(a.destructive_hint, Some(false));
        assert_eq!(a.idempotent_hint, Some(true));
        assert_eq!(a.open_world_hint, Some(true));
    }

    #[test]
    fn post_is_not_idempotent() {
        let a = annotations_for_method(HttpMethod::Post);
        assert_eq!(a.read_only_hint, Some(false));
        assert_eq!(a.idempotent_hint, Some(false));
    }

    #[test]
    fn delete_is_destructive_and_patch_leaves_idempotency_unset() {
        let delete = annotations_for_method(HttpMethod::Delete);
        assert_eq!(delete.destructive_hint, Some(true));
        assert_eq!(delete.idempotent_hint, Some(true));

        let patch = annotations_for_method(HttpMethod::Patch);
        assert_eq!(patch.destructive_hint, Some(true));
        assert_eq!(patch.idempotent_hint, None);
    }
}
