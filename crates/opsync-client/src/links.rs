//! Link-relation resolution
//!
//! The tracking service embeds relations as hyperlinks:
//!
//! ```json
//! "_links": {"project": {"href": "/api/v3/projects/14"}}
//! ```
//!
//! The related entity's external id is the path segment following the
//! endpoint name.

use serde_json::Value;

/// Extract the external id embedded in a link relation's href.
///
/// Returns `None` for a missing relation, a missing href, or an href whose
/// path does not contain the expected endpoint segment; never panics on
/// absent intermediate keys.
pub fn parse_link_relation(links: Option<&Value>, key: &str, endpoint: &str) -> Option<String> {
    let href = links?.get(key)?.get("href")?.as_str()?;

    let mut segments = href.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == endpoint {
            return segments
                .next()
                .filter(|id| !id.is_empty())
                .map(str::to_string);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_id_from_href() {
        let links = json!({"project": {"href": "/api/v3/projects/14"}});
        assert_eq!(
            parse_link_relation(Some(&links), "project", "projects"),
            Some("14".to_string())
        );
    }

    #[test]
    fn test_parses_id_from_absolute_href() {
        let links = json!({"assignee": {"href": "https://openproject.example.com/api/v3/users/1"}});
        assert_eq!(
            parse_link_relation(Some(&links), "assignee", "users"),
            Some("1".to_string())
        );
    }

    #[test]
    fn test_missing_relation_returns_none() {
        let links = json!({"status": {"href": "/api/v3/statuses/2"}});
        assert_eq!(parse_link_relation(Some(&links), "project", "projects"), None);
        assert_eq!(parse_link_relation(None, "project", "projects"), None);
    }

    #[test]
    fn test_malformed_relation_returns_none() {
        // Null href: the service uses this for unset optional relations
        let links = json!({"assignee": {"href": null}});
        assert_eq!(parse_link_relation(Some(&links), "assignee", "users"), None);

        // Relation present but not an object
        let links = json!({"assignee": "nope"});
        assert_eq!(parse_link_relation(Some(&links), "assignee", "users"), None);

        // Wrong endpoint in the path
        let links = json!({"assignee": {"href": "/api/v3/groups/3"}});
        assert_eq!(parse_link_relation(Some(&links), "assignee", "users"), None);

        // Endpoint with no trailing id
        let links = json!({"assignee": {"href": "/api/v3/users/"}});
        assert_eq!(parse_link_relation(Some(&links), "assignee", "users"), None);
    }
}
