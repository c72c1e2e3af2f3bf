//! Deterministic conversation partition keys.

use dashchat_types::chat::SessionKey;

/// Builds the session key for a (user, project) pair.
///
/// The key is a pure function of its inputs. Project-bound keys carry a
/// `project:` segment that the unbound `none` key never has, so no project
/// slug (not even a literal `"none"`) can collide with the unbound key or
/// with another project's key for the same user.
#[derive(Debug, Clone)]
pub struct SessionKeyBuilder {
    namespace: String,
}

impl SessionKeyBuilder {
    pub const DEFAULT_NAMESPACE: &'static str = "dashboard";

    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn build(&self, user_id: i64, project_slug: Option<&str>) -> SessionKey {
        match project_slug {
            Some(slug) => SessionKey::new(format!(
                "{}:{user_id}:project:{slug}",
                self.namespace
            )),
            None => SessionKey::new(format!("{}:{user_id}:none", self.namespace)),
        }
    }
}

impl Default for SessionKeyBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_inputs_same_key() {
        let builder = SessionKeyBuilder::default();
        let a = builder.build(42, Some("acme"));
        let b = builder.build(42, Some("acme"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "dashboard:42:project:acme");
    }

    #[test]
    fn test_distinct_projects_distinct_keys() {
        let builder = SessionKeyBuilder::default();
        assert_ne!(builder.build(42, Some("acme")), builder.build(42, Some("globex")));
    }

    #[test]
    fn test_distinct_users_distinct_keys() {
        let builder = SessionKeyBuilder::default();
        assert_ne!(builder.build(4, Some("2-acme")), builder.build(42, Some("acme")));
    }

    #[test]
    fn test_unbound_key_uses_none() {
        let builder = SessionKeyBuilder::default();
        assert_eq!(builder.build(42, None).as_str(), "dashboard:42:none");
    }

    #[test]
    fn test_project_named_none_does_not_collide_with_unbound() {
        let builder = SessionKeyBuilder::default();
        assert_ne!(builder.build(42, Some("none")), builder.build(42, None));
    }
}
