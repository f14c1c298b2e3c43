use dashmap::DashMap;
use uuid::Uuid;

/// Resolves an opaque session token to the user it was issued for.
pub trait IdentityResolver: Send + Sync {
    /// `None` when the token is unknown.
    fn resolve(&self, token: &str) -> Option<Uuid>;
}

/// In-process token registry filled at registration time.
#[derive(Default)]
pub struct SessionRegistry {
    tokens: DashMap<String, Uuid>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token bound to `user_id`.
    pub fn issue(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }
}

impl IdentityResolver for SessionRegistry {
    fn resolve(&self, token: &str) -> Option<Uuid> {
        self.tokens.get(token).map(|entry| *entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_resolve_to_their_user() {
        let registry = SessionRegistry::new();
        let user_id = Uuid::new_v4();
        let token = registry.issue(user_id);

        assert_eq!(token.len(), 32);
        assert_eq!(registry.resolve(&token), Some(user_id));
        assert_eq!(registry.resolve("not-a-token"), None);
    }

    #[test]
    fn each_issue_yields_a_new_token() {
        let registry = SessionRegistry::new();
        let user_id = Uuid::new_v4();
        assert_ne!(registry.issue(user_id), registry.issue(user_id));
    }
}
