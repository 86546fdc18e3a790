//! Session credentials and where the client keeps them.

use std::sync::{Arc, RwLock};

use gasdesk_auth::Role;
use gasdesk_core::{AgencyId, UserId};

/// What the client knows about its signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: UserId,
    pub role: Role,
    pub agency_id: Option<AgencyId>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, user_id: UserId, role: Role, agency_id: Option<AgencyId>) -> Self {
        Self {
            token: token.into(),
            user_id,
            role,
            agency_id,
        }
    }
}

/// Local credential storage. Force logout clears it.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Credentials>;

    fn save(&self, credentials: Credentials);

    fn clear(&self);
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn load(&self) -> Option<Credentials> {
        (**self).load()
    }

    fn save(&self, credentials: Credentials) {
        (**self).save(credentials)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Option<Credentials>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(Some(credentials)),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Option<Credentials> {
        self.inner.read().ok().and_then(|c| c.clone())
    }

    fn save(&self, credentials: Credentials) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(credentials);
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_forgets_the_session() {
        let store = InMemorySessionStore::with(Credentials::new(
            "t",
            UserId::from("u1"),
            Role::Agent,
            Some(AgencyId::from("a1")),
        ));
        assert_eq!(store.load().map(|c| c.role), Some(Role::Agent));

        store.clear();
        assert!(store.load().is_none());
    }
}
