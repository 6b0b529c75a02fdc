use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

use crate::principal::Principal;

/// Resolved principals keyed by user id.
///
/// Entries are dropped explicitly on mutation of the underlying role or
/// permission data, and lapse on their own once an assignment they relied
/// on expires.
#[derive(Debug, Default)]
pub struct PrincipalCache {
    entries: RwLock<HashMap<i64, Arc<Principal>>>,
}

impl PrincipalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i64, as_of: i64) -> Option<Arc<Principal>> {
        let entries = self.entries.read();
        let principal = entries.get(&user_id)?;
        match principal.valid_until() {
            Some(ts) if as_of >= ts => {
                log::trace!("cached principal for user {user_id} lapsed at {ts}");
                None
            }
            _ => Some(principal.clone()),
        }
    }

    pub fn insert(&self, principal: Principal) -> Arc<Principal> {
        let principal = Arc::new(principal);
        self.entries.write().insert(principal.user().id, principal.clone());
        principal
    }

    pub fn invalidate(&self, user_id: i64) {
        if self.entries.write().remove(&user_id).is_some() {
            log::trace!("invalidated cached principal for user {user_id}");
        }
    }

    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use wardencore::ac::{RoleAssignment, User};
    use crate::{principal::Principal, resolver::RoleGraph};
    use super::PrincipalCache;

    fn principal(user_id: i64, invalid_after: Option<i64>) -> Principal {
        Principal::new(
            User { id: user_id, name: "fred".into(), firm_id: None },
            Arc::new(RoleGraph::default()),
            [RoleAssignment { id: 1, user_id, role_id: 1, invalid_after }],
            100,
            [],
        )
    }

    #[test]
    fn lifecycle() {
        let cache = PrincipalCache::new();
        assert!(cache.get(1, 100).is_none());
        cache.insert(principal(1, None));
        cache.insert(principal(2, Some(200)));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(1, 100_000).is_some());
        assert!(cache.get(2, 199).is_some());
        assert!(cache.get(2, 200).is_none());
        cache.invalidate(1);
        assert!(cache.get(1, 100).is_none());
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
