use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Role, SubscriptionGrant, SubscriptionType};

/// Longest grant an admin may issue in one call (100 years).
pub const MAX_GRANT_DAYS: i64 = 36_500;

/// Writes and reads subscription grants.
pub struct SubscriptionLedger {
    store: Arc<dyn Store>,
}

impl SubscriptionLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Supersedes any active grant held by `user_id` with a new one expiring
    /// `days` from now.
    pub fn grant(
        &self,
        actor: &SessionUser,
        user_id: &str,
        subscription_type: SubscriptionType,
        days: i64,
    ) -> Result<SubscriptionGrant> {
        match actor.role {
            Role::Admin => {}
            Role::User => return Err(Error::Forbidden("Admin access required".to_string())),
        }

        if !(1..=MAX_GRANT_DAYS).contains(&days) {
            return Err(Error::InvalidInput(format!(
                "Days must be between 1 and {MAX_GRANT_DAYS}"
            )));
        }

        let now = Utc::now();
        let requested = SubscriptionGrant {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            subscription_type,
            expires_at: now + Duration::days(days),
            is_active: true,
            created_at: now,
        };

        let grant = self.store.replace_active_grant(&requested)?;

        info!(
            admin = %actor.username,
            user_id,
            plan = %subscription_type,
            days,
            "Subscription granted"
        );

        Ok(grant)
    }

    /// Returns the grant flagged active for `user_id`, whether or not it has
    /// expired.
    pub fn active_grant(&self, user_id: &str) -> Result<Option<SubscriptionGrant>> {
        self.store.get_active_grant(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::subscription::is_active;
    use crate::types::User;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<SqliteStore>, SubscriptionLedger) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
        store.initialize().unwrap();
        store
            .create_user(&User {
                id: "user-1".to_string(),
                username: "bob".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
                created_at: Utc::now(),
            })
            .unwrap();
        let ledger = SubscriptionLedger::new(store.clone());
        (temp, store, ledger)
    }

    fn admin() -> SessionUser {
        SessionUser {
            id: "admin-1".to_string(),
            username: "admin".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_grant_sets_expiry() {
        let (_temp, _store, ledger) = setup();

        let grant = ledger
            .grant(&admin(), "user-1", SubscriptionType::Days30, 30)
            .unwrap();

        let active = ledger.active_grant("user-1").unwrap().unwrap();
        assert_eq!(active.id, grant.id);
        assert!(is_active(&active, Utc::now()));

        let expected = Utc::now() + Duration::days(30);
        let drift = (active.expires_at - expected).num_seconds().abs();
        assert!(drift < 5, "expiry drifted by {drift}s");
    }

    #[test]
    fn test_regrant_supersedes_previous() {
        let (_temp, store, ledger) = setup();

        let first = ledger
            .grant(&admin(), "user-1", SubscriptionType::Days30, 30)
            .unwrap();
        let second = ledger
            .grant(&admin(), "user-1", SubscriptionType::Days7, 7)
            .unwrap();

        let history = store.list_grants("user-1").unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history.iter().find(|g| g.id == first.id).unwrap().is_active);

        let active = ledger.active_grant("user-1").unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.subscription_type, SubscriptionType::Days7);
    }

    #[test]
    fn test_grant_rejects_non_admin() {
        let (_temp, store, ledger) = setup();
        let user = SessionUser {
            id: "user-1".to_string(),
            username: "bob".to_string(),
            role: Role::User,
        };

        let result = ledger.grant(&user, "user-1", SubscriptionType::Days7, 7);
        assert!(matches!(result, Err(Error::Forbidden(_))));
        assert!(store.list_grants("user-1").unwrap().is_empty());
    }

    #[test]
    fn test_grant_rejects_bad_days_before_writing() {
        let (_temp, store, ledger) = setup();

        for days in [0, -5, MAX_GRANT_DAYS + 1] {
            let result = ledger.grant(&admin(), "user-1", SubscriptionType::Days7, days);
            assert!(matches!(result, Err(Error::InvalidInput(_))));
        }
        assert!(store.list_grants("user-1").unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_grants_leave_one_active() {
        let (_temp, store, ledger) = setup();
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    let plan = SubscriptionType::ALL[i % SubscriptionType::ALL.len()];
                    ledger
                        .grant(&admin(), "user-1", plan, plan.default_days())
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.list_grants("user-1").unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history.iter().filter(|g| g.is_active).count(), 1);

        let newest = history.iter().max_by_key(|g| g.created_at).unwrap();
        let active = ledger.active_grant("user-1").unwrap().unwrap();
        assert_eq!(active.id, newest.id);
    }
}
