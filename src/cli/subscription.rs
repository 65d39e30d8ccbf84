use std::sync::Arc;

use chrono::Utc;

use crate::auth::SessionUser;
use crate::store::Store;
use crate::subscription::{SubscriptionLedger, days_remaining};
use crate::types::{Role, SubscriptionType};

use super::init_store;

pub fn run_grant(
    data_dir: String,
    username: String,
    subscription_type: SubscriptionType,
    days: Option<i64>,
) -> anyhow::Result<()> {
    let store = Arc::new(init_store(&data_dir)?);

    let user = store
        .get_user_by_username(&username)?
        .ok_or_else(|| anyhow::anyhow!("User '{username}' not found"))?;

    // Grants are recorded on behalf of the first admin.
    let admin = store
        .list_users()?
        .into_iter()
        .rev()
        .map(|entry| entry.user)
        .find(|u| u.role == Role::Admin)
        .ok_or_else(|| anyhow::anyhow!("No admin user exists. Run 'filegate admin init' first."))?;

    let ledger = SubscriptionLedger::new(store.clone());
    let days = days.unwrap_or(subscription_type.default_days());
    let grant = ledger.grant(&SessionUser::from(&admin), &user.id, subscription_type, days)?;

    println!();
    println!(
        "Granted {} to \"{}\", expires {} ({} days)",
        grant.subscription_type,
        user.username,
        grant.expires_at.to_rfc3339(),
        days_remaining(&grant, Utc::now())
    );
    println!();

    Ok(())
}
