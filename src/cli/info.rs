use chrono::Utc;
use serde::Serialize;

use crate::catalog::format_file_size;
use crate::store::Store;
use crate::subscription::has_active;
use crate::types::Role;

use super::init_store;

#[derive(Serialize)]
struct ServerInfo {
    users: usize,
    admins: usize,
    active_subscriptions: usize,
    categories: usize,
    files: usize,
    total_bytes: i64,
    site_name: String,
}

#[derive(Serialize)]
struct UserOutput {
    id: String,
    username: String,
    role: Role,
    created_at: String,
    subscription: Option<String>,
    expires_at: Option<String>,
    active: bool,
}

#[derive(Serialize)]
struct CategoryOutput {
    id: String,
    name: String,
    files: usize,
    bytes: i64,
}

#[derive(Serialize)]
struct DetailedServerInfo {
    #[serde(flatten)]
    summary: ServerInfo,
    user_list: Vec<UserOutput>,
    category_list: Vec<CategoryOutput>,
}

pub fn run_info(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let now = Utc::now();

    let users = store.list_users()?;
    let categories = store.list_categories_with_files()?;
    let settings = store.get_settings()?;

    let summary = ServerInfo {
        users: users.len(),
        admins: users.iter().filter(|u| u.user.role.is_admin()).count(),
        active_subscriptions: users
            .iter()
            .filter(|u| has_active(u.grant.as_ref(), now))
            .count(),
        categories: categories.len(),
        files: categories.iter().map(|c| c.files.len()).sum(),
        total_bytes: categories
            .iter()
            .flat_map(|c| &c.files)
            .map(|f| f.size_bytes)
            .sum(),
        site_name: settings.site_name,
    };

    if json {
        let user_list = users
            .iter()
            .map(|entry| UserOutput {
                id: entry.user.id.clone(),
                username: entry.user.username.clone(),
                role: entry.user.role,
                created_at: entry.user.created_at.to_rfc3339(),
                subscription: entry
                    .grant
                    .as_ref()
                    .map(|g| g.subscription_type.to_string()),
                expires_at: entry.grant.as_ref().map(|g| g.expires_at.to_rfc3339()),
                active: has_active(entry.grant.as_ref(), now),
            })
            .collect();

        let category_list = categories
            .iter()
            .map(|entry| CategoryOutput {
                id: entry.category.id.clone(),
                name: entry.category.name.clone(),
                files: entry.files.len(),
                bytes: entry.files.iter().map(|f| f.size_bytes).sum(),
            })
            .collect();

        let info = DetailedServerInfo {
            summary,
            user_list,
            category_list,
        };

        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!();
        println!("{} Server Status", summary.site_name);
        println!("{}", "─".repeat(20));
        println!(
            "Users:       {} ({} admin, {} subscribed)",
            summary.users, summary.admins, summary.active_subscriptions
        );
        println!("Categories:  {}", summary.categories);
        println!(
            "Files:       {} ({})",
            summary.files,
            format_file_size(u64::try_from(summary.total_bytes).unwrap_or_default())
        );
        println!();
    }

    Ok(())
}
