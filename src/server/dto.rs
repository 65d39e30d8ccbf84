use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::catalog::format_file_size;
use crate::subscription::{self, SubscriptionTier};
use crate::types::{
    CategoryWithFiles, FileAsset, Role, SiteSettings, SubscriptionGrant, SubscriptionType, User,
    UserWithGrant,
};

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    pub expires_at: DateTime<Utc>,
    /// Evaluated activity: flagged active and not yet expired.
    pub is_active: bool,
    pub days_remaining: i64,
    pub tier: SubscriptionTier,
}

impl SubscriptionResponse {
    #[must_use]
    pub fn from_grant(grant: &SubscriptionGrant, now: DateTime<Utc>) -> Self {
        Self {
            subscription_type: grant.subscription_type,
            expires_at: grant.expires_at,
            is_active: subscription::is_active(grant, now),
            days_remaining: subscription::days_remaining(grant, now).max(0),
            tier: subscription::tier(grant, now),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionResponse>,
}

impl UserResponse {
    #[must_use]
    pub fn new(user: &User, grant: Option<&SubscriptionGrant>, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            created_at: user.created_at,
            subscription: grant.map(|g| SubscriptionResponse::from_grant(g, now)),
        }
    }
}

impl From<&UserWithGrant> for UserResponse {
    fn from(entry: &UserWithGrant) -> Self {
        Self::new(&entry.user, entry.grant.as_ref(), Utc::now())
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: String,
    /// Original upload name.
    pub filename: String,
    /// Human readable size.
    pub size: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&FileAsset> for FileResponse {
    fn from(file: &FileAsset) -> Self {
        Self {
            id: file.id.clone(),
            filename: file.original_name.clone(),
            size: format_file_size(u64::try_from(file.size_bytes).unwrap_or_default()),
            size_bytes: file.size_bytes,
            uploaded_at: file.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub files: Vec<FileResponse>,
}

impl From<&CategoryWithFiles> for CategoryResponse {
    fn from(entry: &CategoryWithFiles) -> Self {
        Self {
            id: entry.category.id.clone(),
            name: entry.category.name.clone(),
            files: entry.files.iter().map(FileResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCategoryResponse {
    pub category_id: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedFileResponse {
    pub file: FileResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantSubscriptionRequest {
    #[serde(rename = "type")]
    pub subscription_type: String,
    /// Defaults to the length implied by the type. Accepts a number or a
    /// numeric string.
    #[serde(default, deserialize_with = "lenient_days")]
    pub days: Option<i64>,
}

fn lenient_days<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Days {
        Number(i64),
        Text(String),
    }

    match Option::<Days>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Days::Number(days)) => Ok(Some(days)),
        Some(Days::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Days::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("days: expected a whole number, got \"{text}\""))),
    }
}

#[derive(Debug, Serialize)]
pub struct GrantResponse {
    pub subscription: SubscriptionResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub site_icon: Option<String>,
    #[serde(default)]
    pub header_image: Option<String>,
}

impl SettingsRequest {
    /// Fills missing or blank fields with defaults.
    #[must_use]
    pub fn into_settings(self) -> SiteSettings {
        let defaults = SiteSettings::default();
        let pick = |value: Option<String>, default: String| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        SiteSettings {
            site_name: pick(self.site_name, defaults.site_name),
            site_icon: pick(self.site_icon, defaults.site_icon),
            header_image: pick(self.header_image, defaults.header_image),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: SiteSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_grant_request_days() {
        let parse = |value: serde_json::Value| {
            serde_json::from_value::<GrantSubscriptionRequest>(value).map(|r| r.days)
        };

        assert_eq!(parse(json!({ "type": "30days" })).unwrap(), None);
        assert_eq!(parse(json!({ "type": "30days", "days": null })).unwrap(), None);
        assert_eq!(parse(json!({ "type": "30days", "days": 12 })).unwrap(), Some(12));
        assert_eq!(parse(json!({ "type": "30days", "days": " 30 " })).unwrap(), Some(30));
        assert!(parse(json!({ "type": "30days", "days": "soon" })).is_err());
        assert!(parse(json!({ "type": "30days", "days": 1.5 })).is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = SettingsRequest {
            site_name: Some("  ".to_string()),
            site_icon: Some("icon.png".to_string()),
            header_image: None,
        }
        .into_settings();

        assert_eq!(settings.site_name, "SPOOFER4YOU");
        assert_eq!(settings.site_icon, "icon.png");
        assert_eq!(settings.header_image, "");
    }

    #[test]
    fn test_file_response_shape() {
        let file = FileAsset {
            id: "f1".to_string(),
            stored_name: "1-abc.zip".to_string(),
            original_name: "tool.zip".to_string(),
            storage_path: "uploads/1-abc.zip".to_string(),
            size_bytes: 1536,
            sha256: String::new(),
            category_id: "c1".to_string(),
            uploaded_at: Utc::now(),
        };

        let value = serde_json::to_value(FileResponse::from(&file)).unwrap();
        assert_eq!(value["filename"], "tool.zip");
        assert_eq!(value["size"], "1.5 KB");
        assert_eq!(value["sizeBytes"], 1536);
        assert!(value.get("uploadedAt").is_some());
    }

    #[test]
    fn test_expired_subscription_response() {
        let now = Utc::now();
        let grant = SubscriptionGrant {
            id: "g1".to_string(),
            user_id: "u1".to_string(),
            subscription_type: SubscriptionType::Days7,
            expires_at: now - Duration::days(2),
            is_active: true,
            created_at: now - Duration::days(9),
        };

        let value = serde_json::to_value(SubscriptionResponse::from_grant(&grant, now)).unwrap();
        assert_eq!(value["type"], "7days");
        assert_eq!(value["isActive"], json!(false));
        assert_eq!(value["daysRemaining"], 0);
        assert_eq!(value["tier"], "critical");
    }
}
