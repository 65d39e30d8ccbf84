use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four subscription plans an admin can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionType {
    #[serde(rename = "7days")]
    Days7,
    #[serde(rename = "30days")]
    Days30,
    #[serde(rename = "60days")]
    Days60,
    #[serde(rename = "365days")]
    Days365,
}

impl SubscriptionType {
    pub const ALL: [SubscriptionType; 4] = [
        SubscriptionType::Days7,
        SubscriptionType::Days30,
        SubscriptionType::Days60,
        SubscriptionType::Days365,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SubscriptionType::Days7 => "7days",
            SubscriptionType::Days30 => "30days",
            SubscriptionType::Days60 => "60days",
            SubscriptionType::Days365 => "365days",
        }
    }

    /// Number of days the plan nominally covers. Admins may still pass an
    /// explicit duration when granting.
    #[must_use]
    pub const fn default_days(self) -> i64 {
        match self {
            SubscriptionType::Days7 => 7,
            SubscriptionType::Days30 => 30,
            SubscriptionType::Days60 => 60,
            SubscriptionType::Days365 => 365,
        }
    }

    pub fn parse(s: &str) -> Option<SubscriptionType> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl FromStr for SubscriptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("invalid subscription type '{s}' (expected 7days, 30days, 60days or 365days)")
        })
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_plans() {
        for plan in SubscriptionType::ALL {
            assert_eq!(SubscriptionType::parse(plan.as_str()), Some(plan));
        }
        assert_eq!(SubscriptionType::parse("14days"), None);
        assert!("1day".parse::<SubscriptionType>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&SubscriptionType::Days30).unwrap();
        assert_eq!(json, "\"30days\"");
        let parsed: SubscriptionType = serde_json::from_str("\"365days\"").unwrap();
        assert_eq!(parsed, SubscriptionType::Days365);
        assert_eq!(parsed.default_days(), 365);
    }
}
