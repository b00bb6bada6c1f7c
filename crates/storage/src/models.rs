//! Persisted Records

use crate::StorageError;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Closed set of lowercase values backed by a TEXT column with a CHECK constraint
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StorageError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(StorageError::InvalidValue(format!(
                        "{} must be one of {}, got '{}'",
                        stringify!($name),
                        [$($text),+].join(", "),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(
    /// Review state of a field survey
    SurveyStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

text_enum!(
    /// Observed water quality in a field survey
    WaterQuality {
        Good => "good",
        Fair => "fair",
        Poor => "poor",
    }
);

text_enum!(
    /// Alert severity
    AlertSeverity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

text_enum!(
    /// Alert lifecycle state
    AlertStatus {
        Active => "active",
        Investigating => "investigating",
        Resolved => "resolved",
    }
);

/// User account
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

/// Account to create; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub location: Option<String>,
}

/// Field survey submitted by a volunteer
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Survey {
    pub id: i64,
    pub user_id: i64,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub water_quality: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSurvey {
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub water_quality: Option<WaterQuality>,
    pub notes: Option<String>,
}

/// Top prediction persisted for an authenticated caller
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub user_id: i64,
    pub sensor_data: Json<serde_json::Value>,
    pub predicted_disease: Option<String>,
    pub confidence: Option<f64>,
    pub risk_level: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub user_id: i64,
    pub sensor_data: serde_json::Value,
    pub predicted_disease: String,
    /// Percentage, as reported to the caller
    pub confidence: f64,
    pub risk_level: String,
}

/// Public health alert
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Alert {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub location: String,
    pub disease_type: Option<String>,
    pub cases_count: i64,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub title: String,
    pub description: Option<String>,
    pub severity: AlertSeverity,
    pub location: String,
    pub disease_type: Option<String>,
    #[serde(default)]
    pub cases_count: i64,
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    /// Active accounts
    pub total_users: i64,
    /// Accounts that logged in during the last seven days
    pub active_users: i64,
    /// Surveys awaiting review
    pub pending_approvals: i64,
    pub total_submissions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("approved".parse::<SurveyStatus>().unwrap(), SurveyStatus::Approved);
        assert_eq!("investigating".parse::<AlertStatus>().unwrap(), AlertStatus::Investigating);
        assert!("Approved".parse::<SurveyStatus>().is_err());
    }

    #[test]
    fn test_invalid_value_lists_choices() {
        let err = "urgent".parse::<AlertSeverity>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value: AlertSeverity must be one of low, medium, high, critical, got 'urgent'"
        );
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&WaterQuality::Poor).unwrap();
        assert_eq!(json, "\"poor\"");
        let severity: AlertSeverity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(severity, AlertSeverity::Critical);
    }
}
