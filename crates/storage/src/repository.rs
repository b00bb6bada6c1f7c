//! Repository Implementation

use crate::models::{
    Alert, AlertStatus, NewAlert, NewPrediction, NewSurvey, NewUser, PredictionRecord, Survey,
    SurveyStatus, SystemStats, User,
};
use crate::schema::SCHEMA;
use crate::StorageError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, full_name, phone, \
                            location, is_active, created_at, last_login";

/// Data access over a SQLite connection pool
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Connect to a SQLite database, creating the file if needed, and apply the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        info!("Opening database {}", url);

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Private in-memory database on a single long-lived connection
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Apply the schema; safe to run on every start
    pub async fn migrate(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema applied");
        Ok(())
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Users

    /// Insert a user; duplicate username or email is a `Conflict`
    pub async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, role, full_name, phone, location)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.location)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Created user {} with ID {}", user.username, id);
        self.find_user_by_id(id).await?.ok_or(StorageError::NotFound)
    }

    /// Active user by username
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = ? AND is_active = 1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn update_last_login(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    /// Whether any admin account exists
    pub async fn has_admin(&self) -> Result<bool, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    // Surveys

    pub async fn create_survey(
        &self,
        user_id: i64,
        survey: NewSurvey,
    ) -> Result<Survey, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO surveys (user_id, location, latitude, longitude, water_quality, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&survey.location)
        .bind(survey.latitude)
        .bind(survey.longitude)
        .bind(survey.water_quality.map(|q| q.as_str()))
        .bind(&survey.notes)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Created survey {} for user {}", id, user_id);
        self.find_survey(id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn find_survey(&self, id: i64) -> Result<Option<Survey>, StorageError> {
        let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(survey)
    }

    /// Surveys submitted by a user, newest first
    pub async fn surveys_for_user(&self, user_id: i64) -> Result<Vec<Survey>, StorageError> {
        let surveys = sqlx::query_as::<_, Survey>(
            "SELECT * FROM surveys WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(surveys)
    }

    pub async fn update_survey_status(
        &self,
        id: i64,
        status: SurveyStatus,
    ) -> Result<Survey, StorageError> {
        let result = sqlx::query(
            "UPDATE surveys SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        info!("Survey {} marked {}", id, status);
        self.find_survey(id).await?.ok_or(StorageError::NotFound)
    }

    // Predictions

    pub async fn save_prediction(&self, prediction: NewPrediction) -> Result<i64, StorageError> {
        let sensor_data = serde_json::to_string(&prediction.sensor_data)?;
        let result = sqlx::query(
            r#"
            INSERT INTO predictions (user_id, sensor_data, predicted_disease, confidence, risk_level)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(prediction.user_id)
        .bind(sensor_data)
        .bind(&prediction.predicted_disease)
        .bind(prediction.confidence)
        .bind(&prediction.risk_level)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Inserted prediction with ID {}", id);
        Ok(id)
    }

    /// Most recent predictions of a user, newest first
    pub async fn predictions_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let predictions = sqlx::query_as::<_, PredictionRecord>(
            r#"
            SELECT id, user_id, sensor_data, predicted_disease, confidence, risk_level, created_at
            FROM predictions WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(predictions)
    }

    // Alerts

    pub async fn create_alert(
        &self,
        alert: NewAlert,
        created_by: Option<i64>,
    ) -> Result<Alert, StorageError> {
        if alert.cases_count < 0 {
            return Err(StorageError::InvalidValue(
                "cases_count must not be negative".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO alerts (title, description, severity, location, disease_type, cases_count, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.title)
        .bind(&alert.description)
        .bind(alert.severity.as_str())
        .bind(&alert.location)
        .bind(&alert.disease_type)
        .bind(alert.cases_count)
        .bind(created_by)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!("Created {} alert {}: {}", alert.severity, id, alert.title);
        self.find_alert(id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn find_alert(&self, id: i64) -> Result<Option<Alert>, StorageError> {
        let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(alert)
    }

    /// All alerts, newest first
    pub async fn list_alerts(&self) -> Result<Vec<Alert>, StorageError> {
        let alerts =
            sqlx::query_as::<_, Alert>("SELECT * FROM alerts ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(alerts)
    }

    pub async fn update_alert_status(
        &self,
        id: i64,
        status: AlertStatus,
    ) -> Result<Alert, StorageError> {
        let result =
            sqlx::query("UPDATE alerts SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        info!("Alert {} marked {}", id, status);
        self.find_alert(id).await?.ok_or(StorageError::NotFound)
    }

    // Stats

    pub async fn stats(&self) -> Result<SystemStats, StorageError> {
        let (total_users, active_users, pending_approvals, total_submissions): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users WHERE is_active = 1),
                    (SELECT COUNT(*) FROM users WHERE last_login > datetime('now', '-7 days')),
                    (SELECT COUNT(*) FROM surveys WHERE status = 'pending'),
                    (SELECT COUNT(*) FROM surveys)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(SystemStats {
            total_users,
            active_users,
            pending_approvals,
            total_submissions,
        })
    }
}
