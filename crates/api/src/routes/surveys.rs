//! Field Survey Routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{NewSurvey, Survey, SurveyStatus};

use crate::{ApiError, AppState, AuthUser};

#[derive(Debug, Serialize)]
pub struct SurveyCreated {
    pub message: &'static str,
    pub survey_id: i64,
    pub survey: Survey,
}

#[derive(Debug, Serialize)]
pub struct SurveyList {
    pub surveys: Vec<Survey>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SurveyUpdated {
    pub message: &'static str,
    pub survey: Survey,
}

/// Submit a survey as the signed-in user
pub async fn create_survey(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<NewSurvey>, JsonRejection>,
) -> Result<Json<SurveyCreated>, ApiError> {
    let Json(mut survey) = payload?;
    survey.location = survey.location.trim().to_string();
    if survey.location.is_empty() {
        return Err(ApiError::BadRequest("Location is required".to_string()));
    }

    let survey = state.repository.create_survey(user.user_id(), survey).await?;
    Ok(Json(SurveyCreated {
        message: "Survey created successfully",
        survey_id: survey.id,
        survey,
    }))
}

/// Surveys of the signed-in user, newest first
pub async fn list_surveys(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<SurveyList>, ApiError> {
    let surveys = state.repository.surveys_for_user(user.user_id()).await?;
    Ok(Json(SurveyList { surveys }))
}

/// Approve or reject a survey; officials and admins only
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<SurveyUpdated>, ApiError> {
    user.require_reviewer()?;
    let Json(update) = payload?;
    let status: SurveyStatus = update.status.parse()?;

    let survey = state.repository.update_survey_status(id, status).await?;
    Ok(Json(SurveyUpdated {
        message: "Survey status updated",
        survey,
    }))
}
