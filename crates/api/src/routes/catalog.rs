//! Disease Catalog Routes

use axum::{extract::State, Json};
use inference_engine::{hygiene_tips as tips_for, GENERAL_TIPS};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HygieneTipsResponse {
    /// Tips per loaded disease class
    pub hygiene_tips: BTreeMap<String, &'static [&'static str]>,
    pub general_tips: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct DiseasesResponse {
    pub diseases: Vec<String>,
    pub count: usize,
}

/// Hygiene tips for every class the model can predict
pub async fn hygiene_tips(State(state): State<Arc<AppState>>) -> Json<HygieneTipsResponse> {
    let hygiene_tips = state
        .scorer
        .artifact()
        .disease_classes()
        .iter()
        .map(|disease| (disease.clone(), tips_for(disease)))
        .collect();

    Json(HygieneTipsResponse {
        hygiene_tips,
        general_tips: &GENERAL_TIPS,
    })
}

/// Disease classes of the loaded model, in model order
pub async fn diseases(State(state): State<Arc<AppState>>) -> Json<DiseasesResponse> {
    let diseases = state.scorer.artifact().disease_classes().to_vec();
    Json(DiseasesResponse {
        count: diseases.len(),
        diseases,
    })
}
