//! HTTP Route Handlers

pub mod alerts;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod predict;
pub mod predictions;
pub mod stats;
pub mod surveys;
