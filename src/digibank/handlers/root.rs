use crate::onboarding::Step;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Home {
    name: String,
    version: String,
    signup: String,
    login: String,
    chatbot: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner and entry points", body = Home)
    ),
    tag = "onboarding"
)]
pub async fn root() -> impl IntoResponse {
    Json(Home {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        signup: "/signup".to_string(),
        login: Step::Login.path().to_string(),
        chatbot: "/chatbot".to_string(),
    })
}
