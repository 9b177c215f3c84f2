use axum::{response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};

pub const GREETING: &str = "Hola! Soy Charla, tu bot IA + tools 🚀";

#[derive(Debug, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

async fn api_home() -> Json<Greeting> {
    Json(Greeting {
        message: GREETING.to_string(),
    })
}

pub fn routes() -> Router {
    Router::new().route("/api", get(api_home))
}
