use axum::{extract::State, response::Json, routing::post, Router};
use charla::models::history::HistoryEntry;
use charla::tools::calc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::AppState;

const HELP: &str = "Comandos:\n\
    • /calc 12*(3+4)\n\
    • /clima Córdoba, AR\n\
    • /nota comprar cables\n\
    • /notas\n\
    • /nota-borrar 3\n\
    También podés hablar en lenguaje natural.";

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Slash commands answered without the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'a> {
    Calc(&'a str),
    Weather(&'a str),
    NoteAdd(&'a str),
    NoteList,
    NoteDelete(&'a str),
    Help,
}

/// Strip an ASCII `prefix` matched case-insensitively
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

impl<'a> Command<'a> {
    /// Recognize a command in an already trimmed message
    fn parse(text: &'a str) -> Option<Self> {
        if let Some(rest) = strip_prefix_ignore_case(text, "/calc ") {
            return Some(Command::Calc(rest.trim()));
        }
        if let Some(rest) = strip_prefix_ignore_case(text, "/clima ") {
            return Some(Command::Weather(rest.trim()));
        }
        if let Some(rest) = strip_prefix_ignore_case(text, "/nota ") {
            return Some(Command::NoteAdd(rest.trim()));
        }
        if text.eq_ignore_ascii_case("/notas") {
            return Some(Command::NoteList);
        }
        if let Some(rest) = strip_prefix_ignore_case(text, "/nota-borrar ") {
            return Some(Command::NoteDelete(rest.trim()));
        }
        if text.eq_ignore_ascii_case("/ayuda") || text.eq_ignore_ascii_case("/comandos") {
            return Some(Command::Help);
        }
        None
    }
}

async fn run_command(state: &AppState, command: Command<'_>) -> String {
    match command {
        Command::Calc(expr) => match calc::evaluate(expr) {
            Ok(result) => format!("Resultado: {}", result),
            Err(e) => format!("Expresión inválida: {}", e),
        },
        Command::Weather(city) => match state.weather.forecast(city).await {
            Ok(forecast) => format!(
                "Clima para {}: próximas horas {} °C",
                forecast.city,
                forecast.temperatures()
            ),
            Err(e) => format!("Error: {}", e),
        },
        Command::NoteAdd(text) => {
            let text = text.to_string();
            match state.notes.run(move |store| store.add(&text)).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "failed to add note");
                    format!("Error: {}", e)
                }
            }
        }
        Command::NoteList => match state.notes.run(|store| store.list()).await {
            Ok(notes) if notes.is_empty() => "Sin notas aún.".to_string(),
            Ok(notes) => {
                let lines: Vec<String> = notes
                    .iter()
                    .map(|note| format!("- ({}) {}", note.id, note.text))
                    .collect();
                format!("Notas:\n{}", lines.join("\n"))
            }
            Err(e) => {
                warn!(error = %e, "failed to list notes");
                format!("Error: {}", e)
            }
        },
        Command::NoteDelete(raw_id) => match raw_id.parse::<i64>() {
            Ok(id) => match state.notes.run(move |store| store.delete(id)).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "failed to delete note");
                    format!("Error: {}", e)
                }
            },
            Err(_) => "Por favor pasá un ID válido. Ej: /nota-borrar 2".to_string(),
        },
        Command::Help => HELP.to_string(),
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let text = request.message.trim();

    let reply = match Command::parse(text) {
        Some(command) => {
            debug!(?command, "running command");
            run_command(&state, command).await
        }
        None => {
            let history = request.history.as_deref().unwrap_or_default();
            state.agent.ask(history, text).await
        }
    };

    Json(ChatResponse { reply })
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .with_state(state)
}
