use anyhow::Result;
use charla::{
    agent::Agent,
    models::history::HistoryEntry,
    providers::configs::OpenAiProviderConfig,
    tools::{
        dispatcher::ToolDispatcher,
        notes::{NoteStore, NotesConfig},
        registry::ToolRegistry,
        weather::{WeatherClient, WeatherConfig},
    },
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches chat completion requests whose last message has the given role
struct LastMessageRole(&'static str);

impl Match for LastMessageRole {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| {
                let last = body["messages"].as_array()?.last()?.clone();
                Some(last["role"] == self.0)
            })
            .unwrap_or(false)
    }
}

fn tool_call(id: &str, name: &str, arguments: Value) -> Value {
    json!({
        "id": id,
        "type": "function",
        "function": {"name": name, "arguments": arguments.to_string()}
    })
}

async fn build_agent(server: &MockServer, notes_dir: &std::path::Path) -> Result<Agent> {
    let mut llm = OpenAiProviderConfig::new(
        format!("{}/v1", server.uri()),
        "gpt-4o-mini",
        Some("test-key".to_string()),
    );
    llm.rate_limit_backoff = Duration::from_millis(10);
    llm.transport_backoff = Duration::from_millis(10);

    let weather = WeatherClient::new(WeatherConfig {
        geocoding_url: format!("{}/geo/search", server.uri()),
        forecast_url: format!("{}/geo/forecast", server.uri()),
        timeout: Duration::from_secs(5),
    })?;
    let notes = NoteStore::open(&NotesConfig {
        db_path: notes_dir.join("charla.db"),
    })?;

    let dispatcher = ToolDispatcher::new(ToolRegistry::builtin(weather, notes));
    Agent::from_config(llm, dispatcher, "español")
}

#[tokio::test]
async fn test_ask_runs_tools_against_live_collaborators() -> Result<()> {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(LastMessageRole("user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        tool_call("call_calc", "calc", json!({"expr": "12*(3+4)"})),
                        tool_call("call_clima", "clima", json!({"city": "Córdoba, AR"})),
                        tool_call("call_nota", "notas_agregar", json!({"text": "llevar paraguas"}))
                    ]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(LastMessageRole("tool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Son 84 y hace 18 °C."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/geo/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"name": "Córdoba", "latitude": -31.41, "longitude": -64.18,
                         "country_code": "AR", "admin1": "Córdoba"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/geo/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hourly": {"temperature_2m": [18.0, 18.5, 19.0]}
        })))
        .mount(&server)
        .await;

    let agent = build_agent(&server, dir.path()).await?;
    let history = vec![HistoryEntry::new("user", "hola"), HistoryEntry::new("assistant", "¡Hola!")];

    let reply = agent
        .ask(&history, "¿cuánto es 12*(3+4)? ¿y el clima en Córdoba? anotá llevar paraguas")
        .await;
    assert_eq!(reply, "Son 84 y hace 18 °C.");

    let requests: Vec<Value> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/v1/chat/completions")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(requests.len(), 2);

    let first = &requests[0];
    assert_eq!(first["model"], "gpt-4o-mini");
    assert_eq!(first["tool_choice"], "auto");
    assert_eq!(first["tools"].as_array().unwrap().len(), 5);
    assert_eq!(first["messages"][0]["role"], "system");
    assert_eq!(first["messages"].as_array().unwrap().len(), 4);

    let messages = requests[1]["messages"].as_array().unwrap();
    let tool_messages: Vec<&Value> = messages.iter().filter(|m| m["role"] == "tool").collect();
    assert_eq!(tool_messages.len(), 3);

    assert_eq!(tool_messages[0]["tool_call_id"], "call_calc");
    assert_eq!(tool_messages[0]["content"], r#"{"result":84}"#);

    assert_eq!(tool_messages[1]["name"], "clima");
    let weather: Value = serde_json::from_str(tool_messages[1]["content"].as_str().unwrap())?;
    assert_eq!(
        weather,
        json!({"city": "Córdoba, Córdoba, AR", "next_hours_c": [18.0, 18.5, 19.0]})
    );

    assert_eq!(tool_messages[2]["content"], r#"{"status":"Nota guardada."}"#);

    let echo = &messages[messages.len() - 4];
    assert_eq!(echo["role"], "assistant");
    assert!(echo["content"].is_null());
    assert_eq!(echo["tool_calls"].as_array().unwrap().len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_ask_reports_exhausted_rate_limit() -> Result<()> {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&server)
        .await;

    let agent = build_agent(&server, dir.path()).await?;
    let reply = agent.ask(&[], "Hola").await;

    assert_eq!(
        reply,
        "⚠️ Error al llamar al modelo: LLM HTTP 429: slow down\n\
         Revisá CHARLA_LLM__API_KEY / CHARLA_LLM__MODEL / CHARLA_LLM__BASE_URL."
    );
    Ok(())
}
