//! The tools the model may call.
//!
//! Every tool has a fixed identifier in [`ToolName`], a typed argument record
//! in [`ToolArgs`] and a handler behind the [`ToolHandler`] capability. The
//! registry maps identifiers to handlers, the dispatcher turns a raw model
//! request into a decoded call and isolates its failures.
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::ToolSchema;

pub mod calc;
pub mod dispatcher;
pub mod notes;
pub mod registry;
pub mod weather;

/// Identifiers of the tools advertised to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, AsRefStr, Display)]
pub enum ToolName {
    #[strum(to_string = "calc")]
    Calc,
    #[strum(to_string = "clima")]
    Weather,
    #[strum(to_string = "notas_agregar")]
    NoteAdd,
    #[strum(to_string = "notas_listar")]
    NoteList,
    #[strum(to_string = "notas_borrar")]
    NoteDelete,
}

impl ToolName {
    /// The schema advertised to the model for this tool
    pub fn schema(&self) -> ToolSchema {
        match self {
            ToolName::Calc => ToolSchema::new(
                self.as_ref(),
                "Calculadora aritmética segura",
                json!({
                    "type": "object",
                    "properties": {
                        "expr": {"type": "string", "description": "expresión, ej 12*(3+4)"}
                    },
                    "required": ["expr"]
                }),
            ),
            ToolName::Weather => ToolSchema::new(
                self.as_ref(),
                "Obtener clima de una ciudad (próximas horas, °C)",
                json!({
                    "type": "object",
                    "properties": {
                        "city": {"type": "string", "description": "ej 'Córdoba, AR'"}
                    },
                    "required": ["city"]
                }),
            ),
            ToolName::NoteAdd => ToolSchema::new(
                self.as_ref(),
                "Agregar una nota de texto",
                json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
            ),
            ToolName::NoteList => ToolSchema::new(
                self.as_ref(),
                "Listar últimas notas",
                json!({"type": "object", "properties": {}}),
            ),
            ToolName::NoteDelete => ToolSchema::new(
                self.as_ref(),
                "Borrar nota por ID",
                json!({
                    "type": "object",
                    "properties": {"note_id": {"type": "integer"}},
                    "required": ["note_id"]
                }),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalcArgs {
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherArgs {
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteAddArgs {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteListArgs {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteDeleteArgs {
    #[serde(deserialize_with = "integer_or_numeric_string")]
    pub note_id: i64,
}

/// Models sometimes quote integers, "3" is accepted where 3 is expected
fn integer_or_numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(value) => Ok(value),
        IntOrString::Str(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got {:?}", text))),
    }
}

/// Decoded, validated arguments of one tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    Calc(CalcArgs),
    Weather(WeatherArgs),
    NoteAdd(NoteAddArgs),
    NoteList,
    NoteDelete(NoteDeleteArgs),
}

impl ToolArgs {
    /// Validate a json mapping against the argument record of `tool`
    pub fn decode(tool: ToolName, arguments: Map<String, Value>) -> ToolResult<Self> {
        let value = Value::Object(arguments);
        let invalid = |e: serde_json::Error| ToolError::invalid_arguments(tool.as_ref(), e);

        Ok(match tool {
            ToolName::Calc => ToolArgs::Calc(serde_json::from_value(value).map_err(invalid)?),
            ToolName::Weather => {
                ToolArgs::Weather(serde_json::from_value(value).map_err(invalid)?)
            }
            ToolName::NoteAdd => {
                ToolArgs::NoteAdd(serde_json::from_value(value).map_err(invalid)?)
            }
            ToolName::NoteList => {
                let _: NoteListArgs = serde_json::from_value(value).map_err(invalid)?;
                ToolArgs::NoteList
            }
            ToolName::NoteDelete => {
                ToolArgs::NoteDelete(serde_json::from_value(value).map_err(invalid)?)
            }
        })
    }

    /// The tool these arguments belong to
    pub fn tool(&self) -> ToolName {
        match self {
            ToolArgs::Calc(_) => ToolName::Calc,
            ToolArgs::Weather(_) => ToolName::Weather,
            ToolArgs::NoteAdd(_) => ToolName::NoteAdd,
            ToolArgs::NoteList => ToolName::NoteList,
            ToolArgs::NoteDelete(_) => ToolName::NoteDelete,
        }
    }

    /// Error for a handler that received arguments of another tool
    pub fn mismatch(&self, handler: &str) -> ToolError {
        ToolError::failed(
            self.tool().as_ref(),
            format!("handler '{}' cannot run this tool", handler),
        )
    }
}

/// Capability shared by every tool implementation
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. The returned value is the structured result shown to
    /// the model; an error is reported to the model instead.
    async fn invoke(&self, args: ToolArgs) -> ToolResult<Value>;
}
