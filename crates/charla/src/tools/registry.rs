use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use super::calc::CalcTool;
use super::notes::{NoteStore, NotesTool};
use super::weather::{WeatherClient, WeatherTool};
use super::{ToolHandler, ToolName};
use crate::models::tool::ToolSchema;

/// Tools available to the model, in the order they are advertised
#[derive(Default)]
pub struct ToolRegistry {
    order: Vec<ToolName>,
    handlers: HashMap<ToolName, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in tools
    pub fn builtin(weather: WeatherClient, notes: NoteStore) -> Self {
        let notes: Arc<dyn ToolHandler> = Arc::new(NotesTool::new(notes));

        let mut registry = Self::new();
        registry.register(ToolName::Calc, Arc::new(CalcTool));
        registry.register(ToolName::Weather, Arc::new(WeatherTool::new(weather)));
        registry.register(ToolName::NoteAdd, notes.clone());
        registry.register(ToolName::NoteList, notes.clone());
        registry.register(ToolName::NoteDelete, notes);
        registry
    }

    /// Bind `name` to `handler`, replacing any previous binding
    pub fn register(&mut self, name: ToolName, handler: Arc<dyn ToolHandler>) {
        if self.handlers.insert(name, handler).is_none() {
            self.order.push(name);
        }
    }

    /// Resolve a wire name to its tool and handler
    pub fn resolve(&self, name: &str) -> Option<(ToolName, Arc<dyn ToolHandler>)> {
        let tool = ToolName::from_str(name).ok()?;
        self.handlers
            .get(&tool)
            .map(|handler| (tool, Arc::clone(handler)))
    }

    /// Schemas of the registered tools, ready to advertise
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order.iter().map(ToolName::schema).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
