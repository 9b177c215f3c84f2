use anyhow::Result;
use charla::agent::Agent;
use charla::tools::dispatcher::ToolDispatcher;
use charla::tools::notes::NoteStore;
use charla::tools::registry::ToolRegistry;
use charla::tools::weather::WeatherClient;
use std::sync::Arc;

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub weather: WeatherClient,
    pub notes: NoteStore,
}

impl AppState {
    pub fn new(agent: Agent, weather: WeatherClient, notes: NoteStore) -> Self {
        Self {
            agent: Arc::new(agent),
            weather,
            notes,
        }
    }

    /// Open the collaborators described by `settings` and wire them into an
    /// agent. The slash commands share the same weather client and store.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let weather = WeatherClient::new(settings.weather.into_config()?)?;
        let notes = NoteStore::open(&settings.notes.into_config())?;

        let dispatcher = ToolDispatcher::new(ToolRegistry::builtin(weather.clone(), notes.clone()));
        let agent = Agent::from_config(settings.llm.into_config()?, dispatcher, &settings.language)?;

        Ok(Self::new(agent, weather, notes))
    }
}
