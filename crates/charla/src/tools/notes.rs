//! SQLite backed notes for the `notas_*` tools.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{ToolArgs, ToolHandler};
use crate::errors::{ToolError, ToolResult};

pub const DEFAULT_DB_PATH: &str = "charla.db";

/// Notes returned by a listing
const LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct NotesConfig {
    pub db_path: PathBuf,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub text: String,
}

/// Note storage on a single SQLite connection
#[derive(Clone)]
pub struct NoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl NoteStore {
    /// Open or create the store described by `config`
    pub fn open(config: &NotesConfig) -> Result<Self> {
        let path = &config.db_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        Self::with_connection(conn)
    }

    /// A store that lives only as long as the process
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY, text TEXT)",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("notes connection lock poisoned"))?;
        f(&conn)
    }

    /// Store a note, returning the status shown to the user
    pub fn add(&self, text: &str) -> Result<String> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO notes (text) VALUES (?1)", params![text])?;
            Ok("Nota guardada.".to_string())
        })
    }

    /// The latest notes, newest first
    pub fn list(&self) -> Result<Vec<Note>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, text FROM notes ORDER BY id DESC LIMIT ?1")?;
            let notes = stmt
                .query_map(params![LIST_LIMIT as i64], |row| {
                    Ok(Note {
                        id: row.get(0)?,
                        text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    /// Delete a note by id, returning the status shown to the user
    pub fn delete(&self, id: i64) -> Result<String> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
            if removed == 0 {
                Ok("No se encontró ninguna nota con ese ID.".to_string())
            } else {
                Ok(format!("Nota {} eliminada.", id))
            }
        })
    }

    /// Run a store operation on the blocking pool
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&NoteStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .context("note store task failed")?
    }
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore").finish_non_exhaustive()
    }
}

/// Handler for `notas_agregar`, `notas_listar` and `notas_borrar`
pub struct NotesTool {
    store: NoteStore,
}

impl NotesTool {
    pub fn new(store: NoteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for NotesTool {
    async fn invoke(&self, args: ToolArgs) -> ToolResult<Value> {
        let tool = args.tool();
        let result = match args {
            ToolArgs::NoteAdd(args) => self
                .store
                .run(move |store| store.add(&args.text))
                .await
                .map(|status| json!({ "status": status })),
            ToolArgs::NoteList => self
                .store
                .run(|store| store.list())
                .await
                .map(|notes| json!({ "notes": notes })),
            ToolArgs::NoteDelete(args) => self
                .store
                .run(move |store| store.delete(args.note_id))
                .await
                .map(|status| json!({ "status": status })),
            other => return Err(other.mismatch("notas")),
        };
        result.map_err(|e| ToolError::failed(tool.as_ref(), format!("{:#}", e)))
    }
}
