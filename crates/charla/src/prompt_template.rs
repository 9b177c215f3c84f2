use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

pub const DEFAULT_LANGUAGE: &str = "español";

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

#[derive(Debug, Serialize)]
struct SystemContext<'a> {
    language: &'a str,
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render the system prompt for replies in `language`
pub fn system_prompt(language: &str) -> Result<String, TeraError> {
    let prompt = load_prompt(SYSTEM_TEMPLATE, &SystemContext { language })?;
    Ok(prompt.trim_end().to_string())
}
