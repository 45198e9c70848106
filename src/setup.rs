use crate::config::Config;
use anyhow::Result;
use inquire::Text;

/// Query used when nothing is configured and the prompt is skipped.
pub const DEFAULT_QUERY: &str = "A dog playing with a little ball on a small hill.";

/// Picks the query for this run: configured value first, then an interactive
/// prompt, then the built-in default in unattended mode.
pub fn resolve_query(config: &Config) -> Result<String> {
    if let Some(query) = &config.query {
        return Ok(query.clone());
    }

    if config.unattended {
        return Ok(DEFAULT_QUERY.to_string());
    }

    let answer = Text::new("What should the image show?")
        .with_default(DEFAULT_QUERY)
        .prompt()?;

    let answer = answer.trim();
    if answer.is_empty() {
        Ok(DEFAULT_QUERY.to_string())
    } else {
        Ok(answer.to_string())
    }
}
