mod config;
mod image;
mod llm;
mod pipeline;
mod prompts;
mod setup;
mod state;

use anyhow::Result;
use config::Config;
use pipeline::Pipeline;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' is valid YAML if present.");
            return Err(e);
        }
    };

    config.resolve_credentials()?;

    let query = setup::resolve_query(&config)?;

    let llm: Arc<dyn llm::LlmClient> = Arc::from(llm::create_llm(&config)?);
    let image_client = image::create_image_client(&config)?;

    let pipeline = Pipeline::new(llm, image_client, &config.output_file);
    pipeline.run(&query).await?;

    Ok(())
}
