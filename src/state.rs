use serde::{Deserialize, Serialize};

/// Snapshot threaded by value through the pipeline steps. Each step fills
/// exactly one field and leaves everything written before it untouched.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct PipelineState {
    pub query: String,
    pub character_description: String,
    pub plot: String,
    pub image_prompts: Vec<String>,
    pub image_urls: Vec<String>,
}

impl PipelineState {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }
}
