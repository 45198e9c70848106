use crate::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use url::Url;

#[async_trait]
pub trait ImageClient: Send + Sync + Debug {
    /// Generates one image for the prompt and returns its remote URL.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Fetches the full image payload. The default goes over plain HTTP.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        download_bytes(url).await
    }
}

pub fn create_image_client(config: &Config) -> Result<Box<dyn ImageClient>> {
    match config.image.provider.as_str() {
        "openai" => {
            let cfg = config
                .image
                .openai
                .as_ref()
                .context("OpenAI image config missing")?;
            let api_key = cfg
                .api_key
                .as_deref()
                .context("OpenAI API key missing; run credential resolution first")?;
            Ok(Box::new(OpenAIImageClient::new(
                api_key,
                &cfg.model,
                cfg.base_url.as_deref(),
                &cfg.size,
                &cfg.quality,
            )))
        }
        _ => Err(anyhow!("Unknown image provider: {}", config.image.provider)),
    }
}

// --- OpenAI Images ---

#[derive(Debug)]
struct OpenAIImageClient {
    api_key: String,
    model: String,
    base_url: String,
    size: String,
    quality: String,
    client: reqwest::Client,
}

impl OpenAIImageClient {
    fn new(api_key: &str, model: &str, base_url: Option<&str>, size: &str, quality: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            size: size.to_string(),
            quality: quality.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    quality: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[async_trait]
impl ImageClient for OpenAIImageClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/images/generations", self.base_url);

        let request_body = ImageRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.size.clone(),
            quality: self.quality.clone(),
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("OpenAI image API error: {}", error_text));
        }

        let result: ImageResponse = resp.json().await?;
        if let Some(first) = result.data.first() {
            if let Some(url) = &first.url {
                return Ok(url.clone());
            }
        }

        Err(anyhow!("OpenAI image response missing an asset URL"))
    }
}

/// Downloads the whole payload into memory so a mid-transfer failure never
/// leaves a partial file behind.
pub async fn download_bytes(url: &Url) -> Result<Vec<u8>> {
    let mut response = reqwest::get(url.as_str())
        .await
        .context("Failed to open image download stream")?;

    if !response.status().is_success() {
        bail!("Image download failed with status {}", response.status());
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut data = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        pb.inc(chunk.len() as u64);
        data.extend_from_slice(&chunk);
    }
    pb.finish_and_clear();

    if data.is_empty() {
        bail!("Image download returned an empty body");
    }

    Ok(data)
}
