use crate::image::ImageClient;
use crate::llm::LlmClient;
use crate::prompts;
use crate::state::PipelineState;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// One unit of work in the fixed chain. Steps consume a state snapshot and
/// return the updated snapshot; they never touch fields written by later
/// steps.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, state: PipelineState) -> Result<PipelineState>;
}

struct CharacterDescriptionStep {
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Step for CharacterDescriptionStep {
    fn name(&self) -> &'static str {
        "character_description"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState> {
        let user = prompts::character_prompt(&state.query);
        state.character_description = self.llm.chat(prompts::CHARACTER_SYSTEM, &user).await?;
        Ok(state)
    }
}

struct PlotDescriptionStep {
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Step for PlotDescriptionStep {
    fn name(&self) -> &'static str {
        "plot_description"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState> {
        let user = prompts::plot_prompt(&state.query, &state.character_description);
        state.plot = self.llm.chat(prompts::PLOT_SYSTEM, &user).await?;
        Ok(state)
    }
}

struct ImagePromptStep {
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Step for ImagePromptStep {
    fn name(&self) -> &'static str {
        "image_prompt"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState> {
        let user = prompts::image_prompt(&state.plot, &state.character_description);
        let prompt = self.llm.chat(prompts::IMAGE_PROMPT_SYSTEM, &user).await?;
        state.image_prompts.push(prompt);
        Ok(state)
    }
}

struct CreateImageStep {
    client: Box<dyn ImageClient>,
    output_file: PathBuf,
}

#[async_trait]
impl Step for CreateImageStep {
    fn name(&self) -> &'static str {
        "create_image"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState> {
        let prompt = match state.image_prompts.last() {
            Some(prompt) => prompt.clone(),
            None => bail!("no image prompt available; the image_prompt step must run first"),
        };

        let url_text = self.client.generate(&prompt).await?;
        let url = Url::parse(&url_text).context("Image service returned an invalid URL")?;
        debug!("generated asset at {}", url);

        let data = self.client.fetch(&url).await?;
        fs::write(&self.output_file, &data)
            .with_context(|| format!("Failed to write image to {}", self.output_file.display()))?;
        println!("Image saved to {}", self.output_file.display());

        state.image_urls.push(url_text);
        Ok(state)
    }
}

pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        image: Box<dyn ImageClient>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(CharacterDescriptionStep { llm: llm.clone() }),
            Box::new(PlotDescriptionStep { llm: llm.clone() }),
            Box::new(ImagePromptStep { llm }),
            Box::new(CreateImageStep {
                client: image,
                output_file: output_file.into(),
            }),
        ];
        Self { steps }
    }

    /// Runs all steps in order, threading the state forward, and prints the
    /// final results. Any step error aborts the run.
    pub async fn run(&self, query: &str) -> Result<PipelineState> {
        let mut state = PipelineState::new(query);

        for step in &self.steps {
            println!("Running step: {}", step.name());
            state = step
                .run(state)
                .await
                .with_context(|| format!("step '{}' failed", step.name()))?;
        }

        print_results(&state);
        Ok(state)
    }
}

fn print_results(state: &PipelineState) {
    println!("Character/Scene Description:");
    println!("{}", state.character_description);

    println!("\nGenerated Plot:");
    println!("{}", state.plot);

    println!("\nImage Prompts:");
    for (i, prompt) in state.image_prompts.iter().enumerate() {
        println!("{}. {}", i + 1, prompt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct MockLlmClient {
        call_count: Arc<Mutex<usize>>,
        fail_on_call: Option<usize>,
    }

    impl MockLlmClient {
        fn new(fail_on_call: Option<usize>) -> Self {
            Self {
                call_count: Arc::new(Mutex::new(0)),
                fail_on_call,
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn chat(&self, _system: &str, user: &str) -> Result<String> {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;

            if Some(*count) == self.fail_on_call {
                return Err(anyhow!("mock service unavailable"));
            }

            if user.contains("main character") {
                Ok("A playful dog, a small golden retriever puppy with floppy ears.".to_string())
            } else if user.contains("single scene") {
                Ok("The puppy chases a red ball up a grassy hill at sunset.".to_string())
            } else {
                Ok("A golden retriever puppy chasing a red ball on a sunlit hill, storybook style."
                    .to_string())
            }
        }
    }

    #[derive(Debug)]
    struct MockImageClient {
        generate_calls: Arc<Mutex<usize>>,
        payload: Vec<u8>,
    }

    impl MockImageClient {
        fn new(payload: &[u8]) -> Self {
            Self {
                generate_calls: Arc::new(Mutex::new(0)),
                payload: payload.to_vec(),
            }
        }
    }

    #[async_trait]
    impl ImageClient for MockImageClient {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            *self.generate_calls.lock().unwrap() += 1;
            Ok("https://images.example.com/generated/abc123.png".to_string())
        }

        async fn fetch(&self, _url: &Url) -> Result<Vec<u8>> {
            Ok(self.payload.clone())
        }
    }

    #[tokio::test]
    async fn test_happy_path_populates_state_and_writes_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output_file = dir.path().join("output.png");

        let llm = MockLlmClient::new(None);
        let llm_calls = llm.call_count.clone();
        let image = MockImageClient::new(b"\x89PNG fake image bytes");
        let generate_calls = image.generate_calls.clone();

        let pipeline = Pipeline::new(Arc::new(llm), Box::new(image), &output_file);
        let state = pipeline
            .run("A dog playing with a little ball on a small hill.")
            .await?;

        assert!(state.character_description.contains("dog"));
        assert!(!state.plot.is_empty());
        assert_eq!(state.image_prompts.len(), 1);
        assert!(!state.image_prompts[0].is_empty());

        assert_eq!(state.image_urls.len(), 1);
        assert!(Url::parse(&state.image_urls[0]).is_ok());

        assert_eq!(*llm_calls.lock().unwrap(), 3);
        assert_eq!(*generate_calls.lock().unwrap(), 1);

        let written = fs::read(&output_file)?;
        assert_eq!(written, b"\x89PNG fake image bytes");
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_on_second_step_aborts_run() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output_file = dir.path().join("output.png");

        let llm = MockLlmClient::new(Some(2));
        let llm_calls = llm.call_count.clone();
        let image = MockImageClient::new(b"unused");
        let generate_calls = image.generate_calls.clone();

        let pipeline = Pipeline::new(Arc::new(llm), Box::new(image), &output_file);
        let err = pipeline
            .run("A dog playing with a little ball on a small hill.")
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("plot_description"));
        assert_eq!(*llm_calls.lock().unwrap(), 2);
        assert_eq!(*generate_calls.lock().unwrap(), 0);
        assert!(!output_file.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_image_without_prompt_fails_before_any_call() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output_file = dir.path().join("output.png");

        let image = MockImageClient::new(b"unused");
        let generate_calls = image.generate_calls.clone();

        let step = CreateImageStep {
            client: Box::new(image),
            output_file: output_file.clone(),
        };

        let err = step
            .run(PipelineState::new("A dog on a hill."))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no image prompt available"));
        assert_eq!(*generate_calls.lock().unwrap(), 0);
        assert!(!output_file.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_image_step_rejects_invalid_url() -> Result<()> {
        #[derive(Debug)]
        struct BadUrlClient;

        #[async_trait]
        impl ImageClient for BadUrlClient {
            async fn generate(&self, _prompt: &str) -> Result<String> {
                Ok("not a url".to_string())
            }
        }

        let dir = tempfile::tempdir()?;
        let output_file = dir.path().join("output.png");

        let step = CreateImageStep {
            client: Box::new(BadUrlClient),
            output_file: output_file.clone(),
        };

        let mut state = PipelineState::new("A dog on a hill.");
        state.image_prompts.push("a dog".to_string());

        let err = step.run(state).await.unwrap_err();
        assert!(format!("{:#}", err).contains("invalid URL"));
        assert!(!output_file.exists());
        Ok(())
    }
}
