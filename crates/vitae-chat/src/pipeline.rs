//! Query pipeline: retrieval, prompt assembly, and streamed answers.
//!
//! [`RagPipeline`] owns the profile, the retriever, and a completion
//! provider. Indexing failures are recorded but not fatal: queries then
//! run in degraded mode, answering from the persona alone.

use std::sync::{Arc, Mutex, PoisonError};

use async_stream::try_stream;
use futures::StreamExt;
use vitae_core::{ProfileDocument, Result, VitaeConfig};
use vitae_index::chunker::chunk_profile;
use vitae_index::embedding::{EmbeddingClient, EmbeddingProvider};
use vitae_index::search::Retriever;

use crate::completion::{self, CompletionProvider, CompletionStream};
use crate::prompt;

/// Lifecycle of the profile index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// No indexing attempt has been made yet.
    NotIndexed,
    /// An indexing run is in progress.
    Indexing,
    /// The profile is indexed and searchable.
    Indexed,
    /// The last indexing run failed; queries fall back to the persona.
    IndexingFailed,
}

/// Orchestrates the full answer path: chunk the profile, index it, and
/// turn questions into streamed completions grounded in the retrieved
/// passages.
///
/// # Examples
///
/// ```no_run
/// use vitae_core::{ProfileDocument, VitaeConfig};
/// use vitae_chat::pipeline::RagPipeline;
///
/// # async fn example() -> vitae_core::Result<()> {
/// let profile = ProfileDocument::from_json(r#"{"summary": "Engineer."}"#)?;
/// let config = VitaeConfig::from_file("vitae.toml".as_ref())?;
/// let pipeline = RagPipeline::from_config(profile, &config)?;
///
/// pipeline.index_document().await?;
/// let answer = pipeline.answer_query("Where do you work?").await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
pub struct RagPipeline {
    profile: Arc<ProfileDocument>,
    retriever: Arc<Retriever>,
    completions: Arc<dyn CompletionProvider>,
    state: Mutex<IndexState>,
    top_k: usize,
}

impl RagPipeline {
    /// Create a pipeline from explicit providers.
    pub fn new(
        profile: ProfileDocument,
        embeddings: Arc<dyn EmbeddingProvider>,
        completions: Arc<dyn CompletionProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            profile: Arc::new(profile),
            retriever: Arc::new(Retriever::new(embeddings)),
            completions,
            state: Mutex::new(IndexState::NotIndexed),
            top_k,
        }
    }

    /// Create a pipeline with the providers named in the config.
    ///
    /// # Errors
    ///
    /// Returns [`vitae_core::VitaeError::Config`] if a provider name is
    /// unknown or an API key is missing.
    pub fn from_config(profile: ProfileDocument, config: &VitaeConfig) -> Result<Self> {
        let embeddings: Arc<dyn EmbeddingProvider> =
            Arc::new(EmbeddingClient::with_config(&config.embedding)?);
        let completions = completion::provider_from_config(&config.completion)?;
        Ok(Self::new(
            profile,
            embeddings,
            completions,
            config.retrieval.top_k,
        ))
    }

    /// The profile this pipeline answers questions about.
    pub fn profile(&self) -> &ProfileDocument {
        &self.profile
    }

    /// Chunk the profile, embed every chunk, and fill the index.
    ///
    /// Returns the number of chunks indexed. On failure the pipeline
    /// stays usable: the state moves to [`IndexState::IndexingFailed`]
    /// and queries answer in degraded mode.
    ///
    /// # Errors
    ///
    /// Returns [`vitae_core::VitaeError::Provider`] if embedding fails.
    pub async fn index_document(&self) -> Result<usize> {
        self.set_state(IndexState::Indexing);

        let chunks = chunk_profile(&self.profile);
        tracing::info!(chunks = chunks.len(), "indexing profile document");

        match self.retriever.index_chunks(chunks).await {
            Ok(count) => {
                self.set_state(IndexState::Indexed);
                Ok(count)
            }
            Err(e) => {
                self.set_state(IndexState::IndexingFailed);
                tracing::warn!(error = %e, "indexing failed; queries fall back to the persona");
                Err(e)
            }
        }
    }

    /// Clear the index and rebuild it from the current profile.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`index_document`](Self::index_document).
    pub async fn reindex(&self) -> Result<usize> {
        self.retriever.store().clear();
        self.index_document().await
    }

    /// Answer a question as a stream of text fragments.
    ///
    /// Retrieves the closest profile passages and grounds the
    /// completion in them. When nothing is indexed or nothing matches,
    /// the question is answered from the persona alone, with the user
    /// message annotated so the model knows retrieval came up empty.
    /// Any failure along the way arrives as an `Err` item in the
    /// stream; dropping the stream abandons the completion.
    pub fn process_query(&self, question: &str) -> CompletionStream {
        let question = question.to_string();
        let profile = Arc::clone(&self.profile);
        let retriever = Arc::clone(&self.retriever);
        let completions = Arc::clone(&self.completions);
        let top_k = self.top_k;

        Box::pin(try_stream! {
            let hits = if retriever.store().is_empty() {
                Vec::new()
            } else {
                retriever.search_by_text(&question, top_k).await?
            };

            let (system_prompt, user_message) = if hits.is_empty() {
                tracing::debug!("no retrieval context; answering from the persona alone");
                (
                    prompt::fallback_system_prompt(&profile),
                    prompt::fallback_user_message(&question),
                )
            } else {
                tracing::debug!(hits = hits.len(), "answering with retrieved context");
                (
                    prompt::grounded_system_prompt(&profile, &hits),
                    question.clone(),
                )
            };

            let mut completion = completions
                .stream_complete(&system_prompt, &user_message)
                .await?;
            while let Some(fragment) = completion.next().await {
                yield fragment?;
            }
        })
    }

    /// Answer a question and collect the full streamed response.
    ///
    /// # Errors
    ///
    /// Returns the first error the underlying stream produces.
    pub async fn answer_query(&self, question: &str) -> Result<String> {
        let mut stream = self.process_query(question);
        let mut answer = String::new();
        while let Some(fragment) = stream.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }

    /// Number of chunks currently in the index.
    pub fn index_size(&self) -> usize {
        self.retriever.store().len()
    }

    /// Current index lifecycle state.
    pub fn index_state(&self) -> IndexState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: IndexState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use vitae_core::VitaeError;

    use super::*;

    /// Maps topic words to axis-aligned vectors for predictable search.
    struct KeywordEmbedder;

    fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v = vec![0.0f32; 3];
        if lower.contains("work") || lower.contains("company") {
            v[0] = 1.0;
        }
        if lower.contains("school") || lower.contains("education") {
            v[1] = 1.0;
        }
        if lower.contains("rust") || lower.contains("skills") {
            v[2] = 1.0;
        }
        if v.iter().all(|&x| x == 0.0) {
            v = vec![0.1, 0.1, 0.1];
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        fn model(&self) -> &str {
            "keyword-test"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vector_for(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vector_for(t)).collect())
        }
    }

    /// Fails every call, for exercising the degraded path.
    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model(&self) -> &str {
            "failing-test"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(VitaeError::Provider("embedding backend down".into()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(VitaeError::Provider("embedding backend down".into()))
        }
    }

    /// Streams both prompts back so tests can inspect prompt routing.
    struct EchoCompleter;

    #[async_trait]
    impl CompletionProvider for EchoCompleter {
        fn model(&self) -> &str {
            "echo-test"
        }

        async fn stream_complete(
            &self,
            system_prompt: &str,
            user_message: &str,
        ) -> Result<CompletionStream> {
            let system = system_prompt.to_string();
            let user = user_message.to_string();
            let stream: CompletionStream = Box::pin(try_stream! {
                yield format!("SYSTEM::{system}");
                yield format!("\nUSER::{user}");
            });
            Ok(stream)
        }
    }

    struct FailingCompleter;

    #[async_trait]
    impl CompletionProvider for FailingCompleter {
        fn model(&self) -> &str {
            "failing-test"
        }

        async fn stream_complete(&self, _system: &str, _user: &str) -> Result<CompletionStream> {
            Err(VitaeError::Provider("completion backend down".into()))
        }
    }

    fn profile() -> ProfileDocument {
        ProfileDocument::from_json(
            r#"{
                "personalInfo": {"name": "Ada", "title": "Architect", "company": "Acme", "location": "Lyon"},
                "summary": "Architect with a storage background.",
                "experience": [{
                    "title": "Architect",
                    "company": "Acme",
                    "location": "Lyon",
                    "current": true,
                    "startDate": "2021",
                    "description": "Runs the platform group."
                }]
            }"#,
        )
        .unwrap()
    }

    fn pipeline(
        embeddings: Arc<dyn EmbeddingProvider>,
        completions: Arc<dyn CompletionProvider>,
    ) -> RagPipeline {
        RagPipeline::new(profile(), embeddings, completions, 5)
    }

    #[tokio::test]
    async fn indexing_fills_the_store_and_marks_indexed() {
        let pipeline = pipeline(Arc::new(KeywordEmbedder), Arc::new(EchoCompleter));
        assert_eq!(pipeline.index_state(), IndexState::NotIndexed);

        let count = pipeline.index_document().await.unwrap();

        // personal + one experience entry
        assert_eq!(count, 2);
        assert_eq!(pipeline.index_size(), 2);
        assert_eq!(pipeline.index_state(), IndexState::Indexed);
    }

    #[tokio::test]
    async fn failed_indexing_is_recorded_but_not_fatal() {
        let pipeline = pipeline(Arc::new(FailingEmbedder), Arc::new(EchoCompleter));

        let err = pipeline.index_document().await.unwrap_err();
        assert!(err.to_string().contains("embedding backend down"));
        assert_eq!(pipeline.index_state(), IndexState::IndexingFailed);
        assert_eq!(pipeline.index_size(), 0);

        // Queries still answer, from the persona alone.
        let answer = pipeline.answer_query("Where do you work?").await.unwrap();
        assert!(answer.contains("No indexed profile information"));
        assert!(answer.contains("no matching information was found"));
    }

    #[tokio::test]
    async fn empty_index_routes_to_fallback_prompts() {
        let pipeline = pipeline(Arc::new(KeywordEmbedder), Arc::new(EchoCompleter));

        let answer = pipeline.answer_query("Where do you work?").await.unwrap();

        assert!(answer.contains("SYSTEM::You are Ada"));
        assert!(answer.contains("No indexed profile information"));
        assert!(answer.contains(
            "USER::Where do you work?\n\n(Note: no matching information was found"
        ));
    }

    #[tokio::test]
    async fn indexed_profile_grounds_the_prompt() {
        let pipeline = pipeline(Arc::new(KeywordEmbedder), Arc::new(EchoCompleter));
        pipeline.index_document().await.unwrap();

        let answer = pipeline.answer_query("Where do you work?").await.unwrap();

        assert!(answer.contains("SYSTEM::You are Ada"));
        assert!(answer.contains("[Score:"), "expected scored context: {answer}");
        assert!(answer.contains("Acme"));
        // The question passes through unannotated.
        assert!(answer.contains("USER::Where do you work?"));
        assert!(!answer.contains("no matching information"));
    }

    #[tokio::test]
    async fn reindex_rebuilds_without_duplicating() {
        let pipeline = pipeline(Arc::new(KeywordEmbedder), Arc::new(EchoCompleter));
        pipeline.index_document().await.unwrap();
        let count = pipeline.reindex().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(pipeline.index_size(), 2);
        assert_eq!(pipeline.index_state(), IndexState::Indexed);
    }

    #[tokio::test]
    async fn completion_failure_propagates_through_the_stream() {
        let pipeline = pipeline(Arc::new(KeywordEmbedder), Arc::new(FailingCompleter));

        let err = pipeline.answer_query("anything").await.unwrap_err();
        assert!(err.to_string().contains("completion backend down"));
    }
}
