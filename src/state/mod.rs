use std::sync::Arc;

use crate::chat::ConversationOrchestrator;
use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{PassageIndex, PineconeIndex};
use crate::session::SessionStore;

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Contains references to:
/// - Configuration and paths
/// - The session store
/// - The conversation pipeline (model provider + vector index)
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub sessions: SessionStore,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub llm_name: String,
    pub index_name: String,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Setting up paths and loading configuration
    /// 2. Checking that model and index credentials are present
    /// 3. Building the OpenAI-compatible provider and the Pinecone index
    /// 4. Wiring the conversation pipeline over a fresh session store
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());

        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        settings
            .require_credentials()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let provider = OpenAiProvider::new(&settings.llm, &settings.embedding)
            .map_err(|e| InitializationError::Llm(e.into()))?;
        let llm_name = format!(
            "{} (chat: {}, embedding: {})",
            provider.name(),
            provider.chat_model(),
            provider.embedding_model()
        );
        let llm: Arc<dyn LlmProvider> = Arc::new(provider);

        let index: Arc<dyn PassageIndex> = Arc::new(
            PineconeIndex::new(&settings.vector_index, llm.clone())
                .map_err(|e| InitializationError::VectorIndex(e.into()))?,
        );

        let mut state = Self::assemble(paths, config, settings, llm, index);
        state.llm_name = llm_name;
        Ok(Arc::new(state))
    }

    /// Builds state around caller-supplied collaborators.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        settings: Settings,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn PassageIndex>,
    ) -> Arc<Self> {
        let config = ConfigService::new(paths.clone());
        Arc::new(Self::assemble(paths, config, settings, llm, index))
    }

    fn assemble(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn PassageIndex>,
    ) -> Self {
        let sessions = SessionStore::new(
            settings.chat_history.max_turns,
            settings.chat_history.max_sessions,
        );
        let llm_name = llm.name().to_string();
        let index_name = index.describe();
        let orchestrator = Arc::new(ConversationOrchestrator::from_settings(
            &settings,
            sessions.clone(),
            llm,
            index,
        ));

        Self {
            paths,
            config,
            settings: Arc::new(settings),
            sessions,
            orchestrator,
            llm_name,
            index_name,
        }
    }
}
