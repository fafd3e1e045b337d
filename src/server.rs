//! HTTP server for the chat surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Start a new session (redirects to `/chat/{id}`) |
//! | `GET`  | `/chat/{id}` | Render the session's history |
//! | `POST` | `/chat/{id}` | Ask a question (form field `question`) |
//! | `GET`  | `/health` | Phase and version as JSON |
//!
//! # Phases
//!
//! Without an API key the server stays in the halted phase and every page
//! shows only the missing-key message. Otherwise the index is built in the
//! background at startup; pages show a self-refreshing "initialising"
//! notice until it is ready, or a terminal error page if the build failed.
//!
//! The free-text box and the six preset buttons post the same form, so both
//! go through [`handle_ask`].

use anyhow::Result;
use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::citation::citations_for;
use crate::config::{load_api_key, Config, ConfigError};
use crate::embedding::{EmbeddingProvider, OpenAIEmbeddings};
use crate::indexer::{build_index, IndexCache, IndexState};
use crate::llm::{ChatModel, OpenAIChat};
use crate::rag::answer_question;
use crate::session::{ChatRole, SessionStore};
use crate::store::VectorIndex;
use crate::ui::{self, TurnOutcome};

/// External services plus the index built with them.
pub struct Services {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatModel>,
    pub index: IndexCache,
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    /// `None` when no API key was found.
    services: Option<Arc<Services>>,
    sessions: Arc<SessionStore>,
}

impl AppState {
    /// State for a server that has no credential and must not show the chat.
    pub fn halted(config: Config) -> Self {
        Self {
            sessions: Arc::new(session_store(&config)),
            config: Arc::new(config),
            services: None,
        }
    }

    pub fn new(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            sessions: Arc::new(session_store(&config)),
            config: Arc::new(config),
            services: Some(Arc::new(Services {
                embedder,
                chat,
                index: IndexCache::new(),
            })),
        }
    }

    /// Build the state from the environment: OpenAI clients when
    /// `OPENAI_API_KEY` is available, the halted state otherwise.
    pub fn from_env(config: Config) -> Result<Self> {
        match load_api_key() {
            Ok(api_key) => {
                let embedder = Arc::new(OpenAIEmbeddings::new(&config, &api_key)?);
                let chat = Arc::new(OpenAIChat::new(&config, &api_key)?);
                tracing::info!(
                    embedding_model = embedder.model_name(),
                    chat_model = chat.model_name(),
                    "OpenAI credential found"
                );
                Ok(Self::new(config, embedder, chat))
            }
            Err(ConfigError::MissingApiKey) => {
                tracing::error!("OPENAI_API_KEY missing; serving the error page only");
                Ok(Self::halted(config))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn services(&self) -> Option<&Arc<Services>> {
        self.services.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Kick off the index build in the background if it has not run yet.
    pub fn start_indexing(&self) {
        let Some(services) = self.services.as_ref() else {
            return;
        };
        if !matches!(services.index.state(), IndexState::NotBuilt) {
            return;
        }
        let state = self.clone();
        tokio::spawn(async move {
            let _ = state.wait_for_index().await;
        });
    }

    /// Wait for the index, building it if needed.
    pub async fn wait_for_index(&self) -> Result<Arc<VectorIndex>, String> {
        let services = self
            .services
            .clone()
            .ok_or_else(|| ConfigError::MissingApiKey.to_string())?;
        let config = self.config.clone();
        let embedder = services.embedder.clone();
        services
            .index
            .get_or_build(|| async move { build_index(&config, embedder.as_ref()).await })
            .await
    }
}

fn session_store(config: &Config) -> SessionStore {
    SessionStore::with_limits(
        Duration::from_secs(config.server.session_ttl_secs),
        config.server.max_sessions,
    )
}

/// Starts the HTTP server on `[server].bind` and runs until the process ends.
pub async fn run_server(config: &Config) -> Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::from_env(config.clone())?;
    state.start_indexing();

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("SPO assistant listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_new_session))
        .route("/chat/{id}", get(handle_show).post(handle_ask))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Either the ready index or the page to show instead of the chat.
enum Gate {
    Ready(Arc<Services>, Arc<VectorIndex>),
    Blocked(Response),
}

fn gate(state: &AppState) -> Gate {
    let Some(services) = state.services.clone() else {
        return Gate::Blocked(
            (StatusCode::SERVICE_UNAVAILABLE, Html(ui::render_missing_key())).into_response(),
        );
    };

    match services.index.state() {
        IndexState::Ready(index) => Gate::Ready(services, index),
        IndexState::Failed(message) => Gate::Blocked(
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(ui::render_index_failed(&message)),
            )
                .into_response(),
        ),
        IndexState::NotBuilt => {
            state.start_indexing();
            Gate::Blocked(Html(ui::render_indexing()).into_response())
        }
        IndexState::Building => Gate::Blocked(Html(ui::render_indexing()).into_response()),
    }
}

fn parse_session_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

// ============ GET / ============

async fn handle_new_session() -> Redirect {
    Redirect::to(&format!("/chat/{}", Uuid::new_v4()))
}

// ============ GET /chat/{id} ============

async fn handle_show(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let Some(id) = parse_session_id(&raw_id) else {
        return Redirect::to("/").into_response();
    };
    match gate(&state) {
        Gate::Blocked(response) => response,
        Gate::Ready(..) => {
            Html(ui::render_chat(id, &state.sessions.history(id), None)).into_response()
        }
    }
}

// ============ POST /chat/{id} ============

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(form): Form<AskForm>,
) -> Response {
    let Some(id) = parse_session_id(&raw_id) else {
        return Redirect::to("/").into_response();
    };
    let (services, index) = match gate(&state) {
        Gate::Blocked(response) => return response,
        Gate::Ready(services, index) => (services, index),
    };

    let question = form.question.trim();
    if question.is_empty() {
        return Html(ui::render_chat(id, &state.sessions.history(id), None)).into_response();
    }

    // Held until the answer is stored, so a second post to this session
    // waits instead of interleaving its turns.
    let turn_lock = state.sessions.turn_lock(id);
    let _turn = turn_lock.lock().await;

    state.sessions.append(id, ChatRole::User, question);

    let outcome = match answer_question(
        question,
        &index,
        services.embedder.as_ref(),
        services.chat.as_ref(),
        state.config.retrieval.top_k,
    )
    .await
    {
        Ok(result) => {
            state
                .sessions
                .append(id, ChatRole::Assistant, &result.answer);
            TurnOutcome::Answered {
                citations: citations_for(&result.context),
            }
        }
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::warn!(session = %id, "answering failed: {}", message);
            TurnOutcome::Failed { message }
        }
    };

    let history = state.sessions.history(id);
    Html(ui::render_chat(id, &history, Some(&outcome))).into_response()
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    phase: &'static str,
    version: &'static str,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let phase = match state.services.as_ref().map(|s| s.index.state()) {
        None => "halted",
        Some(IndexState::NotBuilt) | Some(IndexState::Building) => "indexing",
        Some(IndexState::Ready(_)) => "ready",
        Some(IndexState::Failed(_)) => "failed",
    };
    Json(HealthResponse {
        status: "ok",
        phase,
        version: env!("CARGO_PKG_VERSION"),
    })
}
