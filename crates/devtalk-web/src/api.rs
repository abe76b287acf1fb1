//! Chat API types and handlers
//!
//! Serves the chat page and the JSON endpoints it calls.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post, put},
};
use devtalk_core::{ChatEngine, Session, SessionManager, SubmitOutcome, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::{Result, WebError};

/// Notice shown when every generation attempt failed
pub const GENERATION_FAILED_NOTICE: &str = "Failed to generate a response after multiple attempts.";

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Live conversation sessions
    pub sessions: Arc<SessionManager>,
    /// Prompt/response engine
    pub engine: Arc<ChatEngine>,
}

impl AppState {
    /// Create a new app state
    pub fn new(sessions: Arc<SessionManager>, engine: Arc<ChatEngine>) -> Self {
        Self { sessions, engine }
    }
}

/// Session snapshot rendered by the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub persona: String,
    pub temperature: f32,
    pub history: Vec<Turn>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            persona: session.persona().to_string(),
            temperature: session.temperature(),
            history: session.history().to_vec(),
        }
    }
}

/// Settings update payload; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsRequest {
    pub persona: Option<String>,
    pub temperature: Option<f32>,
}

/// New user message payload
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// Reply to a posted message
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// Session after the submit
    pub session: SessionView,
    /// What the submit did, with per-attempt warnings
    pub outcome: SubmitOutcome,
    /// User-visible error notice, set when the fallback reply was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Create the chat router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(chat_index))
        .route("/api/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/settings", put(update_settings))
        .route("/api/sessions/{id}/messages", post(post_message))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Chat page
async fn chat_index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "devtalk"
    }))
}

/// Start a new conversation
async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let handle = state.sessions.create().await;
    let session = handle.lock().await;
    (StatusCode::CREATED, Json(SessionView::from(&*session)))
}

/// Get a conversation
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>> {
    let handle = state.sessions.get(&id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

/// Update persona and/or temperature
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<SessionView>> {
    let handle = state.sessions.get(&id).await?;
    let mut session = handle.lock().await;

    if let Some(persona) = req.persona {
        session.set_persona(persona);
    }
    if let Some(temperature) = req.temperature {
        session.set_temperature(temperature);
    }

    debug!(
        "Updated settings for session {}: temperature={}",
        session.id,
        session.temperature()
    );

    Ok(Json(SessionView::from(&*session)))
}

/// Submit a user message and wait for the assistant turn
async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<ChatReply>> {
    let handle = state.sessions.get(&id).await?;
    let engine = Arc::clone(&state.engine);

    // Generation runs to completion even if the client goes away. The owned
    // guard keeps one message at a time per conversation.
    let task = tokio::spawn(async move {
        let mut session = handle.lock_owned().await;
        let outcome = engine.submit(&mut session, &req.message).await;

        if !matches!(outcome, SubmitOutcome::Ignored) {
            info!(
                "Session {}: {} turns after submit ({} attempts)",
                session.id,
                session.turn_count(),
                outcome.attempts()
            );
        }

        (SessionView::from(&*session), outcome)
    });

    let (session, outcome) = task
        .await
        .map_err(|e| WebError::ServerError(format!("Generation task failed: {}", e)))?;

    let error = outcome
        .is_fallback()
        .then(|| GENERATION_FAILED_NOTICE.to_string());

    Ok(Json(ChatReply {
        session,
        outcome,
        error,
    }))
}

/// Chat page
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="apple-mobile-web-app-capable" content="yes">
    <meta name="apple-mobile-web-app-status-bar-style" content="black">
    <meta name="apple-mobile-web-app-title" content="DevTalk">
    <title>Dev</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            background-color: #f5f7fa;
            font-family: 'Segoe UI', sans-serif;
            color: #212121;
            display: flex;
            min-height: 100vh;
        }
        aside {
            width: 300px;
            background: #ffffff;
            border-right: 1px solid #e3e6eb;
            padding: 2rem 1.2rem;
        }
        aside h2 { font-size: 1.1rem; margin-bottom: 1rem; }
        aside h3 { font-size: 0.95rem; margin: 1rem 0 0.5rem; }
        aside textarea {
            width: 100%;
            height: 150px;
            border: 1px solid #d3d3d3;
            border-radius: 10px;
            padding: 10px;
            font: inherit;
            font-size: 14px;
        }
        aside input[type="range"] { width: 100%; }
        .info {
            margin-top: 0.8rem;
            background: #e8f1fb;
            border-radius: 8px;
            padding: 0.6rem;
            font-size: 14px;
        }
        main { flex: 1; padding: 2rem; max-width: 960px; }
        h1 { font-size: 2rem; }
        h4 { margin-bottom: 2rem; font-weight: 500; color: #555; }
        hr { border: none; border-top: 1px solid #e3e6eb; margin: 1rem 0; }
        .chat-message {
            background-color: #ffffff;
            border-radius: 14px;
            padding: 1.2rem;
            margin-bottom: 1rem;
            box-shadow: 0 4px 12px rgba(0,0,0,0.05);
            font-size: 16px;
            line-height: 1.6;
        }
        .chat-user { color: #000; font-weight: 600; margin-bottom: 8px; display: block; }
        .chat-ai { color: #006699; font-weight: 600; margin-bottom: 8px; display: block; }
        .message-content { margin-top: 6px; white-space: pre-wrap; }
        form { display: flex; gap: 10px; flex-wrap: wrap; }
        form input[type="text"] {
            flex: 1;
            background-color: #fff;
            border: 1px solid #d3d3d3;
            border-radius: 10px;
            padding: 12px;
            font-size: 16px;
        }
        form button {
            background: linear-gradient(to right, #4CAF50, #2E8B57);
            color: white;
            padding: 0.6rem 1.4rem;
            border: none;
            border-radius: 10px;
            font-size: 1rem;
            font-weight: 500;
            cursor: pointer;
        }
        form button:hover { background: #2E8B57; }
        form button:disabled { opacity: 0.5; cursor: wait; }
        .notice { border-radius: 8px; padding: 0.6rem 0.8rem; margin-bottom: 0.6rem; font-size: 14px; }
        .notice-warning { background: #fff4e5; color: #8a5300; }
        .notice-error { background: #fdecea; color: #8b1a10; }
        #spinner { display: none; margin: 0.5rem 0; color: #555; }
    </style>
</head>
<body>
    <aside>
        <h2>🧠 AI Configuration</h2>
        <h3>Personality</h3>
        <label for="persona">Edit personality:</label>
        <textarea id="persona"></textarea>
        <h3>Temperature</h3>
        <label for="temperature">Adjust temperature:</label>
        <input type="range" id="temperature" min="0.1" max="1.0" step="0.1"
               title="Higher values make output more random, lower values more deterministic">
        <div class="info">🌡️ Current temperature: <strong id="temperature-value">-</strong></div>
    </aside>
    <main>
        <h1>DevTalk</h1>
        <h4>Your secrets are safe with me.</h4>
        <hr>
        <h3>💬 Conversation</h3>
        <div id="conversation"></div>
        <hr>
        <div id="notices"></div>
        <div id="spinner">Thinking...</div>
        <form id="chat-form" autocomplete="off">
            <input type="text" id="input" placeholder="Enter your message:">
            <button type="submit" id="send">Send</button>
        </form>
    </main>
    <script>
        const STORAGE_KEY = 'devtalk-session';
        let sessionId = null;

        function notice(kind, text) {
            const div = document.createElement('div');
            div.className = 'notice notice-' + kind;
            div.textContent = text;
            document.getElementById('notices').appendChild(div);
        }

        function render(session) {
            sessionId = session.id;
            localStorage.setItem(STORAGE_KEY, session.id);

            const persona = document.getElementById('persona');
            if (document.activeElement !== persona) persona.value = session.persona;
            document.getElementById('temperature').value = session.temperature;
            document.getElementById('temperature-value').textContent = session.temperature.toFixed(1);

            const conversation = document.getElementById('conversation');
            conversation.replaceChildren();
            for (const turn of session.history) {
                const card = document.createElement('div');
                card.className = 'chat-message';
                const label = document.createElement('span');
                label.className = turn.role === 'user' ? 'chat-user' : 'chat-ai';
                label.textContent = (turn.role === 'user' ? '👤 You' : '🤖 AI') + ':';
                const content = document.createElement('div');
                content.className = 'message-content';
                content.textContent = turn.content;
                card.append(label, content);
                conversation.appendChild(card);
            }
        }

        async function newSession() {
            const res = await fetch('/api/sessions', { method: 'POST' });
            if (!res.ok) throw new Error('failed to create session');
            render(await res.json());
        }

        async function loadSession() {
            const stored = localStorage.getItem(STORAGE_KEY);
            if (stored) {
                const res = await fetch('/api/sessions/' + encodeURIComponent(stored));
                if (res.ok) {
                    render(await res.json());
                    return;
                }
            }
            await newSession();
        }

        async function saveSettings(settings) {
            const res = await fetch('/api/sessions/' + encodeURIComponent(sessionId) + '/settings', {
                method: 'PUT',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(settings)
            });
            if (res.status === 404) {
                await newSession();
                return saveSettings(settings);
            }
            if (res.ok) render(await res.json());
        }

        async function send(message) {
            const res = await fetch('/api/sessions/' + encodeURIComponent(sessionId) + '/messages', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ message })
            });
            if (res.status === 404) {
                notice('warning', 'Your previous conversation has expired; starting a new one.');
                await newSession();
                return send(message);
            }
            const body = await res.json();
            if (!res.ok) {
                notice('error', body.error || 'Request failed.');
                return;
            }
            for (const warning of body.outcome.warnings || []) notice('warning', warning);
            if (body.error) notice('error', body.error);
            render(body.session);
        }

        document.getElementById('persona').addEventListener('change', (e) => {
            saveSettings({ persona: e.target.value });
        });
        document.getElementById('temperature').addEventListener('input', (e) => {
            document.getElementById('temperature-value').textContent = Number(e.target.value).toFixed(1);
        });
        document.getElementById('temperature').addEventListener('change', (e) => {
            saveSettings({ temperature: Number(e.target.value) });
        });

        document.getElementById('chat-form').addEventListener('submit', async (e) => {
            e.preventDefault();
            const input = document.getElementById('input');
            const button = document.getElementById('send');
            const message = input.value;
            if (!message.trim()) return;

            document.getElementById('notices').replaceChildren();
            input.disabled = true;
            button.disabled = true;
            document.getElementById('spinner').style.display = 'block';
            try {
                await send(message);
                input.value = '';
            } catch (err) {
                notice('error', 'Request failed: ' + err.message);
            } finally {
                input.disabled = false;
                button.disabled = false;
                document.getElementById('spinner').style.display = 'none';
                input.focus();
            }
        });

        loadSession().catch((err) => notice('error', 'Could not start a session: ' + err.message));
    </script>
</body>
</html>
"#;
