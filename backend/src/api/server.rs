//! HTTP server for guest imports.
//!
//! Each import dialog is a server-side session; the client drives it step
//! by step and re-renders from the returned snapshot.
//!
//! # API Endpoints
//!
//! | Method | Path                                   | Description                 |
//! |--------|----------------------------------------|-----------------------------|
//! | GET    | `/health`                              | Health check                |
//! | GET    | `/api/template`                        | Guest template (TSV)        |
//! | POST   | `/api/sessions`                        | Open an import session      |
//! | GET    | `/api/sessions/{id}`                   | Session snapshot            |
//! | DELETE | `/api/sessions/{id}`                   | Close a session             |
//! | POST   | `/api/sessions/{id}/upload`            | Upload a file (multipart)   |
//! | POST   | `/api/sessions/{id}/paste`             | Submit pasted text          |
//! | PUT    | `/api/sessions/{id}/mapping`           | Change mapping / defaults   |
//! | POST   | `/api/sessions/{id}/preview`           | Validate and transform      |
//! | POST   | `/api/sessions/{id}/back`              | Preview → mapping           |
//! | PATCH  | `/api/sessions/{id}/guests/{guest_id}` | Edit one guest field        |
//! | DELETE | `/api/sessions/{id}/guests/{guest_id}` | Remove one guest            |
//! | POST   | `/api/sessions/{id}/submit`            | Import the preview          |
//! | GET    | `/api/logs`                            | SSE stream of import logs   |
//!
//! The session map lock is never held while the importer runs. A session
//! closed during an import simply drops the late result.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, patch, post, put},
    Router,
};
use chrono::Utc;
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration as StdDuration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, log_warning, LOG_BROADCASTER};
use super::types::{GuestUpdateRequest, MappingRequest, PasteRequest, SubmitResponse};
use crate::config::ImportConfig;
use crate::error::{ServerError, ServerResult, SessionError};
use crate::import::{GuestImporter, HttpImporter, ImportSession, SessionOptions, SessionSnapshot};
use crate::models::{GuestField, GuestId};
use crate::ports::GUEST_TEMPLATE;

/// Importers the server can share between requests.
pub trait SharedImporter: GuestImporter + Send + Sync + 'static {}

impl<T: GuestImporter + Send + Sync + 'static> SharedImporter for T {}

/// Shared server state.
pub struct AppState<I> {
    sessions: Arc<Mutex<HashMap<Uuid, ImportSession>>>,
    importer: Arc<I>,
    config: Arc<ImportConfig>,
}

impl<I> Clone for AppState<I> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            importer: Arc::clone(&self.importer),
            config: Arc::clone(&self.config),
        }
    }
}

impl<I: SharedImporter> AppState<I> {
    pub fn new(config: ImportConfig, importer: I) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            importer: Arc::new(importer),
            config: Arc::new(config),
        }
    }

    /// Run `f` on a session under the lock and return its result with a
    /// fresh snapshot.
    async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ImportSession) -> Result<T, SessionError>,
    ) -> ServerResult<(T, SessionSnapshot)> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(ServerError::SessionNotFound(id))?;
        session.touch(Utc::now());

        match f(session) {
            Ok(value) => Ok((value, session.snapshot())),
            Err(e) => Err(ServerError::session(e, session.errors())),
        }
    }
}

/// Build the router.
pub fn router<I: SharedImporter>(state: AppState<I>) -> Router {
    // Permissive CORS for the planner frontend
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    // Multipart framing on top of the file itself
    let body_limit = state.config.max_file_size.saturating_add(64 * 1024);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/template", get(template))
        .route("/api/sessions", post(create_session::<I>))
        .route("/api/sessions/{id}", get(get_session::<I>).delete(close_session::<I>))
        .route("/api/sessions/{id}/upload", post(upload::<I>))
        .route("/api/sessions/{id}/paste", post(paste::<I>))
        .route("/api/sessions/{id}/mapping", put(update_mapping::<I>))
        .route("/api/sessions/{id}/preview", post(preview::<I>))
        .route("/api/sessions/{id}/back", post(back::<I>))
        .route(
            "/api/sessions/{id}/guests/{guest_id}",
            patch(update_guest::<I>).delete(remove_guest::<I>),
        )
        .route("/api/sessions/{id}/submit", post(submit::<I>))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server with the guest API importer.
pub async fn start_server(config: ImportConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let importer = HttpImporter::from_config(&config);

    println!("🚀 Guest import server running on http://localhost:{}", config.port);
    println!("   POST /api/sessions          - Open an import session");
    println!("   GET  /api/template          - Guest template");
    println!("   GET  /api/logs              - SSE log stream");
    println!("   GET  /health                - Health check");
    println!();
    println!("📝 Guests are imported into {}", importer.endpoint());

    let app = router(AppState::new(config, importer));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "guestlist",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn template() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    (
        [(header::CONTENT_TYPE, "text/tab-separated-values; charset=utf-8")],
        GUEST_TEMPLATE,
    )
}

async fn create_session<I: SharedImporter>(State(state): State<AppState<I>>) -> (StatusCode, Json<SessionSnapshot>) {
    let session = ImportSession::new(SessionOptions::from(state.config.as_ref()));
    let snapshot = session.snapshot();

    let mut sessions = state.sessions.lock().await;
    let now = Utc::now();
    let ttl = state.config.session_ttl();
    let before = sessions.len();
    sessions.retain(|_, s| !s.is_expired(now, ttl));
    if sessions.len() < before {
        log_info(format!("Dropped {} expired session(s)", before - sessions.len()));
    }
    sessions.insert(session.id(), session);

    (StatusCode::CREATED, Json(snapshot))
}

async fn get_session<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<SessionSnapshot>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ServerError::SessionNotFound(id))?;
    session.touch(Utc::now());
    Ok(Json(session.snapshot()))
}

async fn close_session<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
) -> ServerResult<StatusCode> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.remove(&id).ok_or(ServerError::SessionNotFound(id))?;
    if session.is_importing() {
        log_warning(format!("Session {} closed while an import is running", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn upload<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ServerResult<Json<SessionSnapshot>> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload.csv").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file = Some((name, bytes.to_vec()));
        }
    }

    let (name, bytes) = file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    let ((), snapshot) = state.with_session(id, |s| s.load_file(&name, &bytes)).await?;
    Ok(Json(snapshot))
}

async fn paste<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PasteRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let ((), snapshot) = state
        .with_session(id, |s| {
            s.set_paste_text(request.text);
            s.load_paste()
        })
        .await?;
    Ok(Json(snapshot))
}

async fn update_mapping<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
    Json(request): Json<MappingRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    if let Some(side) = request.default_side.as_ref().filter(|s| !s.is_known()) {
        return Err(ServerError::BadRequest(format!(
            "Invalid default side: {}. Must be bride, groom, or mutual",
            side
        )));
    }

    let ((), snapshot) = state
        .with_session(id, |s| {
            if let Some(mapping) = request.mapping {
                s.set_mapping(mapping)?;
            }
            if let Some(side) = request.default_side {
                s.set_default_side(side);
            }
            if let Some(event_ids) = request.event_ids {
                s.set_event_ids(event_ids);
            }
            Ok(())
        })
        .await?;
    Ok(Json(snapshot))
}

async fn preview<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<SessionSnapshot>> {
    let (_, snapshot) = state.with_session(id, |s| s.advance_to_preview()).await?;
    Ok(Json(snapshot))
}

async fn back<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<SessionSnapshot>> {
    let ((), snapshot) = state.with_session(id, |s| s.back()).await?;
    Ok(Json(snapshot))
}

async fn update_guest<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path((id, guest_id)): Path<(Uuid, GuestId)>,
    Json(request): Json<GuestUpdateRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let field: GuestField = request
        .field
        .parse()
        .map_err(|e: crate::models::UnknownField| ServerError::BadRequest(e.to_string()))?;

    let ((), snapshot) = state
        .with_session(id, |s| s.update_guest(guest_id, field, request.value))
        .await?;
    Ok(Json(snapshot))
}

async fn remove_guest<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path((id, guest_id)): Path<(Uuid, GuestId)>,
) -> ServerResult<Json<SessionSnapshot>> {
    let (_, snapshot) = state.with_session(id, |s| s.remove_guest(guest_id)).await?;
    Ok(Json(snapshot))
}

async fn submit<I: SharedImporter>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<SubmitResponse>> {
    let (guests, _) = state.with_session(id, |s| s.begin_import()).await?;

    // Lock released while the importer runs
    let result = state.importer.import(&guests).await;

    let mut sessions = state.sessions.lock().await;
    match sessions.get_mut(&id) {
        Some(session) => {
            session.touch(Utc::now());
            match session.finish_import(result) {
                Ok(imported) => Ok(Json(SubmitResponse {
                    imported,
                    session: Some(session.snapshot()),
                })),
                Err(e) => Err(ServerError::session(e.into(), session.errors())),
            }
        }
        None => match result {
            Ok(()) => {
                log_warning(format!("Imported {} guests for closed session {}", guests.len(), id));
                Ok(Json(SubmitResponse {
                    imported: guests.len(),
                    session: None,
                }))
            }
            Err(e) => {
                log_error(format!("Import for closed session {} failed: {}", id, e));
                Err(ServerError::SessionNotFound(id))
            }
        },
    }
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    session: Option<Uuid>,
}

/// SSE endpoint for real-time log streaming, optionally for one session
async fn sse_logs(Query(query): Query<LogQuery>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(entry) if entry.matches(query.session) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(StdDuration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use crate::models::{Cell, ParsedGuest};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Importer whose outcome can be flipped between calls.
    #[derive(Default)]
    struct SwitchImporter {
        fail: AtomicBool,
    }

    impl GuestImporter for SwitchImporter {
        async fn import(&self, _guests: &[ParsedGuest]) -> Result<(), ImportError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ImportError::Status { status: 503, body: "unavailable".into() })
            } else {
                Ok(())
            }
        }
    }

    fn state() -> AppState<SwitchImporter> {
        AppState::new(ImportConfig::default(), SwitchImporter::default())
    }

    async fn open(state: &AppState<SwitchImporter>) -> Uuid {
        let (status, Json(snapshot)) = create_session(State(state.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        snapshot.id
    }

    async fn paste_text(state: &AppState<SwitchImporter>, id: Uuid, text: &str) -> ServerResult<Json<SessionSnapshot>> {
        paste(State(state.clone()), Path(id), Json(PasteRequest { text: text.to_string() })).await
    }

    #[tokio::test]
    async fn test_full_flow() {
        let state = state();
        let id = open(&state).await;

        let Json(snapshot) = paste_text(&state, id, "Name,Email,Plus One\nAsha,asha@x.com,yes\nRavi,,no\nMeera,,")
            .await
            .unwrap();
        assert_eq!(snapshot.row_count, 3);
        assert_eq!(snapshot.mapping.get(GuestField::PlusOne), Some("Plus One"));

        let request = MappingRequest {
            event_ids: Some(vec!["sangeet".into()]),
            ..MappingRequest::default()
        };
        update_mapping(State(state.clone()), Path(id), Json(request)).await.unwrap();

        let Json(snapshot) = preview(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(snapshot.guests.len(), 3);
        assert!(snapshot.guests[0].plus_one);

        let ravi = snapshot.guests[1].id;
        let meera = snapshot.guests[2].id;
        remove_guest(State(state.clone()), Path((id, ravi))).await.unwrap();
        let update = GuestUpdateRequest { field: "email".into(), value: Cell::from("meera@x.com") };
        let Json(snapshot) = update_guest(State(state.clone()), Path((id, meera)), Json(update)).await.unwrap();
        assert_eq!(snapshot.guests.len(), 2);
        assert_eq!(snapshot.guests[1].email.as_deref(), Some("meera@x.com"));

        let Json(response) = submit(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(response.imported, 2);
        let session = response.session.unwrap();
        assert!(session.guests.is_empty());
        assert_eq!(session.step, crate::import::Step::Upload);
    }

    #[tokio::test]
    async fn test_bad_paste_reports_errors() {
        let state = state();
        let id = open(&state).await;

        let err = paste_text(&state, id, "Name only").await.unwrap_err();

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        match err {
            ServerError::Session { errors, .. } => assert_eq!(errors[0].field, "paste"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_rows_block_preview() {
        let state = state();
        let id = open(&state).await;
        paste_text(&state, id, "Name,Side\nAsha,aunt").await.unwrap();

        let err = preview(State(state.clone()), Path(id)).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let Json(snapshot) = get_session(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(snapshot.step, crate::import::Step::Mapping);
        assert_eq!(snapshot.errors[0].field, "side");
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_preview() {
        let state = state();
        let id = open(&state).await;
        paste_text(&state, id, "Name\nAsha\nRavi").await.unwrap();
        preview(State(state.clone()), Path(id)).await.unwrap();
        state.importer.fail.store(true, Ordering::SeqCst);

        let err = submit(State(state.clone()), Path(id)).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        let Json(snapshot) = get_session(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(snapshot.guests.len(), 2);
        assert_eq!(snapshot.errors.len(), 1);
        assert_eq!(snapshot.errors[0].field, "import");
        assert!(!snapshot.importing);
    }

    #[tokio::test]
    async fn test_unknown_session_and_field() {
        let state = state();
        let err = get_session(State(state.clone()), Path(Uuid::new_v4())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let id = open(&state).await;
        let update = GuestUpdateRequest { field: "nickname".into(), value: Cell::from("x") };
        let err = update_guest(State(state.clone()), Path((id, GuestId::new())), Json(update))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_default_side_rejected() {
        let state = state();
        let id = open(&state).await;
        let request = MappingRequest {
            default_side: Some(crate::models::Side::parse("cousins")),
            ..MappingRequest::default()
        };

        let err = update_mapping(State(state.clone()), Path(id), Json(request)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_edits_rejected_during_import() {
        let state = state();
        let id = open(&state).await;
        paste_text(&state, id, "Name\nAsha\nRavi").await.unwrap();
        let Json(snapshot) = preview(State(state.clone()), Path(id)).await.unwrap();
        let ravi = snapshot.guests[1].id;

        // another request has started the import
        state.sessions.lock().await.get_mut(&id).unwrap().begin_import().unwrap();

        let err = remove_guest(State(state.clone()), Path((id, ravi))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let update = GuestUpdateRequest { field: "name".into(), value: Cell::from("Ravi K") };
        let err = update_guest(State(state.clone()), Path((id, ravi)), Json(update)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let Json(snapshot) = get_session(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(snapshot.guests.len(), 2);
        assert!(snapshot.importing);
    }

    #[tokio::test]
    async fn test_requests_refresh_activity() {
        let state = state();
        let id = open(&state).await;
        let Json(first) = get_session(State(state.clone()), Path(id)).await.unwrap();

        paste_text(&state, id, "Name\nAsha").await.unwrap();

        let Json(second) = get_session(State(state.clone()), Path(id)).await.unwrap();
        assert!(second.last_activity >= first.last_activity);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_close_session() {
        let state = state();
        let id = open(&state).await;

        assert_eq!(close_session(State(state.clone()), Path(id)).await.unwrap(), StatusCode::NO_CONTENT);
        assert!(get_session(State(state.clone()), Path(id)).await.is_err());
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _ = router(state());

        let unbounded = ImportConfig {
            max_file_size: usize::MAX,
            ..ImportConfig::default()
        };
        let _ = router(AppState::new(unbounded, SwitchImporter::default()));
    }
}
