use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use folio_content::{
    BlobKey, BlobUploader, CountryDirectory, CountryOption, DashboardTab, FormController, Identity,
    IdentityProvider, ImageHostClient, ListViewer, LocalBlobStore, RootView, Route, SelectedFile,
    SessionGate, SingletonViewer, ViewerState,
};
use folio_shared::constants::PRIVATE_PATHS;
use folio_shared::{
    AboutText, Card, Contact, ContentError, CurrentSkill, Education, Entity, Hobby, Home,
    MissionStatement, Profile, Project, Rating, Record, ResumePointer, SocialLink, StorePath,
};
use folio_store::{ContentStore, DocumentStore, ThemeColor};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

/// Upload categories sent to the hosted image service when one is configured.
const IMAGE_HOST_CATEGORIES: [&str; 2] = ["profileImages", "homeImages"];

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub blobs: Arc<LocalBlobStore>,
    pub image_host: Option<Arc<ImageHostClient>>,
    pub identity: Arc<dyn IdentityProvider>,
    pub countries: Arc<CountryDirectory>,
    pub rate_limiter: RateLimiter,
    pub submissions_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    fn uploader_for<E: Entity>(&self) -> Arc<dyn BlobUploader> {
        let hosted = E::UPLOAD_CATEGORY.is_some_and(|c| IMAGE_HOST_CATEGORIES.contains(&c));
        match &self.image_host {
            Some(host) if hosted => host.clone() as Arc<dyn BlobUploader>,
            _ => self.blobs.clone() as Arc<dyn BlobUploader>,
        }
    }

    fn controller<E: Entity>(&self) -> FormController<E> {
        FormController::new(self.store.clone(), self.uploader_for::<E>())
    }

    fn gate(&self) -> SessionGate {
        SessionGate::new(self.store.clone(), self.config.admin_uids.clone())
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let submissions =
        middleware::from_fn_with_state(state.submissions_limiter.clone(), rate_limit_middleware);

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/api/session", get(session))
        // Public content
        .route("/api/home", get(singleton::<Home>))
        .route("/api/profile", get(singleton::<Profile>))
        .route("/api/resume", get(singleton::<ResumePointer>))
        .route("/api/projects", get(collection::<Project>))
        .route("/api/projects/{id}", get(project_detail))
        .route("/api/educations", get(collection::<Education>))
        .route("/api/skills", get(collection::<CurrentSkill>))
        .route("/api/social-links", get(collection::<SocialLink>))
        .route("/api/about", get(about_page))
        .route("/api/about/text", get(singleton::<AboutText>))
        .route("/api/about/mission-vision", get(collection::<MissionStatement>))
        .route("/api/about/hobbies", get(collection::<Hobby>))
        .route(
            "/api/ratings",
            get(collection::<Rating>).merge(post(submit_rating).route_layer(submissions.clone())),
        )
        .route("/api/contacts", post(submit_contact).route_layer(submissions))
        .route("/api/subscribe/{*path}", get(subscribe))
        .route("/api/countries", get(countries))
        .route("/api/preferences", get(preferences))
        .route("/api/preferences/theme", put(set_theme))
        .route("/api/preferences/welcome-dismissed", post(dismiss_welcome))
        .route("/blobs/{*key}", get(blob_download))
        // Admin
        .route("/api/admin/profile", put(admin_singleton::<Profile>))
        .route("/api/admin/home", put(admin_singleton::<Home>))
        .route("/api/admin/resume", put(admin_singleton::<ResumePointer>))
        .route("/api/admin/about/text", put(admin_singleton::<AboutText>))
        .route("/api/admin/contacts", get(admin_contacts))
        .route(
            "/api/admin/contacts/{id}",
            axum::routing::delete(admin_delete::<Contact>),
        )
        .route("/api/admin/contacts/{id}/seen", post(toggle_seen))
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/admin/dashboard/{tab}", get(dashboard_pane));

    let router = collection_routes::<Project>(router, "/api/admin/projects");
    let router = collection_routes::<Education>(router, "/api/admin/educations");
    let router = collection_routes::<CurrentSkill>(router, "/api/admin/skills");
    let router = collection_routes::<SocialLink>(router, "/api/admin/social-links");
    let router = collection_routes::<Rating>(router, "/api/admin/ratings");
    let router = collection_routes::<MissionStatement>(router, "/api/admin/about/mission-vision");
    let router = collection_routes::<Hobby>(router, "/api/admin/about/hobbies");

    router
        .layer(DefaultBodyLimit::max(state.config.max_blob_size + 1024 * 1024))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Add, edit and delete for one admin-managed collection.
fn collection_routes<E: Entity>(router: Router<AppState>, base: &str) -> Router<AppState> {
    router.route(base, post(admin_add::<E>)).route(
        &format!("{base}/{{id}}"),
        put(admin_edit::<E>).delete(admin_delete::<E>),
    )
}

// ─── Response bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    image_host: bool,
    max_upload_bytes: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    route: Route,
    identity: Option<Identity>,
    admin: bool,
}

#[derive(Serialize)]
struct CollectionResponse<E> {
    state: &'static str,
    items: Vec<Record<E>>,
    cards: Vec<Card>,
}

impl<E: Entity> CollectionResponse<E> {
    fn from_viewer(viewer: &ListViewer<E>, admin: bool) -> Self {
        Self {
            state: state_name(viewer.state()),
            items: viewer.records().to_vec(),
            cards: viewer.cards(admin),
        }
    }
}

#[derive(Serialize)]
struct SingletonResponse<E> {
    state: &'static str,
    item: Option<E>,
    card: Option<Card>,
}

impl<E: Entity> SingletonResponse<E> {
    fn from_viewer(viewer: &SingletonViewer<E>, admin: bool) -> Self {
        Self {
            state: state_name(viewer.state()),
            item: viewer.entity().cloned(),
            card: viewer.card(admin),
        }
    }
}

/// Everything the about-me page shows, in one read.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AboutPageResponse {
    text: SingletonResponse<AboutText>,
    mission_vision: CollectionResponse<MissionStatement>,
    hobbies: CollectionResponse<Hobby>,
}

#[derive(Serialize)]
struct DetailResponse<E> {
    item: Record<E>,
    card: Card,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesResponse {
    theme_color: ThemeColor,
    welcome_dismissed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeRequest {
    theme_color: ThemeColor,
}

#[derive(Serialize)]
struct TabInfo {
    tab: DashboardTab,
    title: &'static str,
    path: String,
}

#[derive(Serialize)]
struct DashboardResponse {
    active: DashboardTab,
    tabs: Vec<TabInfo>,
}

#[derive(Serialize)]
struct PaneResponse {
    tab: DashboardTab,
    title: &'static str,
    path: String,
    collection: bool,
    state: &'static str,
    cards: Vec<Card>,
}

fn state_name<T>(state: &ViewerState<T>) -> &'static str {
    match state {
        ViewerState::Loading => "loading",
        ViewerState::Populated(_) => "populated",
        ViewerState::Empty => "empty",
    }
}

// ─── Public handlers ───

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.site_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        image_host: state.image_host.is_some(),
        max_upload_bytes: state.blobs.max_size(),
    })
}

/// Where the client should go for the presented credential. A missing or
/// unknown token is treated as signed out.
async fn session(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ServerError> {
    let identity = match bearer_token(&headers) {
        Some(token) => state.identity.resolve(token).await,
        None => None,
    };

    let mut gate = state.gate();
    let route = gate.on_auth_change(identity).await?;

    Ok(Json(SessionResponse {
        route,
        identity: gate.identity().cloned(),
        admin: gate.is_admin(),
    }))
}

async fn singleton<E: Entity>(
    State(state): State<AppState>,
) -> Result<Json<SingletonResponse<E>>, ServerError> {
    let viewer = SingletonViewer::<E>::load(state.store.as_ref()).await?;
    Ok(Json(SingletonResponse::from_viewer(&viewer, false)))
}

async fn collection<E: Entity>(
    State(state): State<AppState>,
) -> Result<Json<CollectionResponse<E>>, ServerError> {
    let viewer = ListViewer::<E>::load(state.store.as_ref()).await?;
    Ok(Json(CollectionResponse::from_viewer(&viewer, false)))
}

async fn about_page(State(state): State<AppState>) -> Result<Json<AboutPageResponse>, ServerError> {
    let store = state.store.as_ref();
    let text = SingletonViewer::<AboutText>::load(store).await?;
    let mission_vision = ListViewer::<MissionStatement>::load(store).await?;
    let hobbies = ListViewer::<Hobby>::load(store).await?;
    Ok(Json(AboutPageResponse {
        text: SingletonResponse::from_viewer(&text, false),
        mission_vision: CollectionResponse::from_viewer(&mission_vision, false),
        hobbies: CollectionResponse::from_viewer(&hobbies, false),
    }))
}

async fn project_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DetailResponse<Project>>, ServerError> {
    let viewer = ListViewer::<Project>::load(state.store.as_ref()).await?;
    let record = viewer
        .get(&id)
        .cloned()
        .ok_or_else(|| ServerError::NotFound(format!("project {id}")))?;
    let card = record.card();
    Ok(Json(DetailResponse { item: record, card }))
}

async fn submit_rating(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedResponse>), ServerError> {
    let form = read_form(multipart).await?;
    let mut draft = parse_draft::<Rating>(form.draft)?;
    // Visitors attach a photo as a file; a URL in the draft is not theirs to set.
    draft.image_url.clear();

    let mut controller = state.controller::<Rating>();
    controller.open_add()?;
    *controller.draft_mut() = draft;
    if let Some(file) = form.file {
        controller.select_file(file)?;
    }

    let id = committed_id(controller.submit().await?)?;
    info!(id = %id, "rating submitted");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn submit_contact(
    State(state): State<AppState>,
    Json(mut contact): Json<Contact>,
) -> Result<(StatusCode, Json<CreatedResponse>), ServerError> {
    contact.timestamp = chrono::Utc::now().timestamp_millis();
    contact.seen = false;

    let mut controller = state.controller::<Contact>();
    controller.open_add()?;
    *controller.draft_mut() = contact;

    let id = committed_id(controller.submit().await?)?;
    info!(id = %id, "contact message received");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Server-sent events carrying the value at `path`, first as it is now and
/// then after every change. Private subtrees are never streamed.
async fn subscribe(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ServerError> {
    let path = StorePath::parse(&raw).map_err(ContentError::from)?;
    if path.is_root() || path.top().is_some_and(|top| PRIVATE_PATHS.contains(&top)) {
        return Err(ServerError::Forbidden(format!("'{path}' cannot be streamed")));
    }

    let subscription = state.store.subscribe(&path).await?;
    debug!(path = %path, "stream opened");

    let events = stream::unfold(subscription, |mut subscription| async move {
        let value = subscription.next().await?;
        let event = Event::default().event("value").json_data(&value);
        Some((event, subscription))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn countries(
    State(state): State<AppState>,
) -> Result<Json<Vec<CountryOption>>, ServerError> {
    Ok(Json(state.countries.countries().await?.to_vec()))
}

/// Header carrying the browser-generated id that preferences are keyed on.
const CLIENT_ID_HEADER: &str = "x-client-id";

fn client_id(headers: &HeaderMap) -> Result<Option<&str>, ServerError> {
    let Some(raw) = headers.get(CLIENT_ID_HEADER) else {
        return Ok(None);
    };
    let id = raw
        .to_str()
        .map_err(|_| ServerError::BadRequest("client id must be ASCII".into()))?
        .trim();
    let valid = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ServerError::BadRequest(format!("invalid client id '{id}'")));
    }
    Ok(Some(id))
}

fn require_client_id(headers: &HeaderMap) -> Result<&str, ServerError> {
    client_id(headers)?.ok_or_else(|| ServerError::BadRequest("missing X-Client-Id header".into()))
}

async fn preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PreferencesResponse>, ServerError> {
    match client_id(&headers)? {
        Some(client) => Ok(Json(current_preferences(&state.store, client).await?)),
        None => Ok(Json(PreferencesResponse {
            theme_color: ThemeColor::default(),
            welcome_dismissed: false,
        })),
    }
}

async fn set_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ThemeRequest>,
) -> Result<Json<PreferencesResponse>, ServerError> {
    let client = require_client_id(&headers)?;
    state.store.set_theme_color(client, req.theme_color).await?;
    Ok(Json(current_preferences(&state.store, client).await?))
}

async fn dismiss_welcome(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PreferencesResponse>, ServerError> {
    let client = require_client_id(&headers)?;
    state.store.dismiss_welcome(client).await?;
    Ok(Json(current_preferences(&state.store, client).await?))
}

async fn current_preferences(
    store: &ContentStore,
    client: &str,
) -> Result<PreferencesResponse, ServerError> {
    Ok(PreferencesResponse {
        theme_color: store.theme_color(client).await?,
        welcome_dismissed: store.welcome_dismissed(client).await?,
    })
}

async fn blob_download(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), ServerError> {
    let key = BlobKey::parse(&key)?;
    let data = state.blobs.read(&key).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&key))], data))
}

fn content_type_for(key: &BlobKey) -> &'static str {
    let ext = FsPath::new(key.file_name())
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

// ─── Admin handlers ───

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the bearer token and run it through a fresh session gate. Only a
/// gate that lands on the dashboard lets the request through.
async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<SessionGate, ServerError> {
    let token = bearer_token(headers).ok_or(ServerError::Unauthorized)?;
    let identity = state
        .identity
        .resolve(token)
        .await
        .ok_or(ServerError::Unauthorized)?;

    let mut gate = state.gate();
    match gate.on_auth_change(Some(identity)).await? {
        Route::Dashboard => Ok(gate),
        _ => Err(ServerError::Forbidden("admin role required".into())),
    }
}

async fn admin_singleton<E: Entity>(
    headers: HeaderMap,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SingletonResponse<E>>, ServerError> {
    require_admin(&state, &headers).await?;
    let form = read_form(multipart).await?;

    let path = E::LOCATION.path();
    let stored = state.store.read(&path).await?;
    let draft = parse_draft::<E>(overlay(stored, form.draft))?;

    let mut controller = state.controller::<E>();
    controller.open_singleton(Some(draft))?;
    if let Some(file) = form.file {
        controller.select_file(file)?;
    }
    controller.submit().await?;

    let viewer = SingletonViewer::<E>::load(state.store.as_ref()).await?;
    Ok(Json(SingletonResponse::from_viewer(&viewer, true)))
}

async fn admin_add<E: Entity>(
    headers: HeaderMap,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedResponse>), ServerError> {
    require_admin(&state, &headers).await?;
    let form = read_form(multipart).await?;
    let draft = parse_draft::<E>(form.draft)?;

    let mut controller = state.controller::<E>();
    controller.open_add()?;
    *controller.draft_mut() = draft;
    if let Some(file) = form.file {
        controller.select_file(file)?;
    }

    let id = committed_id(controller.submit().await?)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn admin_edit<E: Entity>(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<CreatedResponse>, ServerError> {
    require_admin(&state, &headers).await?;
    let form = read_form(multipart).await?;

    let path = E::LOCATION.path().child(&id).map_err(ContentError::from)?;
    let stored = state.store.read(&path).await?;
    if stored.is_null() {
        return Err(ServerError::NotFound(format!("{} {id}", E::NAME)));
    }
    let draft = parse_draft::<E>(overlay(stored, form.draft))?;

    let mut controller = state.controller::<E>();
    controller.open_edit(Record::new(id, draft))?;
    if let Some(file) = form.file {
        controller.select_file(file)?;
    }

    let id = committed_id(controller.submit().await?)?;
    Ok(Json(CreatedResponse { id }))
}

async fn admin_delete<E: Entity>(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    require_admin(&state, &headers).await?;

    let path = E::LOCATION.path().child(&id).map_err(ContentError::from)?;
    if !state.store.exists(&path).await? {
        return Err(ServerError::NotFound(format!("{} {id}", E::NAME)));
    }

    let mut controller = state.controller::<E>();
    let confirmation = controller.request_delete(&id)?;
    controller.confirm_delete(confirmation).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn admin_contacts(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<CollectionResponse<Contact>>, ServerError> {
    require_admin(&state, &headers).await?;
    let viewer = ListViewer::<Contact>::load(state.store.as_ref()).await?;
    Ok(Json(CollectionResponse::from_viewer(&viewer, true)))
}

async fn toggle_seen(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    require_admin(&state, &headers).await?;

    let path = Contact::LOCATION.path().child(&id).map_err(ContentError::from)?;
    let stored = state.store.read(&path).await?;
    if stored.is_null() {
        return Err(ServerError::NotFound(format!("contact {id}")));
    }
    let mut contact = Contact::from_document(&path, stored)?;
    contact.seen = !contact.seen;
    let seen = contact.seen;

    let mut controller = state.controller::<Contact>();
    controller.open_edit(Record::new(id.clone(), contact))?;
    controller.submit().await?;

    Ok(Json(serde_json::json!({ "id": id, "seen": seen })))
}

async fn dashboard(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ServerError> {
    let mut gate = require_admin(&state, &headers).await?;
    let RootView::Admin(shell) = gate.root_view() else {
        return Err(ServerError::Forbidden("admin role required".into()));
    };

    let tabs = shell
        .tabs()
        .iter()
        .map(|&tab| TabInfo {
            tab,
            title: tab.title(),
            path: tab.store_path().to_string(),
        })
        .collect();

    Ok(Json(DashboardResponse {
        active: shell.active(),
        tabs,
    }))
}

async fn dashboard_pane(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(tab): Path<String>,
) -> Result<Json<PaneResponse>, ServerError> {
    let tab: DashboardTab = tab.parse().map_err(ServerError::NotFound)?;
    let mut gate = require_admin(&state, &headers).await?;
    let RootView::Admin(shell) = gate.root_view() else {
        return Err(ServerError::Forbidden("admin role required".into()));
    };
    shell.select(tab);

    let store = state.store.as_ref();
    let (pane_state, cards) = match tab {
        DashboardTab::Profile => singleton_pane::<Profile>(store).await?,
        DashboardTab::Home => singleton_pane::<Home>(store).await?,
        DashboardTab::Resume => singleton_pane::<ResumePointer>(store).await?,
        DashboardTab::Projects => list_pane::<Project>(store).await?,
        DashboardTab::Education => list_pane::<Education>(store).await?,
        DashboardTab::CurrentSkills => list_pane::<CurrentSkill>(store).await?,
        DashboardTab::SocialMedia => list_pane::<SocialLink>(store).await?,
        DashboardTab::Ratings => list_pane::<Rating>(store).await?,
        DashboardTab::Contacts => list_pane::<Contact>(store).await?,
        DashboardTab::About => singleton_pane::<AboutText>(store).await?,
        DashboardTab::MissionVision => list_pane::<MissionStatement>(store).await?,
        DashboardTab::Hobbies => list_pane::<Hobby>(store).await?,
    };

    Ok(Json(PaneResponse {
        tab,
        title: tab.title(),
        path: tab.store_path().to_string(),
        collection: tab.is_collection(),
        state: pane_state,
        cards,
    }))
}

async fn list_pane<E: Entity>(
    store: &ContentStore,
) -> Result<(&'static str, Vec<Card>), ServerError> {
    let viewer = ListViewer::<E>::load(store).await?;
    Ok((state_name(viewer.state()), viewer.cards(true)))
}

async fn singleton_pane<E: Entity>(
    store: &ContentStore,
) -> Result<(&'static str, Vec<Card>), ServerError> {
    let viewer = SingletonViewer::<E>::load(store).await?;
    Ok((state_name(viewer.state()), viewer.card(true).into_iter().collect()))
}

// ─── Form helpers ───

/// A submitted dialog: the draft as JSON plus an optional picked file.
struct DraftForm {
    draft: Value,
    file: Option<SelectedFile>,
}

async fn read_form(mut multipart: Multipart) -> Result<DraftForm, ServerError> {
    let mut draft = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "draft" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read draft: {e}")))?;
                let value: Value = serde_json::from_str(&text)
                    .map_err(|e| ServerError::BadRequest(format!("Draft is not JSON: {e}")))?;
                draft = Some(value);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read file: {e}")))?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    file = Some(SelectedFile::new(file_name, content_type, bytes));
                }
            }
            _ => {}
        }
    }

    let draft = draft.ok_or_else(|| {
        ServerError::BadRequest("Missing 'draft' field in multipart form".to_string())
    })?;
    Ok(DraftForm { draft, file })
}

fn parse_draft<E: Entity>(value: Value) -> Result<E, ServerError> {
    E::from_document(&E::LOCATION.path(), value)
        .map_err(|e| ServerError::BadRequest(format!("Invalid {} draft: {e}", E::NAME)))
}

/// Lay the submitted fields over the stored document, so a draft that omits
/// a field leaves it untouched instead of resetting it to its default.
fn overlay(stored: Value, draft: Value) -> Value {
    match (stored, draft) {
        (Value::Object(mut base), Value::Object(patch)) => {
            base.extend(patch);
            Value::Object(base)
        }
        (_, draft) => draft,
    }
}

fn committed_id(id: Option<String>) -> Result<String, ServerError> {
    id.ok_or_else(|| ServerError::Internal("collection submit returned no id".into()))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
