use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub field: String,
    pub filename: String,
    pub size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub id: u64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    /// Every other field the status was created with.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    statuses: Vec<Status>,
}

impl Store {
    fn insert(&mut self, text: String, media: Vec<Media>, extra: BTreeMap<String, String>) -> Status {
        self.next_id += 1;
        let status = Status {
            id: self.next_id,
            text,
            media,
            extra,
        };
        self.statuses.push(status.clone());
        status
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/1/statuses/home_timeline.json", get(home_timeline))
        .route("/1/statuses/show/{file}", get(show_status))
        .route("/1/statuses/update.json", post(update_status))
        .route("/1/statuses/update_with_media.json", post(update_with_media))
        .route("/1/statuses/destroy/{file}", post(destroy_status))
        .route("/1/search.json", get(search))
        .route("/1/account/verify_credentials.json", get(verify_credentials))
        .route("/1/account/end_session.json", post(end_session))
        .fallback(not_found)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// First label of the `Host` header, e.g. `search` for `search.twitter.com`.
fn subdomain(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|host| host.split('.').next())
}

/// `{id}.json` path segment to a status id.
fn status_id(file: &str) -> Option<u64> {
    file.strip_suffix(".json")?.parse().ok()
}

async fn home_timeline(
    State(db): State<Db>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let count = match params.get("count").map(|c| c.parse::<usize>()) {
        None => usize::MAX,
        Some(Ok(count)) => count,
        Some(Err(_)) => return api_error(StatusCode::BAD_REQUEST, "Invalid count."),
    };
    let store = db.read().await;
    let timeline: Vec<Status> = store.statuses.iter().rev().take(count).cloned().collect();
    Json(timeline).into_response()
}

async fn show_status(State(db): State<Db>, Path(file): Path<String>) -> Response {
    let store = db.read().await;
    match status_id(&file).and_then(|id| store.statuses.iter().find(|s| s.id == id)) {
        Some(status) => Json(status.clone()).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "No status found with that ID."),
    }
}

async fn update_status(
    State(db): State<Db>,
    Form(mut fields): Form<BTreeMap<String, String>>,
) -> Response {
    let Some(text) = fields.remove("status") else {
        return api_error(StatusCode::FORBIDDEN, "Missing status.");
    };
    let status = db.write().await.insert(text, Vec::new(), fields);
    tracing::debug!(id = status.id, "status created");
    Json(status).into_response()
}

async fn update_with_media(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if subdomain(&headers) != Some("upload") {
        return api_error(StatusCode::NOT_FOUND, "Media must be sent to the upload host.");
    }

    let mut fields = BTreeMap::new();
    let mut media = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
        };
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(filename) => match field.bytes().await {
                Ok(data) => media.push(Media {
                    field: name,
                    filename,
                    size: data.len(),
                }),
                Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
            },
            None => match field.text().await {
                Ok(text) => {
                    fields.insert(name, text);
                }
                Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
            },
        }
    }

    let Some(text) = fields.remove("status") else {
        return api_error(StatusCode::FORBIDDEN, "Missing status.");
    };
    if media.is_empty() {
        return api_error(StatusCode::FORBIDDEN, "Missing media.");
    }
    let status = db.write().await.insert(text, media, fields);
    tracing::debug!(id = status.id, media = status.media.len(), "status with media created");
    Json(status).into_response()
}

async fn destroy_status(State(db): State<Db>, Path(file): Path<String>) -> Response {
    let mut store = db.write().await;
    let position = status_id(&file).and_then(|id| store.statuses.iter().position(|s| s.id == id));
    match position {
        Some(index) => Json(store.statuses.remove(index)).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "No status found with that ID."),
    }
}

async fn search(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    if subdomain(&headers) != Some("search") {
        return api_error(StatusCode::NOT_FOUND, "Search is served from the search host.");
    }
    let Some(query) = params.get("q").filter(|q| !q.is_empty()) else {
        return api_error(StatusCode::FORBIDDEN, "You must enter a query.");
    };
    let store = db.read().await;
    let results: Vec<Status> = store
        .statuses
        .iter()
        .filter(|s| s.text.contains(query.as_str()))
        .cloned()
        .collect();
    Json(json!({ "query": query, "params": params, "results": results })).into_response()
}

async fn verify_credentials(headers: HeaderMap) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if let Some(token) = authorization.strip_prefix("Basic ") {
        let user = STANDARD
            .decode(token)
            .ok()
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|pair| pair.split_once(':').map(|(user, _)| user.to_string()));
        if let Some(user) = user {
            return Json(json!({ "screen_name": user, "auth": "basic" })).into_response();
        }
    }
    if authorization.starts_with("OAuth ") && authorization.contains("oauth_signature=") {
        return Json(json!({ "screen_name": "oauth_user", "auth": "oauth" })).into_response();
    }
    api_error(StatusCode::UNAUTHORIZED, "Could not authenticate you.")
}

async fn end_session() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Sorry, that page does not exist")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_without_empty_fields() {
        let status = Status {
            id: 1,
            text: "hello".to_string(),
            media: Vec::new(),
            extra: BTreeMap::new(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, json!({ "id": 1, "text": "hello" }));
    }

    #[test]
    fn status_with_media_roundtrips() {
        let status = Status {
            id: 7,
            text: "pic".to_string(),
            media: vec![Media {
                field: "media[]".to_string(),
                filename: "a.png".to_string(),
                size: 3,
            }],
            extra: BTreeMap::from([("lat".to_string(), "1.5".to_string())]),
        };
        let back: Status = serde_json::from_str(&serde_json::to_string(&status).unwrap()).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn store_assigns_increasing_ids() {
        let mut store = Store::default();
        let a = store.insert("a".into(), Vec::new(), BTreeMap::new());
        let b = store.insert("b".into(), Vec::new(), BTreeMap::new());
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[test]
    fn status_id_requires_json_suffix() {
        assert_eq!(status_id("12.json"), Some(12));
        assert_eq!(status_id("12"), None);
        assert_eq!(status_id("abc.json"), None);
    }

    #[test]
    fn subdomain_is_first_host_label() {
        let mut headers = HeaderMap::new();
        assert_eq!(subdomain(&headers), None);
        headers.insert(header::HOST, "upload.twitter.com".parse().unwrap());
        assert_eq!(subdomain(&headers), Some("upload"));
    }
}
