// In-process fakes of the deposit and geocoding services

#![allow(dead_code)]

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use fidealis_depot::{DepotClient, GeocodeClient, Workflow};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "api-key";
pub const ACCOUNT_KEY: &str = "acc-key";
pub const GOOGLE_KEY: &str = "g-key";
pub const SESSION: &str = "sess-42";

#[derive(Default)]
pub struct FakeState {
    pub login_ok: bool,
    pub credits: Value,
    /// 1-based deposit POST numbers answered with HTTP 500
    pub failing_posts: HashSet<usize>,
    /// Every deposit GET answers HTTP 500
    pub depot_down: bool,
    /// Every geocode request answers HTTP 500
    pub geocoder_down: bool,
    pub known_addresses: HashMap<String, (f64, f64)>,
    pub deposits: Mutex<Vec<HashMap<String, String>>>,
    pub geocode_queries: Mutex<Vec<HashMap<String, String>>>,
}

pub struct FakeServices {
    pub base: String,
    pub state: Arc<FakeState>,
}

impl FakeServices {
    pub fn deposit_url(&self) -> String {
        format!("{}/api.php", self.base)
    }

    pub fn geocode_url(&self) -> String {
        format!("{}/geocode/json", self.base)
    }

    pub fn deposits(&self) -> Vec<HashMap<String, String>> {
        self.state.deposits.lock().unwrap().clone()
    }

    pub fn workflow(&self, staging_dir: &Path) -> Workflow {
        self.workflow_with_geocode_key(staging_dir, GOOGLE_KEY)
    }

    pub fn workflow_with_geocode_key(&self, staging_dir: &Path, google_key: &str) -> Workflow {
        let http = reqwest::Client::new();
        Workflow::new(
            DepotClient::new(http.clone(), self.deposit_url(), API_KEY, ACCOUNT_KEY),
            GeocodeClient::new(http, self.geocode_url(), google_key),
            staging_dir,
            "4",
        )
    }
}

pub fn default_state() -> FakeState {
    FakeState {
        login_ok: true,
        credits: json!({"4": {"quantity": 37}, "6": {"quantity": "3"}}),
        known_addresses: [(
            "123 rue Exemple, Paris, France".to_string(),
            (48.8566, 2.3522),
        )]
        .into_iter()
        .collect(),
        ..FakeState::default()
    }
}

async fn depot_get(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if state.depot_down {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "unavailable"})));
    }
    if params.get("key").map(String::as_str) != Some(API_KEY) {
        return (StatusCode::OK, Json(json!({"error": "invalid key"})));
    }

    let body = match params.get("call").map(String::as_str) {
        Some("loginUserFromAccountKey") => {
            if state.login_ok && params.get("accountKey").map(String::as_str) == Some(ACCOUNT_KEY) {
                json!({"PHPSESSID": SESSION})
            } else {
                json!({"error": "login refused"})
            }
        }
        Some("getCredits") => {
            if params.get("PHPSESSID").map(String::as_str) == Some(SESSION) {
                state.credits.clone()
            } else {
                json!({})
            }
        }
        _ => json!({"error": "unknown call"}),
    };
    (StatusCode::OK, Json(body))
}

async fn depot_post(
    State(state): State<Arc<FakeState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let number = {
        let mut deposits = state.deposits.lock().unwrap();
        deposits.push(fields);
        deposits.len()
    };

    if state.failing_posts.contains(&number) {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "storage"})))
    } else {
        (StatusCode::OK, Json(json!({"result": "ok"})))
    }
}

async fn geocode(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.geocode_queries.lock().unwrap().push(params.clone());

    if state.geocoder_down {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "backend"})));
    }
    if params.get("key").map(String::as_str) != Some(GOOGLE_KEY) {
        return (StatusCode::OK, Json(json!({"status": "REQUEST_DENIED", "results": []})));
    }

    let address = params.get("address").cloned().unwrap_or_default();
    let body = match state.known_addresses.get(&address) {
        Some((lat, lng)) => json!({
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": lat, "lng": lng}}}]
        }),
        None => json!({"status": "ZERO_RESULTS", "results": []}),
    };
    (StatusCode::OK, Json(body))
}

pub async fn start(state: FakeState) -> FakeServices {
    let state = Arc::new(state);
    let app = Router::new()
        .route("/api.php", get(depot_get).post(depot_post))
        .route("/geocode/json", get(geocode))
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024 * 1024))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake services");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake services");
    });

    FakeServices {
        base: format!("http://{}", addr),
        state,
    }
}

/// Small solid-colour JPEG
pub fn jpeg_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, 80, 160])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).expect("encode jpeg");
    out.into_inner()
}

/// Number of `file{N}` entries carried by one deposit POST
pub fn file_count(deposit: &HashMap<String, String>) -> usize {
    (1..)
        .take_while(|n| deposit.contains_key(&format!("file{}", n)))
        .count()
}

pub fn filenames(deposit: &HashMap<String, String>) -> Vec<String> {
    (1..=file_count(deposit))
        .map(|n| deposit[&format!("filename{}", n)].clone())
        .collect()
}
