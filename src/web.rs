// 🌐 Web Form - axum router and server-rendered page
// Latitude/longitude travel with every form post; the server keeps no session state

use crate::staging::UploadedPhoto;
use crate::submission::Submission;
use crate::workflow::{AccountStatus, Workflow, MSG_CHECKING, MSG_GEOCODE_FAILED, MSG_PREPARING};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub const PAGE_TITLE: &str = "Formulaire de dépôt FIDEALIS pour PRIMES";

const PAGE_TEMPLATE: &str = include_str!("../web/form.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub credit_product_id: String,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
struct CreditsResponse {
    product_id: String,
    quantity: Option<i64>,
}

// ============================================================================
// PAGE MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    fn css_class(&self) -> &str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Notice {
            level,
            text: text.into(),
        }
    }
}

/// Text fields echoed back into the form
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    pub client_name: String,
    pub address: String,
    pub latitude: String,
    pub longitude: String,
}

/// Everything posted by the form
#[derive(Debug, Default)]
struct FormInput {
    fields: FormFields,
    photos: Vec<UploadedPhoto>,
}

impl FormInput {
    fn into_submission(self) -> Submission {
        Submission {
            client_name: self.fields.client_name,
            address: self.fields.address,
            latitude: self.fields.latitude,
            longitude: self.fields.longitude,
            photos: self.photos,
        }
    }
}

async fn read_form(mut multipart: Multipart) -> Result<FormInput, String> {
    let mut input = FormInput::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photos" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| e.to_string())?;
            // an empty file input still posts one nameless part
            if !file_name.is_empty() && !bytes.is_empty() {
                input.photos.push(UploadedPhoto::new(file_name, bytes.to_vec()));
            }
            continue;
        }

        let value = field.text().await.map_err(|e| e.to_string())?;
        match name.as_str() {
            "client_name" => input.fields.client_name = value,
            "address" => input.fields.address = value,
            "latitude" => input.fields.latitude = value,
            "longitude" => input.fields.longitude = value,
            _ => {}
        }
    }

    Ok(input)
}

// ============================================================================
// RENDERING
// ============================================================================

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

fn notice_html(notice: &Notice) -> String {
    format!(
        "<p class=\"notice {}\">{}</p>",
        notice.level.css_class(),
        escape_html(&notice.text)
    )
}

pub fn render_page(status: &AccountStatus, fields: &FormFields, notices: &[Notice]) -> String {
    let status_notice = if status.is_error() {
        Notice::new(NoticeLevel::Error, status.message())
    } else {
        Notice::new(NoticeLevel::Info, status.message())
    };
    let notices: String = notices.iter().map(notice_html).collect();

    fill_template(PAGE_TEMPLATE, |key| match key {
        "title" => Some(escape_html(PAGE_TITLE)),
        "status" => Some(notice_html(&status_notice)),
        "client_name" => Some(escape_html(&fields.client_name)),
        "address" => Some(escape_html(&fields.address)),
        "latitude" => Some(escape_html(&fields.latitude)),
        "longitude" => Some(escape_html(&fields.longitude)),
        "notices" => Some(notices.clone()),
        _ => None,
    })
}

/// Expand `{{key}}` placeholders in one pass; substituted text is never rescanned
fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let key = &after[..close];
                match lookup(key.trim()) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

async fn page(state: &AppState, fields: &FormFields, notices: &[Notice]) -> Html<String> {
    let status = state.workflow.account_status().await;
    Html(render_page(&status, fields, notices))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - Empty form
async fn serve_form(State(state): State<AppState>) -> impl IntoResponse {
    page(&state, &FormFields::default(), &[]).await
}

/// POST /geocode - Fill latitude/longitude from the address
async fn geocode_form(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let mut input = match read_form(multipart).await {
        Ok(input) => input,
        Err(e) => return bad_form(&state, e).await,
    };

    let mut notices = Vec::new();
    if !input.fields.address.trim().is_empty() {
        match state.workflow.locate(&input.fields.address).await {
            Ok(location) => {
                input.fields.latitude = location.latitude_text();
                input.fields.longitude = location.longitude_text();
            }
            Err(_) => notices.push(Notice::new(NoticeLevel::Error, MSG_GEOCODE_FAILED)),
        }
    }

    (StatusCode::OK, page(&state, &input.fields, &notices).await).into_response()
}

/// POST /submit - Stage, collage and deposit the photos
async fn submit_form(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let input = match read_form(multipart).await {
        Ok(input) => input,
        Err(e) => return bad_form(&state, e).await,
    };

    let fields = input.fields.clone();
    let submission = input.into_submission();

    let mut notices = Vec::new();
    match state.workflow.submit(&submission).await {
        Ok(receipt) => {
            notices.push(Notice::new(NoticeLevel::Info, MSG_PREPARING));
            notices.push(Notice::new(NoticeLevel::Info, MSG_CHECKING));
            let level = if receipt.report.all_accepted() {
                NoticeLevel::Success
            } else {
                NoticeLevel::Error
            };
            notices.push(Notice::new(level, receipt.message()));
        }
        Err(failure) => {
            warn!(error = %failure, "submission failed");
            notices.push(Notice::new(NoticeLevel::Error, failure.message()));
        }
    }

    page(&state, &fields, &notices).await.into_response()
}

async fn bad_form(state: &AppState, error: String) -> axum::response::Response {
    warn!(error = %error, "unreadable form post");
    let notices = [Notice::new(NoticeLevel::Error, crate::workflow::MSG_SEND_FAILED)];
    (
        StatusCode::BAD_REQUEST,
        page(state, &FormFields::default(), &notices).await,
    )
        .into_response()
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/credits - Remaining credits of the configured product
async fn get_credits(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.workflow.account_status().await;
    let product_id = state.credit_product_id.clone();

    match status {
        AccountStatus::Credits { quantity } => (
            StatusCode::OK,
            Json(ApiResponse::ok(CreditsResponse {
                product_id,
                quantity: Some(quantity),
            })),
        ),
        other => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::failed(
                CreditsResponse {
                    product_id,
                    quantity: None,
                },
                other.message(),
            )),
        ),
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/credits", get(get_credits))
        .with_state(state.clone());

    Router::new()
        .route("/", get(serve_form))
        .route("/geocode", post(geocode_form))
        .route("/submit", post(submit_form))
        .with_state(state)
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> FormFields {
        FormFields {
            client_name: "Dupont <b>".to_string(),
            address: "1 rue \"Haute\"".to_string(),
            latitude: "48.1".to_string(),
            longitude: "-1.6".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;'");
        assert_eq!(escape_html("Crédit"), "Crédit");
    }

    #[test]
    fn test_render_page_carries_fields() {
        let html = render_page(&AccountStatus::Credits { quantity: 9 }, &fields(), &[]);
        assert!(html.contains(PAGE_TITLE));
        assert!(html.contains("Crédit restant 9"));
        assert!(html.contains("value=\"Dupont &lt;b&gt;\""));
        assert!(html.contains("value=\"1 rue &quot;Haute&quot;\""));
        assert!(html.contains("value=\"48.1\""));
        assert!(html.contains("value=\"-1.6\""));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_placeholders_in_user_input_stay_literal() {
        let fields = FormFields {
            client_name: "{{latitude}}".to_string(),
            address: "{{notices}}".to_string(),
            latitude: "48.1".to_string(),
            longitude: String::new(),
        };
        let notices = [Notice::new(NoticeLevel::Error, "boom")];
        let html = render_page(&AccountStatus::Credits { quantity: 1 }, &fields, &notices);

        assert!(html.contains("value=\"{{latitude}}\""));
        assert!(html.contains("value=\"{{notices}}\""));
        assert!(!html.contains("value=\"<p"));
        assert_eq!(html.matches("boom").count(), 1);
    }

    #[test]
    fn test_fill_template_unknown_and_unclosed() {
        let lookup = |key: &str| (key == "a").then(|| "A".to_string());
        assert_eq!(fill_template("x{{a}}y{{b}}z", lookup), "xAy{{b}}z");
        assert_eq!(fill_template("{{a}} {{open", lookup), "A {{open");
    }

    #[test]
    fn test_render_page_errors() {
        let notices = [Notice::new(NoticeLevel::Error, MSG_GEOCODE_FAILED)];
        let html = render_page(&AccountStatus::CreditsUnavailable, &FormFields::default(), &notices);
        assert!(html.contains("notice error"));
        assert!(html.contains("Échec de la récupération des données de crédit."));
        assert!(html.contains(MSG_GEOCODE_FAILED));
    }
}
