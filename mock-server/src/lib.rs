use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct CreateReport {
    pub title: String,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct UpdateReport {
    pub title: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Deserialize)]
pub struct ReportFilter {
    pub min_amount: Option<f64>,
}

#[derive(Deserialize)]
pub struct BulkExport {
    pub rows: usize,
}

/// What `/echo` saw, returned as JSON.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

pub type Db = Arc<RwLock<Vec<Report>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/reports", get(list_reports).post(create_report))
        .route("/reports/export", get(export_csv))
        .route("/reports/export.json", get(export_json))
        .route("/reports/export/bulk", get(export_bulk))
        .route(
            "/reports/{id}",
            patch(update_report).get(get_report).delete(delete_report),
        )
        .route("/ping", get(ping))
        .route("/echo", any(echo))
        .route("/broken", get(broken))
        .route("/image", get(image))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    tracing::info!(addr = ?listener.local_addr().ok(), "mock backend serving");
    axum::serve(listener, app()).await
}

/// 400 with the message as a plain-text body.
fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

async fn list_reports(State(db): State<Db>, Query(filter): Query<ReportFilter>) -> Json<Vec<Report>> {
    let reports = db.read().await;
    let min = filter.min_amount.unwrap_or(f64::NEG_INFINITY);
    Json(reports.iter().filter(|r| r.amount >= min).cloned().collect())
}

async fn create_report(State(db): State<Db>, Json(input): Json<CreateReport>) -> Response {
    if input.title.trim().is_empty() {
        return bad_request("title must not be empty");
    }
    let report = Report {
        id: Uuid::new_v4(),
        title: input.title,
        amount: input.amount,
    };
    db.write().await.push(report.clone());
    Json(report).into_response()
}

async fn get_report(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Report>, StatusCode> {
    let reports = db.read().await;
    reports
        .iter()
        .find(|r| r.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_report(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReport>,
) -> Response {
    let mut reports = db.write().await;
    let Some(report) = reports.iter_mut().find(|r| r.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let Some(title) = input.title {
        if title.trim().is_empty() {
            return bad_request("title must not be empty");
        }
        report.title = title;
    }
    if let Some(amount) = input.amount {
        report.amount = amount;
    }
    Json(report.clone()).into_response()
}

/// 200 with no body and no content type.
async fn delete_report(State(db): State<Db>, Path(id): Path<Uuid>) -> StatusCode {
    let mut reports = db.write().await;
    let before = reports.len();
    reports.retain(|r| r.id != id);
    if reports.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

async fn export_csv(State(db): State<Db>) -> impl IntoResponse {
    let reports = db.read().await;
    let mut csv = String::from("id,title,amount\n");
    for r in reports.iter() {
        csv.push_str(&format!("{},{},{}\n", r.id, r.title, r.amount));
    }
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv)
}

async fn export_json(State(db): State<Db>) -> impl IntoResponse {
    let reports = db.read().await;
    let body = serde_json::to_string(&*reports).unwrap_or_else(|_| "[]".to_string());
    ([(header::CONTENT_TYPE, "application/json-download")], body)
}

/// CSV export of `rows` synthetic lines, 21 bytes each after the header.
async fn export_bulk(Query(bulk): Query<BulkExport>) -> impl IntoResponse {
    let mut csv = String::with_capacity(11 + bulk.rows * 21);
    csv.push_str("id,payload\n");
    for i in 0..bulk.rows {
        csv.push_str(&format!("{i:08},xxxxxxxxxxx\n"));
    }
    ([(header::CONTENT_TYPE, "text/csv")], csv)
}

async fn ping() -> &'static str {
    "pong"
}

async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: axum::http::HeaderMap,
    body: String,
) -> Json<Echo> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(Echo {
        method: method.to_string(),
        query,
        content_type,
        body,
    })
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn image() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G'])
}
