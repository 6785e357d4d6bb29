//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use superfund_ai_service::{AdvisorService, ServiceConfig, HELP_TEXT};
use superfund_rpc::{build_router, AppState, STATUS_NOTE};
use tempfile::TempDir;
use tower::ServiceExt;

const DATA: &str = "\
Investment_Name,Risk_Level,Expense_Ratio,AUM_millions,5yr_Return
Alpha,Low,0.10,120,4.2
Beta,Low,0.15,80,6.1
Gamma,Medium,0.20,300,7.5
Delta,Medium,0.25,,8.0
Epsilon,High,0.40,50,11.2
Eta,Medium,0.30,200,7.9
Theta,Low,,90,5.0
Iota,High,0.50,60,12.4
Kappa,Medium,0.22,210,7.1
";

fn router(dir: &TempDir, data: &str) -> Router {
    let dataset_path = dir.path().join("Data_1.csv");
    fs::write(&dataset_path, data).unwrap();
    let service = AdvisorService::new(ServiceConfig {
        dataset_path,
        model_path: dir.path().join("investment_model.json"),
        recipe_path: dir.path().join("preprocessor_pipeline.json"),
        ..ServiceConfig::default()
    });
    build_router(Arc::new(AppState::new(service))).unwrap()
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_status() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, body) = send(&router, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "note": STATUS_NOTE}));
}

#[tokio::test]
async fn test_predict_before_training() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, body) = send(
        &router,
        Method::POST,
        "/predict",
        Some(json!({"features": {"Risk_Level": "Low"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Model not available. Call /train first.");
}

#[tokio::test]
async fn test_train_then_predict() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, body) = send(&router, Method::POST, "/train?test_size=0.25", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Model trained and saved.");
    assert!(body["trainMAE"].is_f64());
    assert!(body["validationMAE"].is_f64());

    let (status, body) = send(
        &router,
        Method::POST,
        "/predict",
        Some(json!({"features": {"Risk_Level": "Low", "Expense_Ratio": 0.12}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted5yrReturn"].is_f64());
}

#[tokio::test]
async fn test_predict_rejects_text_in_numeric_column() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);
    send(&router, Method::POST, "/train", None).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/predict",
        Some(json!({"features": {"Expense_Ratio": "cheap"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Prediction failed:"));
}

#[tokio::test]
async fn test_train_without_target() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, "Investment_Name,Risk_Level\nAlpha,Low\nBeta,High\n");

    let (status, body) = send(&router, Method::POST, "/train", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Target column '5yr_Return' not found in CSV.");
}

#[tokio::test]
async fn test_train_with_invalid_test_size() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, _) = send(&router, Method::POST, "/train?test_size=1.5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, body) = send(&router, Method::POST, "/recommendations?risk=low", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "risk": "low",
            "topOptions": [
                {"investmentName": "Beta", "riskLevel": "Low", "fiveYearReturn": 6.1},
                {"investmentName": "Theta", "riskLevel": "Low", "fiveYearReturn": 5.0},
                {"investmentName": "Alpha", "riskLevel": "Low", "fiveYearReturn": 4.2}
            ]
        })
    );
}

#[tokio::test]
async fn test_recommendations_without_match() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, body) = send(&router, Method::POST, "/recommendations?risk=wild", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No investments found for risk 'wild'");
}

#[tokio::test]
async fn test_recommendations_require_risk() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, _) = send(&router, Method::POST, "/recommendations", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations_without_risk_column() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, "Investment_Name,5yr_Return\nAlpha,4.2\n");

    let (status, body) = send(&router, Method::POST, "/recommendations?risk=low", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "CSV is missing 'Risk_Level' column required for filtering."
    );
}

#[tokio::test]
async fn test_chat_help() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, body) = send(&router, Method::POST, "/chat", Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], HELP_TEXT);
}

#[tokio::test]
async fn test_chat_never_fails() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let (status, body) = send(
        &router,
        Method::POST,
        "/chat",
        Some(json!({"message": "hi", "risk": "wild", "features": {"Risk_Level": "Low"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["response"],
        "Couldn't find CSV recommendations: No investments found for risk 'wild'\n\
         Prediction unavailable: Model not available. Call /train first."
    );
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir, DATA);

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let response = router
        .clone()
        .oneshot(preflight("http://localhost:8080"))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:8080"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");

    let response = router
        .clone()
        .oneshot(preflight("http://evil.example"))
        .await
        .unwrap();
    assert_ne!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://evil.example"
    );
}
