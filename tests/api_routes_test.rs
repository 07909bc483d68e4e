mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{response_json, TestApp};
use http_body_util::BodyExt;
use ppms_api::entities::UserRole;
use rstest::rstest;
use serde_json::json;

const BOUNDARY: &str = "ppms-test-boundary";

fn multipart_body(data_type: &str, file_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"data_type\"\r\n\r\n{dt}\r\n",
            b = BOUNDARY,
            dt = data_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n",
            b = BOUNDARY,
            f = file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(model_id: i64, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/models/{}/files", model_id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn responses_carry_envelope_and_request_id() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/v1/companies")
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-42");
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["requestId"], "trace-42");
}

#[tokio::test]
async fn errors_echo_the_generated_request_id() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::DELETE, "/api/v1/dip/groups/999", None)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let generated = response.headers()["x-request-id"]
        .to_str()
        .unwrap()
        .to_string();
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["request_id"], generated.as_str());
}

#[rstest]
#[case("/api/v1/statistics/order-month-summary?year=2025")]
#[case("/api/v1/statistics/order-month-summary?order_month=11")]
#[case("/api/v1/statistics/model-details?year=2025&order_month=11")]
#[case("/api/v1/statistics/aoi-performance?start_date=2025-11-30&end_date=2025-11-01")]
#[case("/api/v1/statistics/aoi-performance?start_date=yesterday&end_date=2025-11-01")]
#[tokio::test]
async fn statistics_reject_incomplete_queries(#[case] uri: &str) {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, uri, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_month_summary_accepts_month_labels() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            "/api/v1/statistics/order-month-summary?year=2025&order_month=11%EC%9B%94%EB%B6%84",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn reference_data_lifecycle() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/companies", Some(json!({ "name": " Hanil " })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let company = response_json(response).await["data"].clone();
    assert_eq!(company["name"], "Hanil");
    let company_id = company["id"].as_i64().unwrap();

    let duplicate = app
        .request(Method::POST, "/api/v1/companies", Some(json!({ "name": "Hanil" })))
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let blank = app
        .request(Method::POST, "/api/v1/companies", Some(json!({ "name": "   " })))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/v1/folders",
            Some(json!({ "companyId": company_id, "name": "Controllers" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let folder_id = response_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/models",
            Some(json!({ "companyId": company_id, "name": "AX-100", "folderId": folder_id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let model_id = response_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/models?folder_id={}", folder_id),
            None,
        )
        .await;
    let listed = response_json(response).await;
    assert_eq!(listed["data"][0]["name"], "AX-100");

    // The company still owns a folder and a model.
    let response = app
        .request(Method::DELETE, &format!("/api/v1/companies/{}", company_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(Method::DELETE, &format!("/api/v1/folders/{}", folder_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["deleted"], 1);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/models/{}", model_id),
            Some(json!({ "name": "AX-100B" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let model = response_json(response).await["data"].clone();
    assert_eq!(model["name"], "AX-100B");
    assert_eq!(model["folder_id"], json!(null));

    let response = app
        .request(Method::DELETE, &format!("/api/v1/models/{}", model_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::DELETE, &format!("/api/v1/companies/{}", company_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn model_files_upload_download_and_delete() {
    let app = TestApp::new().await;
    let reference = &app.state.services.reference;
    let company = reference.create_company("Hanil").await.unwrap();
    let model = reference
        .create_model(company.id, "AX-100", None)
        .await
        .unwrap();
    let model_id = i64::from(model.id);

    let response = app
        .send(upload_request(
            model_id,
            multipart_body("bom", "bom v1.csv", b"ref,part\nC1,10uF\n"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = response_json(response).await["data"].clone();
    assert_eq!(first["data_type"], "BOM");

    // Same data type replaces the stored file.
    let response = app
        .send(upload_request(
            model_id,
            multipart_body("BOM", "bom v2.csv", b"ref,part\nC1,22uF\n"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second = response_json(response).await["data"].clone();
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["file_name"], "bom v2.csv");
    let file_id = second["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/models/{}/files", model_id),
            None,
        )
        .await;
    let listed = response_json(response).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/models/{}/files/{}", model_id, file_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("filename*=UTF-8''bom%20v2.csv"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ref,part\nC1,22uF\n");

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/models/{}/files/{}", model_id, file_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/models/{}/files/{}", model_id, file_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_data_type_is_rejected() {
    let app = TestApp::new().await;
    let reference = &app.state.services.reference;
    let company = reference.create_company("Hanil").await.unwrap();
    let model = reference
        .create_model(company.id, "AX-100", None)
        .await
        .unwrap();

    let response = app
        .send(upload_request(
            i64::from(model.id),
            multipart_body("  ", "coords.csv", b"x,y\n"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_then_session() {
    let app = TestApp::new().await;
    app.state
        .services
        .auth
        .create_or_reset_user("planner", "line-2-pass", UserRole::Admin)
        .await
        .unwrap();

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "planner", "password": "wrong" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "planner", "password": "line-2-pass" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = response_json(response).await;
    assert_eq!(login["data"]["role"], "admin");
    let token = login["data"]["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/auth/session")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = response_json(response).await;
    assert_eq!(session["data"]["isLoggedIn"], true);
    assert_eq!(session["data"]["username"], "planner");

    let response = app.request(Method::GET, "/auth/session", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.request(Method::POST, "/auth/logout", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["logged_out"], true);
}

#[tokio::test]
async fn health_and_docs_are_served() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = response_json(response).await;
    assert_eq!(doc["info"]["title"], "PPMS API");
}
