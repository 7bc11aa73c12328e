mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, json_body, Part, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

async fn hire(app: &TestApp, hospital: &str, professional: &str) -> Result<()> {
    let job = app
        .post_json(
            "/api/jobs",
            &json!({
                "title": "Ambulatorio",
                "date": "2024-03-04",
                "start_time": "08:00",
                "end_time": "14:00"
            }),
            Some(hospital),
        )
        .await?;
    let job_id = json_body(job).await?["id"].as_str().unwrap_or_default().to_string();
    let application = app
        .post_json("/api/applications/apply", &json!({ "job_id": job_id }), Some(professional))
        .await?;
    let application_id = json_body(application).await?["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let decided = app
        .patch_json(
            &format!("/api/applications/{application_id}/status"),
            &json!({ "status": "accepted" }),
            Some(hospital),
        )
        .await?;
    assert_eq!(decided.status(), StatusCode::OK);
    Ok(())
}

async fn upload(
    app: &TestApp,
    token: &str,
    recipient: Uuid,
    month: &str,
) -> Result<hyper::Response<axum::body::Body>> {
    let recipient = recipient.to_string();
    app.post_multipart(
        "/api/documents/upload",
        &[
            Part::File {
                name: "document",
                filename: "Holerite Marco.PDF",
                content_type: "application/pdf",
                data: b"%PDF-1.4 payslip",
            },
            Part::Text("user_id", &recipient),
            Part::Text("month", month),
            Part::Text("file_name", "Holerite marco"),
        ],
        token,
    )
    .await
}

fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row["file_name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn documents_reach_only_their_recipient() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, hospital) = app.user_with_token("Hospital Doc", "hospital", Some("gold")).await?;
    let (employee_id, employee) = app.user_with_token("Dr Empregado", "doctor", None).await?;
    let (_, bystander) = app.user_with_token("Dr Outro", "doctor", None).await?;
    hire(&app, &hospital, &employee).await?;

    let employees = json_body(app.get("/api/documents/my-employees", Some(&hospital)).await?).await?;
    assert_eq!(employees[0]["id"], employee_id.to_string());

    let response = upload(&app, &hospital, employee_id, "2024-03").await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let document = json_body(response).await?;
    assert_eq!(document["month"], "2024-03");
    let file_url = document["file_url"].as_str().unwrap_or_default().to_string();
    assert!(file_url.starts_with("/uploads/documents/doc-"));
    assert!(file_url.ends_with(".pdf"));

    let sent = json_body(app.get("/api/documents/sent", Some(&hospital)).await?).await?;
    assert_eq!(names(&sent), vec!["Holerite marco"]);
    assert_eq!(sent[0]["recipient_name"], "Dr Empregado");

    let mine = json_body(app.get("/api/documents/mine", Some(&employee)).await?).await?;
    assert_eq!(names(&mine), vec!["Holerite marco"]);
    assert_eq!(mine[0]["uploader_name"], "Hospital Doc");

    let other = json_body(app.get("/api/documents/mine", Some(&bystander)).await?).await?;
    assert!(names(&other).is_empty());

    let served = app.get(&file_url, None).await?;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(
        served.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );
    assert_eq!(body_to_vec(served.into_body()).await?, b"%PDF-1.4 payslip".to_vec());

    let missing = app.get("/uploads/documents/nope.pdf", None).await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn uploads_are_restricted() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (hospital_id, hospital) = app.user_with_token("Hospital Restrito", "hospital", Some("gold")).await?;
    let (stranger_id, stranger) = app.user_with_token("Dra Estranha", "doctor", None).await?;
    let (_, admin) = app.user_with_token("Admin Geral", "admin", None).await?;

    let not_employee = upload(&app, &hospital, stranger_id, "2024-03").await?;
    assert_eq!(not_employee.status(), StatusCode::FORBIDDEN);

    let from_doctor = upload(&app, &stranger, hospital_id, "2024-03").await?;
    assert_eq!(from_doctor.status(), StatusCode::FORBIDDEN);

    let to_hospital = upload(&app, &admin, hospital_id, "2024-03").await?;
    assert_eq!(to_hospital.status(), StatusCode::BAD_REQUEST);

    let bad_month = upload(&app, &admin, stranger_id, "marco").await?;
    assert_eq!(bad_month.status(), StatusCode::BAD_REQUEST);

    let unknown = upload(&app, &admin, Uuid::new_v4(), "2024-03").await?;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let from_admin = upload(&app, &admin, stranger_id, "2024-03").await?;
    assert_eq!(from_admin.status(), StatusCode::CREATED);
    assert_eq!(app.storage().keys().await.len(), 1);

    let employees = app.get("/api/documents/my-employees", Some(&stranger)).await?;
    assert_eq!(employees.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}
