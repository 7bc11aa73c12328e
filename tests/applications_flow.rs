mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, json_body, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

async fn post_job(app: &TestApp, token: &str, title: &str) -> Result<String> {
    let body = json!({
        "title": title,
        "date": "2024-06-10",
        "start_time": "07:00",
        "end_time": "19:00"
    });
    let response = app.post_json("/api/jobs", &body, Some(token)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    Ok(json_body(response).await?["id"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}

async fn apply(app: &TestApp, token: &str, job_id: &str) -> Result<hyper::Response<axum::body::Body>> {
    app.post_json("/api/applications/apply", &json!({ "job_id": job_id }), Some(token))
        .await
}

#[tokio::test]
async fn one_application_per_job_and_doctor() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, hospital) = app.user_with_token("Hospital Vida", "hospital", Some("free")).await?;
    let (doctor_id, doctor) = app.user_with_token("Dr Reis", "doctor", None).await?;
    let job_id = post_job(&app, &hospital, "UTI noturno").await?;

    let first = apply(&app, &doctor, &job_id).await?;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = json_body(first).await?;
    assert_eq!(first["status"], "pending");
    assert_eq!(first["doctor_id"], doctor_id.to_string());

    let second = apply(&app, &doctor, &job_id).await?;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(second).await?["error"], "already applied for this job");

    let mine = json_body(app.get("/api/applications/my-applications", Some(&doctor)).await?).await?;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    assert_eq!(mine[0]["title"], "UTI noturno");
    assert_eq!(mine[0]["hospital_name"], "Hospital Vida");

    let missing = apply(&app, &doctor, &Uuid::new_v4().to_string()).await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let (_, nurse) = app.user_with_token("Enf Rosa", "nurse", None).await?;
    let nurse_apply = apply(&app, &nurse, &job_id).await?;
    assert_eq!(nurse_apply.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn only_the_owning_hospital_decides() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, owner) = app.user_with_token("Hospital Alfa", "hospital", Some("free")).await?;
    let (_, rival) = app.user_with_token("Hospital Beta", "hospital", Some("free")).await?;
    let (_, first_doctor) = app.user_with_token("Dr Primeiro", "doctor", None).await?;
    let (_, second_doctor) = app.user_with_token("Dr Segundo", "doctor", None).await?;
    let job_id = post_job(&app, &owner, "Pronto socorro").await?;

    let application = json_body(apply(&app, &first_doctor, &job_id).await?).await?;
    let application_id = application["id"].as_str().unwrap_or_default().to_string();
    apply(&app, &second_doctor, &job_id).await?;

    let listing_path = format!("/api/applications/job/{job_id}");
    let foreign_listing = app.get(&listing_path, Some(&rival)).await?;
    assert_eq!(foreign_listing.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(foreign_listing).await?["error"],
        "not authorized or resource not found"
    );

    let listing = json_body(app.get(&listing_path, Some(&owner)).await?).await?;
    let names: Vec<&str> = listing
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| row["doctor_name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Dr Primeiro", "Dr Segundo"]);

    let status_path = format!("/api/applications/{application_id}/status");
    let foreign_decision = app
        .patch_json(&status_path, &json!({ "status": "accepted" }), Some(&rival))
        .await?;
    assert_eq!(foreign_decision.status(), StatusCode::FORBIDDEN);

    let doctor_decision = app
        .patch_json(&status_path, &json!({ "status": "accepted" }), Some(&first_doctor))
        .await?;
    assert_eq!(doctor_decision.status(), StatusCode::FORBIDDEN);

    let approved = app
        .patch_json(&status_path, &json!({ "status": "approved" }), Some(&owner))
        .await?;
    assert_eq!(approved.status(), StatusCode::BAD_REQUEST);
    let unchanged = json_body(app.get(&listing_path, Some(&owner)).await?).await?;
    assert_eq!(unchanged[0]["status"], "pending");

    let accepted = app
        .patch_json(&status_path, &json!({ "status": "accepted" }), Some(&owner))
        .await?;
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(json_body(accepted).await?["status"], "accepted");

    let reversed = app
        .patch_json(&status_path, &json!({ "status": "rejected" }), Some(&owner))
        .await?;
    assert_eq!(json_body(reversed).await?["status"], "rejected");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn closed_jobs_take_no_applications() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, hospital) = app.user_with_token("Hospital Gama", "hospital", Some("free")).await?;
    let (_, doctor) = app.user_with_token("Dra Luz", "doctor", None).await?;
    let job_id = post_job(&app, &hospital, "Enfermaria").await?;

    let closed = app
        .patch_json(&format!("/api/jobs/{job_id}/close"), &Value::Null, Some(&hospital))
        .await?;
    assert_eq!(closed.status(), StatusCode::OK);

    let response = apply(&app, &doctor, &job_id).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn apply_requires_a_job_id() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, doctor) = app.user_with_token("Dr Sem Vaga", "doctor", None).await?;

    let response = app
        .post_json("/api/applications/apply", &json!({}), Some(&doctor))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await?["error"], "job_id is required");

    let not_json = app
        .post_json("/api/applications/apply", &json!({ "job_id": 42 }), Some(&doctor))
        .await?;
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(not_json).await?["error"].is_string());

    app.cleanup().await?;
    Ok(())
}
