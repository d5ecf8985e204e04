//! Document upload and the diagnostics check against a mock backend.

mod fixtures;

use std::sync::Arc;

use fixtures::{can_bind_localhost, client, error_response, signed_in_store};
use matcher::api_client::{ApiError, RecordingEvents, SessionEvent};
use matcher::docs::DocsService;
use matcher::errors::MatcherError;
use matcher::upload::{
    PendingUpload, SelectedFile, UploadError, MEDIA_TYPE_DOCX, MEDIA_TYPE_PDF,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ready_upload() -> PendingUpload {
    let mut pending = PendingUpload::new();
    pending
        .select_job_description(vec![SelectedFile::new(
            "jd.pdf",
            MEDIA_TYPE_PDF,
            "job description text",
        )])
        .unwrap();
    pending
        .add_resumes(vec![
            SelectedFile::new("alice.pdf", MEDIA_TYPE_PDF, "alice resume"),
            SelectedFile::new("bob.docx", MEDIA_TYPE_DOCX, "bob resume"),
        ])
        .unwrap();
    pending
}

#[tokio::test]
async fn test_upload_sends_multipart_and_decodes_reports() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/docs/upload"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reports": [
                {"candidateName": "Alice", "s3Files": {"docx": "https://s3/a.docx", "pdf": "https://s3/a.pdf"}},
                {"candidateName": "Bob", "s3Files": {"docx": "https://s3/b.docx", "pdf": "https://s3/b.pdf"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let events = Arc::new(RecordingEvents::default());
    let docs = DocsService::new(client(&server.uri(), signed_in_store(), events.clone()));

    let mut pending = ready_upload();
    let reports = docs.submit(&mut pending).await.unwrap();
    assert_eq!(pending, PendingUpload::new());

    let names: Vec<&str> = reports
        .reports
        .iter()
        .map(|r| r.candidate_name.as_str())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
    assert_eq!(reports.reports[1].s3_files.pdf, "https://s3/b.pdf");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(r#"name="jobDescription"; filename="jd.pdf""#));
    assert!(body.contains(r#"name="resumes"; filename="alice.pdf""#));
    assert!(body.contains(r#"name="resumes"; filename="bob.docx""#));
    assert!(body.contains(r#"name="schoolId""#));
    assert!(body.contains("bob resume"));
    assert!(events.events().is_empty());
}

#[tokio::test]
async fn test_failed_upload_keeps_selection() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/docs/upload"))
        .respond_with(error_response(500, "Matching service unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let events = Arc::new(RecordingEvents::default());
    let docs = DocsService::new(client(&server.uri(), signed_in_store(), events.clone()));

    let mut pending = ready_upload();
    let before = pending.clone();

    let err = docs.submit(&mut pending).await.unwrap_err();

    assert!(matches!(err, MatcherError::Api(ApiError::Server { status: 500, .. })));
    assert_eq!(pending, before);
    assert_eq!(pending.job_description().map(|f| f.name.as_str()), Some("jd.pdf"));
    assert_eq!(pending.resumes().len(), 2);
    assert_eq!(
        events.events(),
        vec![SessionEvent::Error("Matching service unavailable".to_string())]
    );
}

#[tokio::test]
async fn test_incomplete_selection_never_reaches_the_network() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/docs/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reports": []})))
        .expect(0)
        .mount(&server)
        .await;

    let docs = DocsService::new(client(
        &server.uri(),
        signed_in_store(),
        Arc::new(RecordingEvents::default()),
    ));

    let mut pending = PendingUpload::new();
    let err = docs.submit(&mut pending).await.unwrap_err();
    assert!(matches!(err, MatcherError::Validation(UploadError::IncompleteSelection)));
}

#[tokio::test]
async fn test_check_test_posts_profile() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test/checkTest"))
        .and(body_partial_json(json!({
            "user": {"email": "a@b.com", "name": "Ada", "school.id": "7"},
            "schoolId": 7
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store();
    let events = Arc::new(RecordingEvents::default());
    let docs = DocsService::new(client(&server.uri(), store.clone(), events));

    let user = store.user().unwrap();
    let response = docs.check_test(&user).await.unwrap();
    assert_eq!(response, json!({"status": "ok"}));
}
