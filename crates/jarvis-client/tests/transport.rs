//! Integration tests for timeouts, unreachable servers, and response decoding.


use std::time::Duration;

use fixtures::{TestClient, bearer, can_bind_localhost};
use jarvis_client::api::ResumeFormat;
use jarvis_client::{ApiClient, ClientError, Config, RequestOptions, SessionStore};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_slow_response_times_out() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let t = TestClient::with_timeout(&server, Duration::from_millis(200));

    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = t.client.jobs().list(&[]).await.unwrap_err();
    assert_eq!(err, ClientError::Timeout(Duration::from_millis(200)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    // Grab a free port and release it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = Config::new(&format!("http://127.0.0.1:{port}")).unwrap();
    let client = ApiClient::new(config, SessionStore::in_memory()).unwrap();

    let err = client.jobs().list(&[]).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_server_error_detail_is_surfaced() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let t = TestClient::new(&server);
    t.sign_in("T1", "R1");

    Mock::given(method("POST"))
        .and(path("/api/applications/apply"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"detail": "Already applied to this job"})),
        )
        .mount(&server)
        .await;

    let err = t
        .client
        .applications()
        .apply(json!({"job_id": 12}))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Api {
            status: 409,
            detail: "Already applied to this job".to_string(),
        }
    );
}

#[tokio::test]
async fn test_download_returns_binary_body() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let t = TestClient::new(&server);
    t.sign_in("T1", "R1");

    let docx = vec![0x50, 0x4b, 0x03, 0x04, 0xff, 0x00];
    Mock::given(method("GET"))
        .and(path("/api/resumes/5/download"))
        .and(query_param("format", "docx"))
        .and(header("authorization", bearer("T1").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-type",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                )
                .set_body_bytes(docx.clone()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bytes = t
        .client
        .resumes()
        .download(5, ResumeFormat::Docx)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), docx.as_slice());
}

#[tokio::test]
async fn test_query_parameters_and_empty_bodies() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let t = TestClient::new(&server);
    t.sign_in("T1", "R1");

    Mock::given(method("GET"))
        .and(path("/api/emails/inbox"))
        .and(query_param("unread", "true"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/emails/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let inbox = t
        .client
        .emails()
        .inbox(&[("unread", "true"), ("limit", "20")])
        .await
        .unwrap();
    assert_eq!(inbox, json!({"items": []}));
    t.client.emails().delete(3).await.unwrap();
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let t = TestClient::new(&server);

    Mock::given(method("GET"))
        .and(path("/api/jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = t
        .client
        .get("/api/jobs/1", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_clones_share_session_state() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let t = TestClient::new(&server);
    let clone = t.client.clone();

    t.sign_in("T1", "R1");
    assert_eq!(clone.session().unwrap().unwrap().access_token, "T1");
    clone.clear_session().unwrap();
    assert!(t.client.session().unwrap().is_none());
}
