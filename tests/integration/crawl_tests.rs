//! Integration tests for the orchestrator
//!
//! These tests use wiremock to create mock HTTP servers and drive jobs
//! through admission, fetch, analysis and the broken-link sample.

use sitelens::config::{load_config, CrawlSettings};
use sitelens::crawler::PLACEHOLDER_LINK_TEXT;
use sitelens::state::JobStatus;
use sitelens::storage::{CrawlJob, JobStore, SqliteJobStore};
use sitelens::{AdmitError, Orchestrator};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestOrchestrator = Orchestrator<SqliteJobStore>;

fn create_orchestrator(max_concurrent_crawls: usize, fetch_timeout: Duration) -> TestOrchestrator {
    let settings = CrawlSettings {
        max_concurrent_crawls,
        fetch_timeout,
        user_agent: "TestBot/1.0".to_string(),
        ..CrawlSettings::default()
    };
    let store = SqliteJobStore::new_in_memory().expect("Failed to open store");
    Orchestrator::new(settings, Arc::new(Mutex::new(store))).expect("Failed to build orchestrator")
}

fn get_job(orchestrator: &TestOrchestrator, job_id: &str) -> CrawlJob {
    let store = orchestrator.store();
    let store = store.lock().unwrap();
    store.get_job(job_id).expect("Job should exist")
}

/// Polls the store until the job reaches `status`
async fn wait_for_status(orchestrator: &TestOrchestrator, job_id: &str, status: JobStatus) -> CrawlJob {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = get_job(orchestrator, job_id);
        if job.status == status {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} stuck in {} waiting for {}",
            job_id,
            job.status,
            status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// An address nothing listens on
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/offline", port)
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_extracts_metadata() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let offline = closed_port_url();

    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<!DOCTYPE html><html><head><title> Home Page </title></head><body>
            <h1>Welcome</h1><h2>One</h2><h2>Two</h2><h3>Three</h3>
            <a href="/ok">Fine</a>
            <a href="/missing">Missing page</a>
            <a href="{base}/absolute"></a>
            <a href="{offline}">Offline</a>
            <form action="/login">
              <input type="email" name="user_email">
              <input type="password" name="password">
            </form>
            </body></html>"#,
            base = base_url,
            offline = offline
        ),
    )
    .await;

    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/absolute"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let orchestrator = create_orchestrator(2, Duration::from_secs(5));
    let job = orchestrator.submit(&format!("{}/", base_url)).unwrap();
    orchestrator.admit(&job.id).unwrap();

    let job = wait_for_status(&orchestrator, &job.id, JobStatus::Completed).await;
    let metadata = job.metadata.expect("Completed job should have metadata");

    assert_eq!(metadata.title, "Home Page");
    assert_eq!(metadata.html_version, "HTML5");
    assert_eq!(metadata.heading_counts.as_array(), [1, 2, 1, 0, 0, 0]);
    assert!(metadata.has_login_form);
    assert!(job.crawled_at.is_some());
    assert!(job.error_message.is_none());

    assert_eq!(
        metadata.internal_links,
        vec![
            format!("{}/ok", base_url),
            format!("{}/missing", base_url),
            format!("{}/absolute", base_url),
        ]
    );
    assert_eq!(metadata.external_links, vec![offline.clone()]);

    // /missing has no HEAD mock, so wiremock answers 404
    let broken: Vec<(String, u16, String)> = metadata
        .broken_links
        .iter()
        .map(|b| (b.url.clone(), b.status_code, b.text.clone()))
        .collect();
    assert_eq!(
        broken,
        vec![
            (format!("{}/missing", base_url), 404, "Missing page".to_string()),
            (format!("{}/absolute", base_url), 410, PLACEHOLDER_LINK_TEXT.to_string()),
            (offline, 0, "Offline".to_string()),
        ]
    );

    orchestrator.wait_idle().await;
    assert!(!orchestrator.is_active(&job.id));
}

#[tokio::test]
async fn test_fetch_timeout_records_error_and_frees_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/fast", "<title>Fast</title>".to_string()).await;

    let orchestrator = create_orchestrator(1, Duration::from_millis(300));
    let slow = orchestrator
        .submit(&format!("{}/slow", mock_server.uri()))
        .unwrap();
    orchestrator.admit(&slow.id).unwrap();

    let slow = wait_for_status(&orchestrator, &slow.id, JobStatus::Error).await;
    let message = slow.error_message.expect("Error job should have a message");
    assert!(message.contains("timeout"), "unexpected message: {}", message);
    assert!(slow.metadata.is_none());

    orchestrator.wait_idle().await;
    assert_eq!(orchestrator.active_count(), 0);

    let fast = orchestrator
        .submit(&format!("{}/fast", mock_server.uri()))
        .unwrap();
    orchestrator.admit(&fast.id).unwrap();
    let fast = wait_for_status(&orchestrator, &fast.id, JobStatus::Completed).await;
    assert_eq!(fast.metadata.unwrap().title, "Fast");
}

#[tokio::test]
async fn test_non_success_status_records_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let orchestrator = create_orchestrator(1, Duration::from_secs(5));
    let job = orchestrator
        .submit(&format!("{}/down", mock_server.uri()))
        .unwrap();
    orchestrator.admit(&job.id).unwrap();

    let job = wait_for_status(&orchestrator, &job.id, JobStatus::Error).await;
    assert!(job.error_message.unwrap().contains("HTTP 503"));
}

#[tokio::test]
async fn test_binary_body_records_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec()))
        .mount(&mock_server)
        .await;

    let orchestrator = create_orchestrator(1, Duration::from_secs(5));
    let job = orchestrator
        .submit(&format!("{}/logo.png", mock_server.uri()))
        .unwrap();
    orchestrator.admit(&job.id).unwrap();

    let job = wait_for_status(&orchestrator, &job.id, JobStatus::Error).await;
    assert!(job.error_message.unwrap().contains("HTML parse error"));
}

#[tokio::test]
async fn test_admission_rejections() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Slow</title>")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let orchestrator = create_orchestrator(2, Duration::from_secs(5));
    let jobs: Vec<_> = (0..3)
        .map(|i| {
            orchestrator
                .submit(&format!("{}/page{}", mock_server.uri(), i))
                .unwrap()
        })
        .collect();

    orchestrator.admit(&jobs[0].id).unwrap();
    assert_eq!(
        orchestrator.admit(&jobs[0].id),
        Err(AdmitError::AlreadyActive {
            job_id: jobs[0].id.clone()
        })
    );

    orchestrator.admit(&jobs[1].id).unwrap();
    assert_eq!(
        orchestrator.admit(&jobs[2].id),
        Err(AdmitError::CapacityExceeded { max: 2 })
    );
    assert_eq!(orchestrator.active_count(), 2);
    assert_eq!(get_job(&orchestrator, &jobs[2].id).status, JobStatus::Queued);

    orchestrator.wait_idle().await;
    for job in &jobs[..2] {
        wait_for_status(&orchestrator, &job.id, JobStatus::Completed).await;
    }

    orchestrator.admit(&jobs[2].id).unwrap();
    wait_for_status(&orchestrator, &jobs[2].id, JobStatus::Completed).await;
}

#[tokio::test]
async fn test_requeue_reruns_failed_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/flaky", "<title>Back up</title><h1>ok</h1>".to_string()).await;

    let orchestrator = create_orchestrator(1, Duration::from_secs(5));
    let job = orchestrator
        .submit(&format!("{}/flaky", mock_server.uri()))
        .unwrap();
    orchestrator.admit(&job.id).unwrap();
    wait_for_status(&orchestrator, &job.id, JobStatus::Error).await;
    orchestrator.wait_idle().await;

    assert_eq!(
        orchestrator.admit(&job.id),
        Err(AdmitError::NotQueued {
            job_id: job.id.clone(),
            status: JobStatus::Error,
        })
    );
    assert_eq!(orchestrator.active_count(), 0);

    orchestrator.requeue(&job.id).unwrap();
    orchestrator.admit(&job.id).unwrap();

    let rerun = wait_for_status(&orchestrator, &job.id, JobStatus::Completed).await;
    assert_eq!(rerun.error_message, None);
    assert_eq!(rerun.metadata.unwrap().title, "Back up");

    orchestrator.wait_idle().await;
    assert_eq!(
        orchestrator.admit(&job.id),
        Err(AdmitError::NotQueued {
            job_id: job.id.clone(),
            status: JobStatus::Completed,
        })
    );
}

#[tokio::test]
async fn test_admit_many_reports_refusals() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "<title>x</title>".to_string()).await;

    let orchestrator = create_orchestrator(1, Duration::from_secs(5));
    let first = orchestrator.submit(&format!("{}/", mock_server.uri())).unwrap();
    let second = orchestrator.submit(&format!("{}/", mock_server.uri())).unwrap();

    let refused = orchestrator.admit_many([first.id.as_str(), second.id.as_str()]);

    assert_eq!(
        refused,
        vec![(second.id.clone(), AdmitError::CapacityExceeded { max: 1 })]
    );
    wait_for_status(&orchestrator, &first.id, JobStatus::Completed).await;
}

#[tokio::test]
async fn test_cancel_running_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Late</title>")
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&mock_server)
        .await;

    let orchestrator = create_orchestrator(1, Duration::from_secs(5));
    let job = orchestrator.submit(&format!("{}/", mock_server.uri())).unwrap();
    orchestrator.admit(&job.id).unwrap();
    wait_for_status(&orchestrator, &job.id, JobStatus::Running).await;

    assert!(orchestrator.cancel(&job.id).unwrap());
    assert!(!orchestrator.is_active(&job.id));
    assert_eq!(orchestrator.active_count(), 0);
    assert_eq!(get_job(&orchestrator, &job.id).status, JobStatus::Queued);

    // a second cancel is a no-op
    assert!(!orchestrator.cancel(&job.id).unwrap());
}

#[tokio::test]
async fn test_broken_link_sample_is_bounded() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let anchors: String = (0..100)
        .map(|i| format!(r#"<a href="/link{}">Link {}</a>"#, i, i))
        .collect();
    mount_page(&mock_server, "/", format!("<html><body>{}</body></html>", anchors)).await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(10)
        .mount(&mock_server)
        .await;

    let orchestrator = create_orchestrator(1, Duration::from_secs(5));
    let job = orchestrator.submit(&format!("{}/", base_url)).unwrap();
    orchestrator.admit(&job.id).unwrap();

    let job = wait_for_status(&orchestrator, &job.id, JobStatus::Completed).await;
    let metadata = job.metadata.unwrap();

    assert_eq!(metadata.internal_links.len(), 100);
    assert_eq!(metadata.broken_links.len(), 10);
    assert_eq!(metadata.broken_links[0].url, format!("{}/link0", base_url));
    assert_eq!(metadata.broken_links[9].url, format!("{}/link9", base_url));
    assert_eq!(metadata.broken_links[9].text, "Link 9");
}

#[tokio::test]
async fn test_settings_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
max-concurrent-crawls = 3
fetch-timeout-secs = 2

[user-agent]
crawler-name = "ConfigBot"
crawler-version = "0.1"

[storage]
database-path = "{}"
"#,
        db_path.display()
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let settings = CrawlSettings::from(&config);
    assert_eq!(settings.max_concurrent_crawls, 3);
    assert_eq!(settings.fetch_timeout, Duration::from_secs(2));
    assert_eq!(settings.user_agent, "ConfigBot/0.1");

    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "<h1>Persisted</h1>".to_string()).await;

    let store = SqliteJobStore::new(&db_path).unwrap();
    let orchestrator = Orchestrator::new(settings, Arc::new(Mutex::new(store))).unwrap();
    let job = orchestrator.submit(&format!("{}/", mock_server.uri())).unwrap();
    orchestrator.admit(&job.id).unwrap();
    wait_for_status(&orchestrator, &job.id, JobStatus::Completed).await;
    drop(orchestrator);

    let reopened = SqliteJobStore::new(&db_path).unwrap();
    let job = reopened.get_job(&job.id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.metadata.unwrap().heading_counts.h1, 1);
}
