mod common;

use idm_client::common::api::models::task::{DownloadStatus, DownloadTask};
use idm_client::downloader::error::MaterializeError;
use idm_client::downloader::saver::DirectorySaver;
use idm_client::downloader::{DEFAULT_FILE_NAME, FileMaterializer};
use idm_client::{ApiError, ErrorKind};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn task(id: &str, status: DownloadStatus) -> DownloadTask {
    DownloadTask {
        id: Some(id.to_string()),
        url: Some(format!("https://example.com/{}.bin", id)),
        download_status: Some(status),
        ..Default::default()
    }
}

async fn mount_file(server: &MockServer, id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/tasks/{}/files", id)))
        .respond_with(response)
        .mount(server)
        .await;
}

fn dir_is_empty(dir: &tempfile::TempDir) -> bool {
    std::fs::read_dir(dir.path()).unwrap().next().is_none()
}

#[tokio::test]
async fn successful_task_is_saved_and_url_released() {
    let (server, api, session) = common::start().await;
    mount_file(
        &server,
        "5",
        ResponseTemplate::new(200).set_body_json(json!({ "result": { "data": "aGVsbG8=" } })),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let saver = DirectorySaver::new(dir.path());
    let materializer = FileMaterializer::new(api);

    let saved = materializer
        .download(&session, &task("5", DownloadStatus::Success), &saver)
        .await
        .unwrap();

    assert_eq!(saved.path, dir.path().join(DEFAULT_FILE_NAME));
    assert_eq!(saved.size, 5);
    assert_eq!(std::fs::read(&saved.path).unwrap(), b"hello");
    assert!(materializer.registry().is_empty());

    // 第二次保存不覆盖第一次的文件
    let again = materializer
        .download(&session, &task("5", DownloadStatus::Success), &saver)
        .await
        .unwrap();
    assert_eq!(again.path, dir.path().join("download (1)"));
    assert!(materializer.registry().is_empty());
}

#[tokio::test]
async fn invalid_base64_saves_nothing() {
    let (server, api, session) = common::start().await;
    mount_file(
        &server,
        "6",
        ResponseTemplate::new(200).set_body_json(json!({ "result": { "data": "not-base64!!" } })),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let materializer = FileMaterializer::new(api);
    let err = materializer
        .download(
            &session,
            &task("6", DownloadStatus::Success),
            &DirectorySaver::new(dir.path()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MaterializeError::Base64(_)));
    assert_eq!(err.kind(), Some(ErrorKind::Decode));
    assert!(dir_is_empty(&dir));
    assert!(materializer.registry().is_empty());
}

#[tokio::test]
async fn unfinished_tasks_are_refused_without_a_request() {
    let (server, api, session) = common::start().await;
    let dir = tempfile::tempdir().unwrap();
    let saver = DirectorySaver::new(dir.path());
    let materializer = FileMaterializer::new(api);

    for status in [
        DownloadStatus::Pending,
        DownloadStatus::Downloading,
        DownloadStatus::Failed,
        DownloadStatus::UndefinedStatus,
    ] {
        let err = materializer
            .download(&session, &task("7", status), &saver)
            .await
            .unwrap_err();
        assert!(matches!(err, MaterializeError::NotDownloadable(s) if s == status));
    }

    assert_eq!(common::request_count(&server).await, 0);
    assert!(dir_is_empty(&dir));
}

#[tokio::test]
async fn response_outside_the_envelope_is_a_decode_error() {
    let (server, api, session) = common::start().await;
    mount_file(
        &server,
        "8",
        ResponseTemplate::new(200)
            .set_body_json(json!({ "error": { "code": 5, "message": "gone" } })),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let err = FileMaterializer::new(api)
        .download(
            &session,
            &task("8", DownloadStatus::Success),
            &DirectorySaver::new(dir.path()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MaterializeError::Api(ApiError::InvalidResponse(_))));
    assert_eq!(err.kind(), Some(ErrorKind::Decode));
    assert!(dir_is_empty(&dir));
}

#[tokio::test]
async fn missing_file_surfaces_the_status() {
    let (server, api, session) = common::start().await;
    mount_file(
        &server,
        "9",
        ResponseTemplate::new(404).set_body_json(json!({ "code": 5, "message": "not found" })),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let materializer = FileMaterializer::new(api);
    let err = materializer
        .download(
            &session,
            &task("9", DownloadStatus::Success),
            &DirectorySaver::new(dir.path()),
        )
        .await
        .unwrap_err();

    match &err {
        MaterializeError::Api(api_err) => {
            assert_eq!(api_err.status(), Some(StatusCode::NOT_FOUND));
            assert_eq!(api_err.user_message(), "not found");
        }
        other => panic!("期望接口错误, 实际: {:?}", other),
    }
    assert!(dir_is_empty(&dir));
    assert!(materializer.registry().is_empty());
}

#[tokio::test]
async fn task_without_id_is_a_missing_parameter() {
    let (server, api, session) = common::start().await;
    let dir = tempfile::tempdir().unwrap();
    let task = DownloadTask {
        download_status: Some(DownloadStatus::Success),
        ..Default::default()
    };

    let err = FileMaterializer::new(api)
        .download(&session, &task, &DirectorySaver::new(dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MaterializeError::Api(ApiError::MissingParameter { .. })
    ));
    assert_eq!(common::request_count(&server).await, 0);
}
