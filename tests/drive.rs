mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use clipsort::dispatch::Downloader;
use clipsort::drive::{
    DriveEndpoints, DriveHttpClient, DriveTarget, direct_download_url, extract_file_id,
};
use clipsort::error::ClipsortError;

use common::drive_server::{self, DriveServer, Reply};

fn client_for(server: &DriveServer) -> DriveHttpClient {
    DriveHttpClient::with_endpoints(DriveEndpoints {
        download_base: format!("{}/uc", server.base_url),
        confirm_base: format!("{}/download", server.base_url),
    })
    .unwrap()
}

fn label_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().join("happy")).unwrap();
    std::fs::create_dir_all(dir.as_std_path()).unwrap();
    (temp, dir)
}

fn entries(dir: &Utf8PathBuf) -> usize {
    std::fs::read_dir(dir.as_std_path()).unwrap().count()
}

#[test]
fn share_link_becomes_direct_download() {
    let target = DriveTarget::from_share_url("https://drive.google.com/file/d/ABC123/view");
    assert_eq!(target.file_id.as_deref(), Some("ABC123"));
    assert_eq!(
        target.url,
        "https://drive.google.com/uc?export=download&id=ABC123"
    );
}

#[test]
fn file_id_stops_at_query_string() {
    assert_eq!(
        extract_file_id("https://drive.google.com/file/d/1a-B_c?usp=sharing").as_deref(),
        Some("1a-B_c")
    );
    assert_eq!(
        extract_file_id("https://drive.google.com/file/d/1a-B_c/view?usp=drive_link").as_deref(),
        Some("1a-B_c")
    );
}

#[test]
fn direct_url_format() {
    assert_eq!(
        direct_download_url("XYZ"),
        "https://drive.google.com/uc?export=download&id=XYZ"
    );
}

#[test]
fn links_without_file_segment_are_left_alone() {
    assert_eq!(extract_file_id("https://drive.google.com/drive/folders"), None);
}

#[test]
fn downloads_the_file_behind_a_share_link() {
    let server = drive_server::start(vec![("id=OK1", Reply::file(b"clip bytes"))]);
    let (_temp, dir) = label_dir();
    let dest = dir.join("1.mp4");

    client_for(&server)
        .download("https://drive.google.com/file/d/OK1/view", &dest)
        .unwrap();

    assert_eq!(std::fs::read(dest.as_std_path()).unwrap(), b"clip bytes");
    assert_eq!(entries(&dir), 1);
    assert_eq!(server.requests(), vec!["/uc?export=download&id=OK1".to_string()]);
}

#[test]
fn error_status_leaves_nothing_behind() {
    let page = format!("<html><body>{}</body></html>", "not found ".repeat(500));
    let server = drive_server::start(vec![("id=GONE", Reply::html("404 Not Found", &page))]);
    let (_temp, dir) = label_dir();
    let dest = dir.join("2.mp4");

    let err = client_for(&server)
        .download("https://drive.google.com/file/d/GONE/view", &dest)
        .unwrap_err();

    assert_matches!(err, ClipsortError::DriveStatus { status: 404, message } => {
        assert_eq!(message, "Not Found");
    });
    assert_eq!(entries(&dir), 0);
}

#[test]
fn dropped_transfer_leaves_nothing_behind() {
    let server = drive_server::start(vec![("id=CUT", Reply::cut_short(b"partial", 1_000_000))]);
    let (_temp, dir) = label_dir();
    let dest = dir.join("3.mp4");

    let result = client_for(&server).download("https://drive.google.com/file/d/CUT/view", &dest);

    assert!(result.is_err());
    assert!(!dest.as_std_path().exists());
    assert_eq!(entries(&dir), 0);
}

#[test]
fn html_page_without_token_is_an_interstitial_error() {
    let server = drive_server::start(vec![(
        "id=WALL",
        Reply::html("200 OK", "<html><body>Sign in to continue</body></html>"),
    )]);
    let (_temp, dir) = label_dir();
    let dest = dir.join("4.mp4");

    let err = client_for(&server)
        .download("https://drive.google.com/file/d/WALL/view", &dest)
        .unwrap_err();

    assert_matches!(err, ClipsortError::DriveInterstitial(_));
    assert_eq!(entries(&dir), 0);
}

#[test]
fn confirmation_page_is_followed_to_the_file() {
    let page = r#"<html><form action="/download" method="get">
        <input type="hidden" name="id" value="BIG">
        <input type="hidden" name="confirm" value="t">
        <input type="hidden" name="uuid" value="u-42">
        </form></html>"#;
    let server = drive_server::start(vec![
        ("/download?", Reply::file(b"large clip")),
        ("/uc?", Reply::html("200 OK", page)),
    ]);
    let (_temp, dir) = label_dir();
    let dest = dir.join("5.mp4");

    client_for(&server)
        .download("https://drive.google.com/file/d/BIG/view", &dest)
        .unwrap();

    assert_eq!(std::fs::read(dest.as_std_path()).unwrap(), b"large clip");
    assert_eq!(entries(&dir), 1);
    assert_eq!(
        server.requests(),
        vec![
            "/uc?export=download&id=BIG".to_string(),
            "/download?id=BIG&export=download&confirm=t&uuid=u-42".to_string(),
        ]
    );
}
