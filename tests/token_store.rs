use audio_marketplace_client::{
    error::{AppError, ErrorPayload},
    storage::{ACCESS_TOKEN_KEY, FileTokenStore, REFRESH_TOKEN_KEY, TokenStore},
};
use reqwest::StatusCode;
use serde_json::json;

#[test]
fn file_store_survives_reopening() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session").join("tokens.json");

    let store = FileTokenStore::new(&path);
    assert_eq!(store.path(), path.as_path());
    assert_eq!(store.get(ACCESS_TOKEN_KEY)?, None);
    store.set(ACCESS_TOKEN_KEY, "a-1")?;
    store.set(REFRESH_TOKEN_KEY, "r-1")?;

    let reopened = FileTokenStore::new(&path);
    assert_eq!(reopened.get(ACCESS_TOKEN_KEY)?, Some("a-1".to_string()));

    reopened.remove(ACCESS_TOKEN_KEY)?;
    assert_eq!(store.get(ACCESS_TOKEN_KEY)?, None);
    assert_eq!(store.get(REFRESH_TOKEN_KEY)?, Some("r-1".to_string()));
    Ok(())
}

#[test]
fn store_path_ending_in_tmp_leaves_no_stray_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.tmp");

    let store = FileTokenStore::new(&path);
    store.set(ACCESS_TOKEN_KEY, "a-1")?;
    store.set(REFRESH_TOKEN_KEY, "r-1")?;
    store.remove(ACCESS_TOKEN_KEY)?;

    let files: Vec<_> = std::fs::read_dir(dir.path())?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<_, _>>()?;
    assert_eq!(files, vec![std::ffi::OsString::from("tokens.tmp")]);
    assert_eq!(
        FileTokenStore::new(&path).get(REFRESH_TOKEN_KEY)?,
        Some("r-1".to_string())
    );
    Ok(())
}

#[test]
fn corrupt_store_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    std::fs::write(&path, "{not json")?;

    let store = FileTokenStore::new(&path);
    assert!(matches!(store.get(ACCESS_TOKEN_KEY), Err(AppError::Decode(_))));
    Ok(())
}

#[test]
fn error_payload_shapes_flatten_for_display() {
    let detail = ErrorPayload::from_json(&json!({ "detail": "Not found." }));
    assert_eq!(detail.messages(), vec!["Not found."]);

    let fields = ErrorPayload::from_json(&json!({
        "email": ["Enter a valid email address."],
        "non_field_errors": ["Unable to log in."]
    }));
    assert_eq!(
        fields.messages(),
        vec!["email: Enter a valid email address.", "Unable to log in."]
    );

    let plain = ErrorPayload::from_body(StatusCode::BAD_GATEWAY, b"");
    assert_eq!(plain.messages(), vec!["Bad Gateway"]);
}
