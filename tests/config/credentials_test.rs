//! Credential loading tests.

use std::collections::BTreeMap;

use kindred::credentials::{load_credentials, resolve_api_key, Credentials};

fn write_env(dir: &std::path::Path, contents: &str, mode: u32) -> std::path::PathBuf {
    let path = dir.join(".env");
    std::fs::write(&path, contents).expect("write env");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).expect("chmod");
    }
    #[cfg(not(unix))]
    let _ = mode;
    path
}

#[test]
fn debug_redacts_values() {
    let mut vars = BTreeMap::new();
    vars.insert("KINDRED_API_KEY".to_owned(), "sk-secret".to_owned());
    let rendered = format!("{:?}", Credentials::from_map(vars));
    assert!(rendered.contains("KINDRED_API_KEY"));
    assert!(!rendered.contains("sk-secret"));
}

#[test]
fn env_file_takes_precedence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_env(dir.path(), "KINDRED_API_KEY=from-file\n", 0o600);
    let key = resolve_api_key(&path, "KINDRED_API_KEY", |_| Some("from-env".to_owned()));
    assert_eq!(key.as_deref(), Some("from-file"));
}

#[test]
fn falls_back_to_process_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let absent = dir.path().join(".env");
    let key = resolve_api_key(&absent, "KINDRED_API_KEY", |k| {
        (k == "KINDRED_API_KEY").then(|| "from-env".to_owned())
    });
    assert_eq!(key.as_deref(), Some("from-env"));
    assert!(resolve_api_key(&absent, "KINDRED_API_KEY", |_| Some("  ".to_owned())).is_none());
}

#[cfg(unix)]
#[test]
fn world_readable_env_file_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_env(dir.path(), "KINDRED_API_KEY=leaky\n", 0o644);
    assert!(load_credentials(&path).is_err());

    let key = resolve_api_key(&path, "KINDRED_API_KEY", |_| None);
    assert!(key.is_none());
}
