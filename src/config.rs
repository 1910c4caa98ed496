//! Where the database lives and how loud the logs are.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

pub const DB_ENV: &str = "BIZDASH_DB";
/// Points the default data directory somewhere disposable (tests).
pub const FAKE_APPDATA_ENV: &str = "BIZDASH_FAKE_APPDATA";
pub const LOG_ENV: &str = "BIZDASH_LOG";
pub const DEFAULT_LOG_FILTER: &str = "bizdash=info,sqlx=warn";

pub const APP_IDENTIFIER: &str = "com.bizdash.app";
pub const DB_FILE_NAME: &str = "bizdash.sqlite3";

/// Resolves the database path: an explicit `--db` flag first, then
/// `BIZDASH_DB`, then `BIZDASH_FAKE_APPDATA`, then the platform data dir.
pub fn resolve_db_path(explicit: Option<&Path>) -> Result<PathBuf> {
    db_path_from(
        explicit,
        |key| env::var(key).ok().filter(|v| !v.trim().is_empty()),
        dirs::data_dir(),
    )
}

fn db_path_from(
    explicit: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = var(DB_ENV) {
        return Ok(PathBuf::from(path));
    }
    if let Some(fake) = var(FAKE_APPDATA_ENV) {
        return Ok(PathBuf::from(fake).join(DB_FILE_NAME));
    }
    let base = data_dir
        .or_else(|| env::current_dir().ok())
        .ok_or_else(|| anyhow!("failed to resolve application data directory"))?;
    Ok(base.join(APP_IDENTIFIER).join(DB_FILE_NAME))
}

pub fn log_filter() -> String {
    env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_flag_wins() {
        let path = db_path_from(
            Some(Path::new("/tmp/flag.sqlite3")),
            vars(&[(DB_ENV, "/tmp/env.sqlite3")]),
            None,
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/flag.sqlite3"));
    }

    #[test]
    fn env_db_beats_fake_appdata() {
        let path = db_path_from(
            None,
            vars(&[(DB_ENV, "/tmp/env.sqlite3"), (FAKE_APPDATA_ENV, "/tmp/fake")]),
            None,
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/env.sqlite3"));
    }

    #[test]
    fn fake_appdata_holds_default_file_name() {
        let path = db_path_from(None, vars(&[(FAKE_APPDATA_ENV, "/tmp/fake")]), None).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/fake").join(DB_FILE_NAME));
    }

    #[test]
    fn falls_back_to_platform_data_dir() {
        let path = db_path_from(None, vars(&[]), Some(PathBuf::from("/data"))).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/data").join(APP_IDENTIFIER).join(DB_FILE_NAME)
        );
    }
}
