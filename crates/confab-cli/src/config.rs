use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfabConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    /// Base URL of the auth service (`/signup`, `/signin`, `/token`).
    pub auth_base_url: String,
    /// Base URL of the chat store (`/chats` and below).
    pub store_base_url: String,
    /// Full URL of the reply webhook.
    pub reply_webhook_url: String,
    pub created_at: jiff::Timestamp,
    /// Where to persist the session instead of the default location.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_path: Option<PathBuf>,
}

fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("confab"))
}

fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn has_config() -> bool {
    config_path().map(|p| p.exists()).unwrap_or(false)
}

pub fn load_config() -> eyre::Result<ConfabConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> eyre::Result<ConfabConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: ConfabConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update confab."
        ));
    }

    // v0 → v1: `webhook_url` became `reply_webhook_url`, and configs gained
    // a creation stamp.
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        if let Some(url) = obj.remove("webhook_url") {
            obj.entry("reply_webhook_url").or_insert(url);
        }
        obj.entry("created_at")
            .or_insert_with(|| serde_json::Value::String(jiff::Timestamp::now().to_string()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (renamed webhook_url)");
    }

    // Future migrations go here:
    // if from_version < 2 { ... }

    Ok(json)
}

pub fn save_config(config: &ConfabConfig) -> eyre::Result<()> {
    save_config_to(&config_path()?, config)
}

pub fn save_config_to(path: &Path, config: &ConfabConfig) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path has no parent directory"))?;
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // Set restrictive permissions on Unix before renaming
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

pub fn delete_config() -> eyre::Result<()> {
    let path = config_path()?;
    if path.exists() {
        std::fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "config deleted");
    }
    Ok(())
}

/// `CONFAB_*` variables override the corresponding file fields.
pub fn apply_env_overrides(config: &mut ConfabConfig) {
    if let Ok(url) = std::env::var("CONFAB_AUTH_URL") {
        config.auth_base_url = url;
    }
    if let Ok(url) = std::env::var("CONFAB_STORE_URL") {
        config.store_base_url = url;
    }
    if let Ok(url) = std::env::var("CONFAB_REPLY_URL") {
        config.reply_webhook_url = url;
    }
    if let Ok(path) = std::env::var("CONFAB_SESSION_PATH") {
        config.session_path = Some(PathBuf::from(path));
    }
}

/// The effective config: the file if present, environment-only otherwise,
/// with `CONFAB_*` variables overriding individual fields either way.
pub fn resolve_config() -> eyre::Result<ConfabConfig> {
    let mut config = if has_config() {
        load_config()?
    } else {
        ConfabConfig {
            config_version: CURRENT_VERSION,
            auth_base_url: String::new(),
            store_base_url: String::new(),
            reply_webhook_url: String::new(),
            created_at: jiff::Timestamp::now(),
            session_path: None,
        }
    };
    apply_env_overrides(&mut config);

    if config.auth_base_url.is_empty()
        || config.store_base_url.is_empty()
        || config.reply_webhook_url.is_empty()
    {
        return Err(eyre::eyre!(
            "no config at {} and CONFAB_AUTH_URL / CONFAB_STORE_URL / CONFAB_REPLY_URL \
             are not all set",
            config_path()?.display()
        ));
    }
    Ok(config)
}

/// Where the signed-in session is persisted. The config can point this
/// somewhere else, which scratch profiles and tests use.
pub fn session_file_path(config: &ConfabConfig) -> eyre::Result<PathBuf> {
    match &config.session_path {
        Some(path) => Ok(path.clone()),
        None => Ok(config_dir()?.join("session.json")),
    }
}
