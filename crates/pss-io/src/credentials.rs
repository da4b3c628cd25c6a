//! Store credentials from a JSON file or the environment.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use pss_core::{PssError, PssResult};

use crate::store::StoreAuth;

pub const CREDENTIALS_ENV: &str = "PSS_CREDENTIALS";
pub const PROJECT_ENV: &str = "PSS_PROJECT_ID";
pub const TOKEN_ENV: &str = "PSS_ACCESS_TOKEN";
pub const API_KEY_ENV: &str = "PSS_API_KEY";

const REMEDIATION: &str = "pass --credentials <file.json>, set PSS_CREDENTIALS to such a file, \
or set PSS_PROJECT_ID together with PSS_ACCESS_TOKEN or PSS_API_KEY";

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub project_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn from_file(path: &Path) -> PssResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PssError::Credentials(format!("cannot read '{}': {e}", path.display()))
        })?;
        let creds: Credentials = serde_json::from_str(&raw).map_err(|e| {
            PssError::Credentials(format!("'{}' is not a credentials file: {e}", path.display()))
        })?;
        creds.validated()
    }

    /// Token wins over API key when both are present.
    pub fn auth(&self) -> PssResult<StoreAuth> {
        match (non_blank(&self.access_token), non_blank(&self.api_key)) {
            (Some(token), _) => Ok(StoreAuth::Bearer(token)),
            (None, Some(key)) => Ok(StoreAuth::ApiKey(key)),
            (None, None) => Err(PssError::Credentials(format!(
                "no access_token or api_key for project '{}'; {REMEDIATION}",
                self.project_id
            ))),
        }
    }

    fn validated(self) -> PssResult<Self> {
        if self.project_id.trim().is_empty() {
            return Err(PssError::Credentials(format!(
                "project_id is empty; {REMEDIATION}"
            )));
        }
        self.auth()?;
        Ok(self)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve credentials: explicit file, then `PSS_CREDENTIALS`, then the
/// `PSS_PROJECT_ID` / token / key variables.
pub fn resolve_credentials(explicit: Option<&Path>) -> PssResult<Credentials> {
    resolve_with(explicit, |name| std::env::var(name).ok())
}

pub(crate) fn resolve_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> PssResult<Credentials> {
    if let Some(path) = explicit {
        return Credentials::from_file(path);
    }
    if let Some(path) = env(CREDENTIALS_ENV).filter(|p| !p.trim().is_empty()) {
        return Credentials::from_file(&PathBuf::from(path));
    }
    match env(PROJECT_ENV).filter(|p| !p.trim().is_empty()) {
        Some(project_id) => Credentials {
            project_id,
            access_token: env(TOKEN_ENV),
            api_key: env(API_KEY_ENV),
        }
        .validated(),
        None => Err(PssError::Credentials(format!(
            "no store credentials found; {REMEDIATION}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn nothing_configured_is_an_error_with_remediation() {
        let err = resolve_with(None, env(&[])).unwrap_err();
        assert!(matches!(err, PssError::Credentials(_)));
        assert!(err.to_string().contains("PSS_PROJECT_ID"));
    }

    #[test]
    fn environment_token() {
        let creds = resolve_with(
            None,
            env(&[(PROJECT_ENV, "pss-prod"), (TOKEN_ENV, "ya29.token")]),
        )
        .unwrap();
        assert_eq!(creds.project_id, "pss-prod");
        assert!(matches!(creds.auth().unwrap(), StoreAuth::Bearer(_)));
    }

    #[test]
    fn project_without_secret_is_rejected() {
        assert!(resolve_with(None, env(&[(PROJECT_ENV, "pss-prod")])).is_err());
    }

    #[test]
    fn file_with_api_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, r#"{"project_id": "pss-prod", "api_key": "AIza"}"#).unwrap();
        let creds = resolve_with(Some(&path), env(&[])).unwrap();
        assert!(matches!(creds.auth().unwrap(), StoreAuth::ApiKey(_)));
        assert!(!format!("{creds:?}").contains("AIza"));
    }

    #[test]
    fn env_file_is_used_when_no_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, r#"{"project_id": "p", "access_token": "t"}"#).unwrap();
        let creds = resolve_with(None, env(&[(CREDENTIALS_ENV, path.to_str().unwrap())])).unwrap();
        assert_eq!(creds.project_id, "p");
    }
}
