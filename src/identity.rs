//! Identity context.
//!
//! Wraps the external identity provider as a local sign-in file. Resolution
//! order for the current caller:
//! 1) CLI --email/--name (the clap flags also read TASKLINK_EMAIL/TASKLINK_NAME)
//! 2) Persisted sign-in file in `<data_dir>/identity.json`
//! 3) Config default (identity.email / identity.name)
//! 4) None (unauthenticated)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::write_atomic;

const SIGNIN_FILENAME: &str = "identity.json";

/// The caller identity: a stable email plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
}

impl Identity {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Resolve the current identity using CLI flags, the sign-in file, and config.
pub fn resolve(
    data_dir: &Path,
    cli_email: Option<&str>,
    cli_name: Option<&str>,
    config: &Config,
) -> Result<Option<Identity>> {
    if let Some(email) = non_empty(cli_email) {
        let name = non_empty(cli_name).unwrap_or(email);
        return Ok(Some(Identity::new(email, name)));
    }

    if let Some(identity) = load_signed_in(data_dir)? {
        return Ok(Some(identity));
    }

    if let Some(email) = non_empty(config.identity.email.as_deref()) {
        let name = non_empty(config.identity.name.as_deref()).unwrap_or(email);
        return Ok(Some(Identity::new(email, name)));
    }

    Ok(None)
}

/// Persist a sign-in in `<data_dir>/identity.json`.
pub fn sign_in(data_dir: &Path, email: &str, name: &str) -> Result<Identity> {
    let email = non_empty(Some(email))
        .ok_or_else(|| Error::InvalidArgument("email cannot be empty".to_string()))?;
    if !email.contains('@') {
        return Err(Error::InvalidArgument(format!(
            "email does not look like an address: {email}"
        )));
    }
    let name = non_empty(Some(name))
        .ok_or_else(|| Error::InvalidArgument("name cannot be empty".to_string()))?;

    let identity = Identity::new(email, name);
    let payload = serde_json::to_vec_pretty(&identity)?;
    write_atomic(signin_path(data_dir), &payload)?;
    Ok(identity)
}

/// Remove the persisted sign-in. Idempotent: returns whether a sign-in existed.
pub fn sign_out(data_dir: &Path) -> Result<bool> {
    let path = signin_path(data_dir);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    Ok(true)
}

/// Load the persisted sign-in, if present.
pub fn load_signed_in(data_dir: &Path) -> Result<Option<Identity>> {
    let path = signin_path(data_dir);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    let identity: Identity = serde_json::from_str(&raw)?;
    if identity.email.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(identity))
}

fn signin_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SIGNIN_FILENAME)
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    #[test]
    fn unauthenticated_without_any_source() {
        let dir = dir();
        let resolved =
            resolve(dir.path(), None, None, &Config::default()).expect("resolve");
        assert!(resolved.is_none());
    }

    #[test]
    fn cli_flags_win_over_sign_in_file() {
        let dir = dir();
        sign_in(dir.path(), "stored@example.com", "Stored").expect("sign in");

        let resolved = resolve(
            dir.path(),
            Some("flag@example.com"),
            Some("Flag"),
            &Config::default(),
        )
        .expect("resolve")
        .expect("identity");
        assert_eq!(resolved.email, "flag@example.com");
        assert_eq!(resolved.name, "Flag");
    }

    #[test]
    fn sign_in_round_trips() {
        let dir = dir();
        sign_in(dir.path(), "a@x", "User A").expect("sign in");

        let resolved = resolve(dir.path(), None, None, &Config::default())
            .expect("resolve")
            .expect("identity");
        assert_eq!(resolved, Identity::new("a@x", "User A"));
    }

    #[test]
    fn sign_out_removes_identity() {
        let dir = dir();
        sign_in(dir.path(), "a@x", "User A").expect("sign in");
        assert!(sign_out(dir.path()).expect("sign out"));
        assert!(!sign_out(dir.path()).expect("second sign out"));
        assert!(resolve(dir.path(), None, None, &Config::default())
            .expect("resolve")
            .is_none());
    }

    #[test]
    fn config_default_is_last_resort() {
        let dir = dir();
        let mut config = Config::default();
        config.identity.email = Some("cfg@example.com".to_string());
        config.identity.name = None;

        let resolved = resolve(dir.path(), None, None, &config)
            .expect("resolve")
            .expect("identity");
        assert_eq!(resolved.email, "cfg@example.com");
        // Name falls back to the email when not configured.
        assert_eq!(resolved.name, "cfg@example.com");
    }

    #[test]
    fn empty_or_invalid_sign_in_is_rejected() {
        let dir = dir();
        assert!(sign_in(dir.path(), "", "Name").is_err());
        assert!(sign_in(dir.path(), "   ", "Name").is_err());
        assert!(sign_in(dir.path(), "not-an-address", "Name").is_err());
        assert!(sign_in(dir.path(), "a@x", "").is_err());
    }
}
