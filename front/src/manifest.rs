use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonnerre_common::rpc::{client::get_json, RpcError};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("unable to fetch the manifest: {}", _0)]
    Fetch(#[from] RpcError),
    #[error("manifest field '{}' is missing", _0)]
    MissingField(&'static str),
    #[error("manifest field '{}' is not an http(s) url: {}", _0, _1)]
    InvalidUrl(&'static str, String),
}

// Application descriptor shown by wallets when connecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    pub url: String,
    pub name: String,
    pub icon_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_use_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy_url: Option<String>,
}

fn check_url(field: &'static str, value: &str) -> Result<(), ManifestError> {
    if value.is_empty() {
        return Err(ManifestError::MissingField(field));
    }
    if !value.starts_with("https://") && !value.starts_with("http://") {
        return Err(ManifestError::InvalidUrl(field, value.to_owned()));
    }
    Ok(())
}

impl AppManifest {
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::MissingField("name"));
        }
        check_url("url", &self.url)?;
        check_url("iconUrl", &self.icon_url)?;
        if let Some(url) = self.terms_of_use_url.as_deref() {
            check_url("termsOfUseUrl", url)?;
        }
        if let Some(url) = self.privacy_policy_url.as_deref() {
            check_url("privacyPolicyUrl", url)?;
        }
        Ok(())
    }
}

pub async fn fetch_manifest(url: &str) -> Result<AppManifest, ManifestError> {
    let manifest: AppManifest = get_json(url).await?;
    manifest.validate()?;
    if log::log_enabled!(log::Level::Debug) {
        debug!("Loaded manifest of {} ({})", manifest.name, manifest.url);
    }
    Ok(manifest)
}
