#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use lightfield::infra::client::{ApiClient, ClientError, FileTokenStore};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::args::Cli;

const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or LIGHTFIELD_SITE_URL)")]
    MissingSite,
    #[error("password is required (use --password-file or LIGHTFIELD_PASSWORD)")]
    MissingPassword,
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{}", .0.display_message())]
    Api(#[from] ClientError),
    #[error("reorder failed: {0}")]
    Reorder(String),
}

#[derive(Clone)]
pub struct Ctx {
    pub api: ApiClient,
}

impl Ctx {
    pub fn new(site: &str, session_file: PathBuf) -> Result<Self, CliError> {
        let api = ApiClient::new(site, Arc::new(FileTokenStore::new(session_file)))?;
        Ok(Self { api })
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&serde_json::Value>,
    ) -> Result<T, CliError> {
        Ok(self.api.request(method, path, query, body).await?)
    }

    pub async fn request_unit(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(), CliError> {
        Ok(self.api.request_unit(method, path, None, body).await?)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        Ok(self
            .api
            .request(Method::POST, path, None, Some(body))
            .await?)
    }
}

/// `$HOME/.config/lightfield/session.json`, or the working directory without a home.
pub fn default_session_file() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(format!(".lightfield-{SESSION_FILE_NAME}")),
        |home| {
            PathBuf::from(home)
                .join(".config")
                .join("lightfield")
                .join(SESSION_FILE_NAME)
        },
    )
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let site = cli.site.clone().ok_or(CliError::MissingSite)?;
    let session_file = cli
        .session_file
        .clone()
        .unwrap_or_else(default_session_file);
    Ctx::new(&site, session_file)
}
