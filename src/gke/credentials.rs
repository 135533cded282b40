/// Access token resolution for the GKE API
use std::fmt;
use std::future::Future;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::utils::command::CommandBuilder;

/// Environment variable holding a ready-made OAuth access token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// OAuth scope granting full access to Google Cloud APIs
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Where an access token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    ApplicationDefault,
    Gcloud,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Environment => write!(f, "{}", ACCESS_TOKEN_ENV),
            TokenSource::ApplicationDefault => write!(f, "application default credentials"),
            TokenSource::Gcloud => write!(f, "gcloud"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub source: TokenSource,
}

/// Get an access token from the environment, application default
/// credentials or gcloud, in that order
pub async fn resolve_access_token() -> Result<AccessToken, ReportError> {
    resolve_from(
        std::env::var(ACCESS_TOKEN_ENV).ok(),
        token_from_adc(),
        "gcloud",
    )
    .await
}

async fn resolve_from<F>(
    env_value: Option<String>,
    adc: F,
    gcloud: &str,
) -> Result<AccessToken, ReportError>
where
    F: Future<Output = Result<String, ReportError>>,
{
    if let Some(token) = token_from_env(env_value) {
        debug!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(AccessToken {
            token,
            source: TokenSource::Environment,
        });
    }

    let adc_error = match adc.await {
        Ok(token) => {
            debug!("Using application default credentials");
            return Ok(AccessToken {
                token,
                source: TokenSource::ApplicationDefault,
            });
        }
        Err(e) => e,
    };

    info!(
        "Application default credentials unavailable ({}), asking gcloud for an access token",
        adc_error
    );
    match token_from_gcloud(gcloud).await {
        Ok(token) => Ok(AccessToken {
            token,
            source: TokenSource::Gcloud,
        }),
        Err(gcloud_error) => Err(ReportError::AuthFailure(format!(
            "{}; {}",
            auth_reason(adc_error),
            auth_reason(gcloud_error)
        ))),
    }
}

fn auth_reason(error: ReportError) -> String {
    match error {
        ReportError::AuthFailure(reason) => reason,
        other => other.to_string(),
    }
}

fn token_from_env(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn token_from_adc() -> Result<String, ReportError> {
    let provider = gcp_auth::provider()
        .await
        .map_err(|e| ReportError::AuthFailure(format!("application default credentials: {}", e)))?;

    let token = provider
        .token(&[CLOUD_PLATFORM_SCOPE])
        .await
        .map_err(|e| ReportError::AuthFailure(format!("application default credentials: {}", e)))?;

    Ok(token.as_str().to_string())
}

async fn token_from_gcloud(program: &str) -> Result<String, ReportError> {
    let stdout = CommandBuilder::new(program)
        .args(["auth", "print-access-token"])
        .context("Failed to run gcloud")
        .run()
        .await
        .map_err(|e| ReportError::AuthFailure(format!("{:#}", e)))?;

    let token = stdout.trim();
    if token.is_empty() {
        return Err(ReportError::AuthFailure(
            "gcloud returned an empty access token".to_string(),
        ));
    }

    Ok(token.to_string())
}
