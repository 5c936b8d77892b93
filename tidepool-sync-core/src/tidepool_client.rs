//! HTTP client for the Tidepool data API.
//!
//! Logs in once with basic auth and keeps the session token for the lifetime
//! of the client. Token refresh is left to the caller (build a new client).

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::contract::{ClientError, SyncWindow, TidepoolSource};
use crate::tidepool::{Bolus, DataType, Food, PhysicalActivity, PumpSettings};

pub const DEFAULT_BASE_URL: &str = "https://api.tidepool.org";

const SESSION_TOKEN_HEADER: &str = "x-tidepool-session-token";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    userid: String,
}

pub struct TidepoolClient {
    http: Client,
    base_url: String,
    session_token: String,
    user_id: String,
}

impl TidepoolClient {
    /// Authenticates against `{base_url}/auth/login`.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let http = Client::new();
        let url = format!("{base_url}/auth/login");
        tracing::info!(url = %url, username, "Logging in to Tidepool");

        let resp = http
            .post(&url)
            .basic_auth(username, Some(password))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, url = %url, "Tidepool login rejected");
            return Err(format!("Tidepool login failed with {status}: {body}").into());
        }

        let session_token = resp
            .headers()
            .get(SESSION_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or("Tidepool login response carried no session token")?;
        let login: LoginResponse = resp.json().await?;
        tracing::info!(user_id = %login.userid, "Logged in to Tidepool");

        Ok(TidepoolClient {
            http,
            base_url,
            session_token,
            user_id: login.userid,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        data_type: DataType,
        window: SyncWindow,
    ) -> Result<Vec<T>, ClientError> {
        let url = format!("{}/data/{}", self.base_url, self.user_id);
        let mut query = vec![
            ("type", data_type.as_str().to_owned()),
            (
                "startDate",
                window.since.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ];
        if let Some(till) = window.till {
            query.push(("endDate", till.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        tracing::debug!(url = %url, data_type = data_type.as_str(), "Querying Tidepool data");

        let resp = self
            .http
            .get(&url)
            .header(SESSION_TOKEN_HEADER, &self.session_token)
            .query(&query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, url = %url, "Tidepool data query failed");
            return Err(format!(
                "Tidepool {} query failed with {status}: {body}",
                data_type.as_str()
            )
            .into());
        }

        let records: Vec<T> = resp.json().await?;
        tracing::info!(
            data_type = data_type.as_str(),
            count = records.len(),
            "Fetched Tidepool records"
        );
        Ok(records)
    }
}

#[async_trait]
impl TidepoolSource for TidepoolClient {
    async fn pump_settings(&self, window: SyncWindow) -> Result<Vec<PumpSettings>, ClientError> {
        self.fetch(DataType::PumpSettings, window).await
    }

    async fn boluses(&self, window: SyncWindow) -> Result<Vec<Bolus>, ClientError> {
        self.fetch(DataType::Bolus, window).await
    }

    async fn food(&self, window: SyncWindow) -> Result<Vec<Food>, ClientError> {
        self.fetch(DataType::Food, window).await
    }

    async fn physical_activity(
        &self,
        window: SyncWindow,
    ) -> Result<Vec<PhysicalActivity>, ClientError> {
        self.fetch(DataType::PhysicalActivity, window).await
    }
}
