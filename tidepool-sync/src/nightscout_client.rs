#![doc = "Nightscout integration for the CLI: implements the core `NightscoutTarget` trait against the Nightscout v1 REST API."]
//
//! # Nightscout client (CLI <-> Core)
//!
//! Bridges [`tidepool_sync_core::contract::NightscoutTarget`] to a real
//! Nightscout site. The sync pipelines only see the trait; this module owns
//! transport, authentication and response decoding.
//!
//! ## Client Usage
//!
//! - Construct [`NightscoutClient`] with the site URL and API secret (see
//!   [`crate::load_config`] for where those come from).
//! - Every request carries an `api-secret` header holding the SHA-512 hex digest
//!   of the secret.
//! - Profiles with an `_id` are replaced with `PUT`, others created with `POST`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha512};

use tidepool_sync_core::contract::{ClientError, NightscoutTarget};
use tidepool_sync_core::nightscout::{Profile, StoredProfile, Treatment};

const API_SECRET_HEADER: &str = "api-secret";

/// Nightscout answers some writes with the document, others with a
/// one-element array.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.into_iter().next(),
        }
    }
}

pub struct NightscoutClient {
    http: Client,
    base_url: String,
    hashed_secret: String,
}

impl NightscoutClient {
    pub fn new(base_url: &str, api_secret: &str) -> Self {
        let hashed_secret = {
            let mut hasher = Sha512::new();
            hasher.update(api_secret.as_bytes());
            format!("{:x}", hasher.finalize())
        };
        let base_url = base_url.trim_end_matches('/').to_owned();
        tracing::info!(
            base_url = %base_url,
            api_secret_set = !api_secret.is_empty(),
            "Initialized NightscoutClient"
        );
        NightscoutClient {
            http: Client::new(),
            base_url,
            hashed_secret,
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api/v1/{endpoint}", self.base_url))
            .header(API_SECRET_HEADER, &self.hashed_secret)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, what, "Nightscout API returned error. Response body: {body}");
            return Err(format!("Nightscout {what} failed with {status}: {body}").into());
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl NightscoutTarget for NightscoutClient {
    async fn profiles(&self) -> Result<Vec<StoredProfile>, ClientError> {
        tracing::info!(base_url = %self.base_url, "Fetching Nightscout profiles");
        let resp = self.request(Method::GET, "profile").send().await?;
        let profiles: Vec<StoredProfile> = Self::decode(resp, "profile fetch").await?;
        tracing::info!(count = profiles.len(), "Fetched Nightscout profiles");
        Ok(profiles)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, ClientError> {
        let method = match profile.id {
            Some(_) => Method::PUT,
            None => Method::POST,
        };
        tracing::info!(
            method = %method,
            id = ?profile.id,
            mills = %profile.mills,
            "Storing Nightscout profile"
        );
        let resp = self
            .request(method, "profile")
            .json(profile)
            .send()
            .await?;
        let stored: OneOrMany<Profile> = Self::decode(resp, "profile store").await?;
        let stored = stored
            .into_first()
            .ok_or("Nightscout returned no stored profile")?;
        tracing::info!(id = ?stored.id, "Successfully stored Nightscout profile");
        Ok(stored)
    }

    async fn add_treatments(
        &self,
        treatments: &[Treatment],
    ) -> Result<Vec<Treatment>, ClientError> {
        tracing::info!(count = treatments.len(), "Uploading Nightscout treatments");
        let resp = self
            .request(Method::POST, "treatments")
            .json(treatments)
            .send()
            .await?;
        let stored: OneOrMany<Treatment> = Self::decode(resp, "treatment upload").await?;
        let stored = match stored {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        };
        tracing::info!(count = stored.len(), "Successfully uploaded Nightscout treatments");
        Ok(stored)
    }
}
