//! `reqwest`-backed [`HttpFetch`].

use std::time::Duration;

use reqwest::blocking::Client;

use super::{HttpFetch, HttpResponse};
use crate::error::Result;

/// Blocking HTTP client for report downloads.
#[derive(Clone)]
pub struct ReqwestFetcher {
    http: Client,
}

impl std::fmt::Debug for ReqwestFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestFetcher").finish_non_exhaustive()
    }
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { http })
    }
}

impl HttpFetch for ReqwestFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let resp = self.http.get(url).send()?;
        let status = resp.status().as_u16();
        let body = resp.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
