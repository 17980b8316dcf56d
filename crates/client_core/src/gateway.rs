//! Single entry point to the spreadsheet-backed shift service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::LogId,
    error::ClientError,
    protocol::{
        action_error, snapshot_error, Action, ActionRequest, EndShiftData, ReportData, Snapshot,
        StartShiftData, StartShiftResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Posts `{ action, data }` and returns the decoded success body verbatim.
    async fn call(&self, action: Action, payload: Value) -> Result<Value, ClientError>;

    /// Reads the roster and the reports table.
    async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError>;

    async fn start_shift(&self, data: &StartShiftData) -> Result<Vec<LogId>, ClientError> {
        let body = self.call(Action::StartShift, encode(data)?).await?;
        let response: StartShiftResponse = decode(body)?;
        Ok(response.log_ids)
    }

    async fn add_report(&self, data: &ReportData) -> Result<(), ClientError> {
        self.call(Action::AddReport, encode(data)?).await?;
        Ok(())
    }

    async fn end_shift(&self, data: &EndShiftData) -> Result<(), ClientError> {
        self.call(Action::EndShift, encode(data)?).await?;
        Ok(())
    }
}

pub struct HttpGateway {
    http: Client,
    web_app_url: Url,
}

impl HttpGateway {
    pub fn new(web_app_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), web_app_url)
    }

    pub fn with_client(http: Client, web_app_url: &str) -> Result<Self> {
        let web_app_url = Url::parse(web_app_url)
            .with_context(|| format!("invalid web app url '{web_app_url}'"))?;
        Ok(Self { http, web_app_url })
    }

    pub fn web_app_url(&self) -> &Url {
        &self.web_app_url
    }

    async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<(StatusCode, serde_json::Result<Value>), ClientError> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let text = response.text().await.map_err(network_error)?;
        Ok((status, serde_json::from_str(&text)))
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn call(&self, action: Action, payload: Value) -> Result<Value, ClientError> {
        debug!(action = action.as_str(), "calling remote action");
        let request = ActionRequest {
            action,
            data: payload,
        };
        let (status, body) = self
            .send(self.http.post(self.web_app_url.clone()).json(&request))
            .await?;

        if let Some(message) = body.as_ref().ok().and_then(action_error) {
            warn!(action = action.as_str(), %message, "remote action rejected");
            return Err(ClientError::Remote(message));
        }
        if !status.is_success() {
            warn!(action = action.as_str(), %status, "remote action failed at transport level");
            return Err(ClientError::Network(format!("HTTP {status}")));
        }
        body.map_err(|err| ClientError::Decode(err.to_string()))
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError> {
        debug!("fetching snapshot");
        let (status, body) = self.send(self.http.get(self.web_app_url.clone())).await?;

        if let Some(message) = body.as_ref().ok().and_then(snapshot_error) {
            warn!(%message, "snapshot read rejected");
            return Err(ClientError::Remote(message));
        }
        if !status.is_success() {
            warn!(%status, "snapshot read failed at transport level");
            return Err(ClientError::Network(format!("HTTP {status}")));
        }
        let body = body.map_err(|err| ClientError::Decode(err.to_string()))?;
        decode(body)
    }
}

fn network_error(err: reqwest::Error) -> ClientError {
    warn!(error = %err, "transport failure");
    ClientError::Network(err.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|err| ClientError::Decode(err.to_string()))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    serde_json::from_value(body).map_err(|err| ClientError::Decode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
