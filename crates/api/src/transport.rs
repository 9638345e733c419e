use domain::Envelope;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{ApiClient, ApiError};

/// Raw outcome of one request: the status plus the body, when it parsed as JSON.
pub(crate) struct Reply {
    pub status: StatusCode,
    pub body: Option<Value>,
    pub envelope: Option<Envelope>,
}

impl ApiClient {
    pub(crate) async fn call(&self, req: RequestBuilder) -> Result<Reply, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let body = resp.bytes().await?;

        let body: Option<Value> = if body.is_empty() {
            None
        } else {
            serde_json::from_slice(&body).ok()
        };
        let envelope = body
            .as_ref()
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value::<Envelope>(v.clone()).ok());
        debug!(
            path = %url,
            status = status.as_u16(),
            code = envelope.as_ref().and_then(|e| e.code.as_deref()).unwrap_or("-"),
            "api reply"
        );
        Ok(Reply {
            status,
            body,
            envelope,
        })
    }
}

impl Reply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.envelope.as_ref().is_some_and(|e| e.has_code(code))
    }

    pub fn rejected(&self) -> ApiError {
        ApiError::rejected(self.status, self.envelope.as_ref())
    }

    /// Success means a 2xx status and the endpoint's success code.
    pub fn require_code(self, code: &str) -> Result<Envelope, ApiError> {
        if !self.is_success() || !self.has_code(code) {
            if self.is_success() && self.envelope.is_none() {
                return Err(ApiError::Malformed("missing response body".into()));
            }
            return Err(self.rejected());
        }
        self.envelope
            .ok_or_else(|| ApiError::Malformed("missing response body".into()))
    }

    /// Success means a 2xx status and a decodable `result`.
    pub fn require_result<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(self.rejected());
        }
        let result = self
            .envelope
            .and_then(|e| e.result)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ApiError::Malformed("response carries no result".into()))?;
        decode(result)
    }

    /// `result` when the body is an envelope, otherwise the bare body.
    pub fn require_payload<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(self.rejected());
        }
        let enveloped = self
            .envelope
            .and_then(|e| e.result)
            .filter(|v| !v.is_null());
        let value = enveloped
            .or(self.body)
            .ok_or_else(|| ApiError::Malformed("missing response body".into()))?;
        decode(value)
    }

    /// Any 2xx counts, with or without a body.
    pub fn require_success(self) -> Result<(), ApiError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.rejected())
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// `result` of an already-validated envelope.
pub(crate) fn result_of<T: DeserializeOwned>(envelope: Envelope) -> Result<T, ApiError> {
    let value = envelope
        .result
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::Malformed("response carries no result".into()))?;
    decode(value)
}
