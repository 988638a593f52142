// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote label source — one HTTP GET per cycle and normalisation of the
// response into raw items.
//
// Response shapes:
//   {"files": [[payload, name, id?], ...]}   -> one entry per inner array
//   {"message": "..."}                      -> informational, no entries
//
// Scalars are coerced to strings (numbers and booleans are stringified).
// Null, arrays, and objects in the payload or name slot invalidate the entry.

use std::time::Duration;

use labelpress_core::error::{LabelpressError, Result};
use labelpress_core::types::RawItem;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Request timeout for every remote call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body carried into logs.
const BODY_EXCERPT: usize = 200;

/// Normalised remote response.
#[derive(Debug, Default)]
pub struct RemoteBatch {
    /// One result per element of `files`, in order. `Err` marks a rejected
    /// entry and carries the reason.
    pub entries: Vec<Result<RawItem>>,
    /// Present when the response had no `files` field.
    pub message: Option<String>,
    /// Whether a `files` field was present at all.
    pub has_files: bool,
}

/// Outcome of a connection test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    pub status: u16,
    pub body_len: usize,
}

#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl RemoteSource {
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LabelpressError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    /// Fetch pending labels for `caller_id`.
    #[instrument(skip(self, caller_id))]
    pub async fn fetch(&self, endpoint: &str, caller_id: &str) -> Result<RemoteBatch> {
        let (status, body) = self.get(endpoint, caller_id).await?;
        if !(200..300).contains(&status) {
            return Err(LabelpressError::HttpStatus {
                status,
                body: excerpt(&body),
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| LabelpressError::MalformedResponse(format!("invalid JSON: {e}")))?;
        let batch = normalize(value)?;
        debug!(
            entries = batch.entries.len(),
            has_message = batch.message.is_some(),
            "remote response normalised"
        );
        Ok(batch)
    }

    /// One GET against the endpoint; succeeds on any 2xx status.
    #[instrument(skip(self, caller_id))]
    pub async fn test_connection(&self, endpoint: &str, caller_id: &str) -> Result<ConnectionReport> {
        let (status, body) = self.get(endpoint, caller_id).await?;
        info!(status, body_len = body.len(), "connection test response");
        if !(200..300).contains(&status) {
            return Err(LabelpressError::HttpStatus {
                status,
                body: excerpt(&body),
            });
        }
        Ok(ConnectionReport {
            status,
            body_len: body.len(),
        })
    }

    async fn get(&self, endpoint: &str, caller_id: &str) -> Result<(u16, String)> {
        let response = self
            .client
            .get(endpoint.trim())
            .query(&[("user_id", caller_id.trim())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        Ok((status, body))
    }

    fn transport_error(&self, err: reqwest::Error) -> LabelpressError {
        if err.is_timeout() {
            LabelpressError::Timeout(self.timeout.as_secs())
        } else {
            LabelpressError::Transport(err.to_string())
        }
    }
}

/// Turn a decoded response body into a [`RemoteBatch`].
pub fn normalize(value: Value) -> Result<RemoteBatch> {
    let Value::Object(mut object) = value else {
        return Err(LabelpressError::MalformedResponse(
            "response is not a JSON object".into(),
        ));
    };

    match object.remove("files") {
        Some(Value::Array(files)) => Ok(RemoteBatch {
            entries: files
                .iter()
                .enumerate()
                .map(|(index, entry)| normalize_entry(index + 1, entry))
                .collect(),
            message: None,
            has_files: true,
        }),
        Some(Value::Null) | None => Ok(RemoteBatch {
            entries: Vec::new(),
            message: object.get("message").and_then(coerce_scalar),
            has_files: false,
        }),
        Some(other) => Err(LabelpressError::MalformedResponse(format!(
            "`files` is not an array (found {})",
            kind(&other)
        ))),
    }
}

fn normalize_entry(position: usize, entry: &Value) -> Result<RawItem> {
    let Value::Array(fields) = entry else {
        return Err(LabelpressError::InvalidEntry(format!(
            "entry {position} is not an array (found {})",
            kind(entry)
        )));
    };
    if fields.len() < 2 {
        return Err(LabelpressError::InvalidEntry(format!(
            "entry {position} has {} element(s), expected at least 2",
            fields.len()
        )));
    }

    let payload = coerce_scalar(&fields[0]).ok_or_else(|| {
        LabelpressError::InvalidEntry(format!("entry {position} has no usable payload"))
    })?;
    let name = coerce_scalar(&fields[1]).ok_or_else(|| {
        LabelpressError::InvalidEntry(format!("entry {position} has no usable name"))
    })?;
    let id = fields.get(2).and_then(coerce_scalar);

    Ok(RawItem { payload, name, id })
}

fn coerce_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT).collect()
}
