//! The expectation aggregate: request matcher, response definition and
//! scheduling metadata.
//!
//! Field names mirror MockServer's expectation schema exactly
//! (`httpRequest`/`httpResponse`, `times`, `priority`, ...), so serializing
//! an [`Expectation`] yields the engine's wire format.

use serde::{Deserialize, Serialize};

use crate::body::BodyMatcher;
use crate::collection::NameValueList;
use crate::error::{Error, Result};
use crate::progressive::ProgressivePolicy;

/// Time unit for delays and lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
}

/// Response delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delay {
    pub time_unit: TimeUnit,
    pub value: u64,
}

impl Delay {
    pub fn milliseconds(value: u64) -> Self {
        Self {
            time_unit: TimeUnit::Milliseconds,
            value,
        }
    }
}

/// How long an expectation stays registered, independent of match count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeToLive {
    pub time_unit: TimeUnit,
    pub time_to_live: u64,
}

impl TimeToLive {
    pub fn seconds(time_to_live: u64) -> Self {
        Self {
            time_unit: TimeUnit::Seconds,
            time_to_live,
        }
    }
}

/// Match-count policy: unlimited, or a positive remaining-match counter.
///
/// Wire format is `{"unlimited": true}` or `{"remainingTimes": n}`; the
/// raw/out pair below handles both shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TimesRaw", into = "TimesOut")]
pub enum Times {
    Unlimited,
    Exactly(u32),
}

impl Times {
    /// A limited match count. Zero is rejected: "unlimited" has its own
    /// variant, so the count must be positive.
    pub fn exactly(count: u32) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidCount {
                value: i64::from(count),
            });
        }
        Ok(Times::Exactly(count))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimesRaw {
    #[serde(default)]
    remaining_times: Option<u32>,
    #[serde(default)]
    unlimited: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimesOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_times: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unlimited: Option<bool>,
}

impl From<TimesRaw> for Times {
    fn from(raw: TimesRaw) -> Self {
        if raw.unlimited == Some(true) {
            return Times::Unlimited;
        }
        match raw.remaining_times {
            Some(n) if n > 0 => Times::Exactly(n),
            _ => Times::Unlimited,
        }
    }
}

impl From<Times> for TimesOut {
    fn from(times: Times) -> Self {
        match times {
            Times::Unlimited => TimesOut {
                remaining_times: None,
                unlimited: Some(true),
            },
            Times::Exactly(n) => TimesOut {
                remaining_times: Some(n),
                unlimited: None,
            },
        }
    }
}

/// Connection behavior flags for the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionOptions {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub suppress_connection_header: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub suppress_content_length_header: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length_header_override: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive_override: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub close_socket: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_socket_delay: Option<Delay>,
}

/// Response body: an arbitrary structured value, plain text, or one of the
/// MockServer wrapper shapes (`BINARY`/`STRING`/`JSON` with a `type` tag).
///
/// Untagged: wrappers are tried first since only they carry a `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Wrapped(BodyMatcher),
    Text(String),
    Json(serde_json::Value),
}

impl ResponseBody {
    /// Wrap raw bytes in the BINARY wrapper.
    pub fn binary(bytes: &[u8], content_type: Option<String>) -> Self {
        ResponseBody::Wrapped(BodyMatcher::binary(bytes, content_type))
    }

    pub fn text(text: impl Into<String>) -> Self {
        ResponseBody::Text(text.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        ResponseBody::Json(value)
    }
}

/// Request matcher half of an expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "NameValueList::is_empty")]
    pub path_parameters: NameValueList,
    #[serde(skip_serializing_if = "NameValueList::is_empty")]
    pub query_string_parameters: NameValueList,
    #[serde(skip_serializing_if = "NameValueList::is_empty")]
    pub headers: NameValueList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyMatcher>,
}

fn default_status_code() -> u16 {
    200
}

/// Response definition half of an expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
    #[serde(default, skip_serializing_if = "NameValueList::is_empty")]
    pub headers: NameValueList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_options: Option<ConnectionOptions>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            body: None,
            headers: NameValueList::new(),
            delay: None,
            connection_options: None,
        }
    }
}

impl HttpResponse {
    /// The connection options, created on first access.
    pub fn connection_options_mut(&mut self) -> &mut ConnectionOptions {
        self.connection_options.get_or_insert_with(ConnectionOptions::default)
    }
}

/// One mock rule: request matcher + response definition + scheduling
/// metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Times>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<TimeToLive>,
    /// Delay-escalation policy, consumed by progressive expansion.
    /// Kept in stored snapshots; stripped from wire export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive: Option<ProgressivePolicy>,
    #[serde(default)]
    pub http_request: HttpRequest,
    #[serde(default)]
    pub http_response: HttpResponse,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self {
            method: String::new(),
            path: String::new(),
            path_parameters: NameValueList::new(),
            query_string_parameters: NameValueList::new(),
            headers: NameValueList::new(),
            body: None,
        }
    }
}

impl Expectation {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_request: HttpRequest {
                method: method.into(),
                path: path.into(),
                ..HttpRequest::default()
            },
            ..Self::default()
        }
    }

    /// Display label: the description when set, otherwise `METHOD /path`.
    pub fn label(&self) -> String {
        match &self.description {
            Some(d) if !d.is_empty() => d.clone(),
            _ => format!("{} {}", self.http_request.method, self.http_request.path),
        }
    }

    /// A fully independent copy: value-equal, but no nested collection
    /// (headers, parameter lists, body values, scheduling options) shares
    /// backing storage with the original.
    ///
    /// Since every field is owned, structural `Clone` already provides the
    /// deep copy; the named method expresses the snapshot-before-edit
    /// contract and gives the independence guarantee a place to be tested.
    /// Total over well-formed inputs, no failure mode.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_expectation() -> Expectation {
        let mut exp = Expectation::new("POST", "/api/orders");
        exp.description = Some("create order".to_string());
        exp.priority = 5;
        exp.times = Some(Times::exactly(3).unwrap());
        exp.http_request
            .headers
            .upsert("Content-Type", vec!["application/json".to_string()]);
        exp.http_request
            .query_string_parameters
            .upsert("region", vec!["eu".to_string(), "us".to_string()]);
        exp.http_request
            .path_parameters
            .upsert("id", vec!["[0-9]+".to_string()]);
        exp.http_request.body =
            Some(BodyMatcher::json(r#"{"sku": "A-1", "qty": 2}"#, None).unwrap());
        exp.http_response.status_code = 201;
        exp.http_response.body = Some(ResponseBody::json(json!({"id": 42, "ok": true})));
        exp.http_response
            .headers
            .upsert("Cache-Control", vec!["no-store".to_string()]);
        exp.http_response.delay = Some(Delay::milliseconds(100));
        exp
    }

    #[test]
    fn test_deep_clone_is_value_equal() {
        let exp = sample_expectation();
        assert_eq!(exp, exp.deep_clone());
    }

    #[test]
    fn test_deep_clone_mutating_clone_leaves_original_unchanged() {
        let exp = sample_expectation();
        let reference = exp.clone();

        let mut cloned = exp.deep_clone();
        cloned.description = Some("mutated".to_string());
        cloned.priority = 99;
        cloned.times = Some(Times::Unlimited);
        cloned.http_request.headers.upsert("X-New", vec!["v".to_string()]);
        cloned
            .http_request
            .query_string_parameters
            .remove("region");
        cloned.http_request.path_parameters.upsert("id", vec!["x".to_string()]);
        cloned.http_request.body = None;
        cloned.http_response.headers.remove("Cache-Control");
        cloned.http_response.body = Some(ResponseBody::json(json!({"changed": true})));
        cloned.http_response.delay = Some(Delay::milliseconds(9999));
        cloned.http_response.connection_options_mut().close_socket = true;

        assert_eq!(exp, reference);
    }

    #[test]
    fn test_deep_clone_mutating_original_leaves_clone_unchanged() {
        let mut exp = sample_expectation();
        let cloned = exp.deep_clone();
        let reference = cloned.clone();

        exp.http_response.headers.upsert("ETag", vec!["\"abc\"".to_string()]);
        exp.http_request.headers.remove("Content-Type");
        exp.http_response.body = None;

        assert_eq!(cloned, reference);
    }

    #[test]
    fn test_times_wire_shapes() {
        let unlimited = serde_json::to_value(Times::Unlimited).unwrap();
        assert_eq!(unlimited, json!({"unlimited": true}));

        let limited = serde_json::to_value(Times::exactly(2).unwrap()).unwrap();
        assert_eq!(limited, json!({"remainingTimes": 2}));

        let parsed: Times = serde_json::from_value(json!({"unlimited": true})).unwrap();
        assert_eq!(parsed, Times::Unlimited);
        let parsed: Times = serde_json::from_value(json!({"remainingTimes": 4})).unwrap();
        assert_eq!(parsed, Times::Exactly(4));
    }

    #[test]
    fn test_times_rejects_zero_count() {
        assert!(matches!(
            Times::exactly(0),
            Err(Error::InvalidCount { value: 0 })
        ));
    }

    #[test]
    fn test_time_to_live_round_trips_on_the_wire() {
        let mut exp = Expectation::new("GET", "/session");
        exp.time_to_live = Some(TimeToLive::seconds(60));

        let wire = serde_json::to_value(&exp).unwrap();
        assert_eq!(
            wire["timeToLive"],
            json!({"timeUnit": "SECONDS", "timeToLive": 60})
        );

        let parsed: Expectation = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed.time_to_live, Some(TimeToLive::seconds(60)));

        // Absent lifetime stays off the wire.
        let wire = serde_json::to_value(Expectation::new("GET", "/plain")).unwrap();
        assert!(wire.get("timeToLive").is_none());
    }

    #[test]
    fn test_delay_wire_shape() {
        let wire = serde_json::to_value(Delay::milliseconds(250)).unwrap();
        assert_eq!(wire, json!({"timeUnit": "MILLISECONDS", "value": 250}));
    }

    #[test]
    fn test_response_body_untagged_roundtrip() {
        let text: ResponseBody = serde_json::from_value(json!("plain")).unwrap();
        assert_eq!(text, ResponseBody::Text("plain".to_string()));

        let structured: ResponseBody = serde_json::from_value(json!({"a": 1})).unwrap();
        assert_eq!(structured, ResponseBody::Json(json!({"a": 1})));

        // Objects with a wrapper tag resolve to the wrapped matcher form.
        let wrapped: ResponseBody =
            serde_json::from_value(json!({"type": "BINARY", "base64Bytes": "aGk="})).unwrap();
        assert!(matches!(
            wrapped,
            ResponseBody::Wrapped(BodyMatcher::Binary { .. })
        ));
    }

    #[test]
    fn test_label_falls_back_to_method_and_path() {
        let mut exp = Expectation::new("GET", "/health");
        assert_eq!(exp.label(), "GET /health");
        exp.description = Some("probe".to_string());
        assert_eq!(exp.label(), "probe");
    }

    #[test]
    fn test_expectation_wire_shape() {
        let exp = sample_expectation();
        let wire = serde_json::to_value(&exp).unwrap();

        assert_eq!(wire["httpRequest"]["method"], "POST");
        assert_eq!(wire["httpRequest"]["path"], "/api/orders");
        assert_eq!(wire["httpRequest"]["body"]["type"], "JSON");
        assert_eq!(wire["httpResponse"]["statusCode"], 201);
        assert_eq!(wire["httpResponse"]["delay"]["timeUnit"], "MILLISECONDS");
        assert_eq!(wire["times"]["remainingTimes"], 3);
        assert_eq!(wire["priority"], 5);
        // Empty collections stay off the wire.
        assert!(wire["httpResponse"].get("connectionOptions").is_none());
    }
}
