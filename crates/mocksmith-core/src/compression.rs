//! Response body compression transform.
//!
//! Applies a compression policy to an expectation's response and keeps the
//! affected headers consistent: `Content-Encoding`, `Vary`, `Content-Type`,
//! `Content-Length` and (when already present) `ETag` all reflect the bytes
//! that will actually be transmitted.
//!
//! The transform is all-or-nothing. Every fallible step (byte extraction,
//! encoding) runs before the first mutation, so a failed call leaves the
//! expectation exactly as it was.

use std::fmt;
use std::fmt::Write as _;
use std::io::Write as _;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::write::{DeflateEncoder, GzEncoder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::expectation::{Expectation, ResponseBody};

/// Supported content codings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgo {
    /// No transformation; clears a previously declared encoding.
    Identity,
    Gzip,
    /// Raw DEFLATE stream, no zlib wrapper.
    Deflate,
}

impl fmt::Display for CompressionAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionAlgo::Identity => "identity",
            CompressionAlgo::Gzip => "gzip",
            CompressionAlgo::Deflate => "deflate",
        };
        f.write_str(name)
    }
}

impl FromStr for CompressionAlgo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(CompressionAlgo::Identity),
            "gzip" => Ok(CompressionAlgo::Gzip),
            "deflate" => Ok(CompressionAlgo::Deflate),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Whether the body is physically re-encoded or only declared as encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMode {
    /// Declare the encoding in headers and leave the body bytes untouched.
    /// Useful when the mocking engine compresses on the way out.
    HeadersOnly,
    /// Compress the body now and store it as a BINARY wrapper.
    PreCompress,
}

/// Apply a compression policy to the expectation's response.
///
/// `headers-only` adjusts `Content-Encoding`, `Vary` and `Content-Type`
/// without touching the body. `pre-compress` re-encodes the body bytes,
/// replaces the body with a BINARY wrapper and synchronizes
/// `Content-Length` and any existing `ETag` with the compressed payload.
/// `identity` clears a declared encoding in either mode and never alters
/// the body.
pub fn apply_compression(
    expectation: &mut Expectation,
    algo: CompressionAlgo,
    mode: CompressionMode,
) -> Result<()> {
    match mode {
        CompressionMode::HeadersOnly => {
            let headers = &mut expectation.http_response.headers;
            match algo {
                CompressionAlgo::Identity => headers.remove("Content-Encoding"),
                _ => {
                    headers.upsert("Content-Encoding", vec![algo.to_string()]);
                    headers.merge_token("Vary", "Accept-Encoding");
                }
            }
            if !headers.contains("Content-Type") {
                if let Some(body) = &expectation.http_response.body {
                    let ct = inferred_content_type(body);
                    expectation
                        .http_response
                        .headers
                        .upsert("Content-Type", vec![ct.to_string()]);
                }
            }
            Ok(())
        }
        CompressionMode::PreCompress => {
            if algo == CompressionAlgo::Identity {
                expectation.http_response.headers.remove("Content-Encoding");
                return Ok(());
            }
            let body = expectation
                .http_response
                .body
                .as_ref()
                .ok_or_else(|| Error::validation("httpResponse.body", "no body to compress"))?;
            let (raw, content_type) = body_to_bytes(body)?;
            let compressed = compress(algo, &raw)?;
            debug!(
                algorithm = %algo,
                raw_len = raw.len(),
                compressed_len = compressed.len(),
                "pre-compressed response body"
            );

            let response = &mut expectation.http_response;
            response
                .headers
                .upsert("Content-Encoding", vec![algo.to_string()]);
            response.headers.merge_token("Vary", "Accept-Encoding");
            response
                .headers
                .upsert("Content-Type", vec![content_type.clone()]);
            response
                .headers
                .upsert("Content-Length", vec![compressed.len().to_string()]);
            // The validator must describe the transmitted bytes. Only an
            // ETag the operator already set is rewritten.
            let has_etag = response
                .headers
                .get("ETag")
                .and_then(|v| v.first())
                .is_some_and(|v| !v.is_empty());
            if has_etag {
                response
                    .headers
                    .upsert("ETag", vec![quoted_content_hash(&compressed)]);
            }
            response.body = Some(ResponseBody::binary(&compressed, Some(content_type)));
            Ok(())
        }
    }
}

/// Render a response body to the byte sequence and content type it stands
/// for. Structured values serialize to JSON bytes; wrapper shapes are
/// unwrapped first.
pub fn body_to_bytes(body: &ResponseBody) -> Result<(Vec<u8>, String)> {
    use crate::body::BodyMatcher;

    match body {
        ResponseBody::Text(text) => Ok((
            text.clone().into_bytes(),
            infer_text_content_type(text).to_string(),
        )),
        ResponseBody::Json(value) => Ok((
            serde_json::to_vec(value).map_err(|source| Error::BodyEncode {
                context: "response body",
                source,
            })?,
            "application/json".to_string(),
        )),
        ResponseBody::Wrapped(BodyMatcher::Binary {
            base64_bytes,
            content_type,
        }) => {
            let bytes = BASE64.decode(base64_bytes)?;
            let ct = content_type
                .clone()
                .unwrap_or_else(|| infer_bytes_content_type(&bytes).to_string());
            Ok((bytes, ct))
        }
        ResponseBody::Wrapped(BodyMatcher::Text { string }) => Ok((
            string.clone().into_bytes(),
            infer_text_content_type(string).to_string(),
        )),
        ResponseBody::Wrapped(BodyMatcher::Json { json, .. }) => Ok((
            serde_json::to_vec(json).map_err(|source| Error::BodyEncode {
                context: "response body",
                source,
            })?,
            "application/json".to_string(),
        )),
        // Matcher shapes without a byte rendering serialize as their wire
        // form.
        ResponseBody::Wrapped(other) => Ok((
            serde_json::to_vec(other).map_err(|source| Error::BodyEncode {
                context: "response body",
                source,
            })?,
            "application/json".to_string(),
        )),
    }
}

fn inferred_content_type(body: &ResponseBody) -> &'static str {
    use crate::body::BodyMatcher;

    match body {
        ResponseBody::Json(_) | ResponseBody::Wrapped(BodyMatcher::Json { .. }) => {
            "application/json"
        }
        ResponseBody::Text(text) | ResponseBody::Wrapped(BodyMatcher::Text { string: text }) => {
            infer_text_content_type(text)
        }
        ResponseBody::Wrapped(BodyMatcher::Binary { base64_bytes, .. }) => {
            match BASE64.decode(base64_bytes) {
                Ok(bytes) => infer_bytes_content_type(&bytes),
                Err(_) => "application/octet-stream",
            }
        }
        ResponseBody::Wrapped(_) => "application/json",
    }
}

fn infer_text_content_type(text: &str) -> &'static str {
    if serde_json::from_str::<serde_json::Value>(text).is_ok() {
        "application/json"
    } else {
        "text/plain"
    }
}

fn infer_bytes_content_type(bytes: &[u8]) -> &'static str {
    if serde_json::from_slice::<serde_json::Value>(bytes).is_ok() {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

fn compress(algo: CompressionAlgo, bytes: &[u8]) -> Result<Vec<u8>> {
    match algo {
        CompressionAlgo::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes)?;
            Ok(encoder.finish()?)
        }
        CompressionAlgo::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes)?;
            Ok(encoder.finish()?)
        }
        CompressionAlgo::Identity => {
            Err(Error::UnsupportedAlgorithm("identity".to_string()))
        }
    }
}

/// Strong-validator ETag value for a payload: quoted lowercase hex of the
/// content hash.
pub fn quoted_content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2 + 2);
    out.push('"');
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out.push('"');
    out
}
