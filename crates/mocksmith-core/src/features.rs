//! Response behavior and connection control features.
//!
//! Each [`Feature`] is a fully resolved configuration step that mutates one
//! expectation. The prompt layer builds `Feature` values from operator
//! input; applying them is deterministic (except the explicit random pick of
//! [`Feature::RangeDelay`]) and never does I/O.
//!
//! [`catalog`] exposes the static feature listing used for menus and the
//! `features` CLI command.

use rand::Rng;
use tracing::debug;

use crate::compression::{apply_compression, quoted_content_hash, body_to_bytes, CompressionAlgo, CompressionMode};
use crate::error::{Error, Result};
use crate::expectation::{Delay, Expectation, Times};
use crate::progressive::ProgressivePolicy;

/// Cache-Control presets offered by the caching feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePolicy {
    NoStore,
    NoCache,
    PrivateShort,
    PublicMedium,
    Custom(String),
}

impl CachePolicy {
    pub fn header_value(&self) -> String {
        match self {
            CachePolicy::NoStore => "no-store".to_string(),
            CachePolicy::NoCache => "no-cache".to_string(),
            CachePolicy::PrivateShort => "private, max-age=60".to_string(),
            CachePolicy::PublicMedium => "public, max-age=300".to_string(),
            CachePolicy::Custom(value) => value.trim().to_string(),
        }
    }
}

/// Content-Length handling: force a value or drop the header entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLengthAction {
    Override(u64),
    Suppress,
}

/// One resolved configuration step.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// Fixed response delay in milliseconds.
    FixedDelay { delay_ms: u64 },
    /// Pick one delay in `[min_ms, max_ms]` at apply time and record the
    /// pick in the description.
    RangeDelay { min_ms: u64, max_ms: u64 },
    /// Escalating delay: stores the policy for later expansion and sets the
    /// base delay with a single-match limit.
    ProgressiveDelay(ProgressivePolicy),
    /// Match-count limit.
    Limit(Times),
    Priority(u32),
    ContentLength(ContentLengthAction),
    CacheControl(CachePolicy),
    /// Strong ETag computed from the rendered response body bytes.
    EtagFromBody,
    Compression {
        algo: CompressionAlgo,
        mode: CompressionMode,
    },
    SuppressConnectionHeader,
    /// Chunked transfer encoding with an explicit chunk size in bytes.
    Chunked { chunk_size: u64 },
    /// Force connection reuse.
    KeepAlive,
    /// Forcefully close the connection after the response, optionally after
    /// a delay.
    CloseSocket { delay_ms: Option<u64> },
}

fn annotate(expectation: &mut Expectation, note: String) {
    let annotated = match &expectation.description {
        Some(d) if !d.trim().is_empty() => format!("{} {note}", d.trim()),
        _ => note,
    };
    expectation.description = Some(annotated);
}

impl Feature {
    /// Apply this feature to the expectation.
    ///
    /// Mutations are applied only after all validation for the feature has
    /// passed, so a failed apply leaves the expectation unchanged.
    pub fn apply(&self, expectation: &mut Expectation) -> Result<()> {
        match self {
            Feature::FixedDelay { delay_ms } => {
                expectation.http_response.delay = Some(Delay::milliseconds(*delay_ms));
            }
            Feature::RangeDelay { min_ms, max_ms } => {
                if max_ms < min_ms {
                    return Err(Error::validation(
                        "delay",
                        format!("invalid range {min_ms}-{max_ms}: max below min"),
                    ));
                }
                let pick = rand::thread_rng().gen_range(*min_ms..=*max_ms);
                expectation.http_response.delay = Some(Delay::milliseconds(pick));
                annotate(
                    expectation,
                    format!("[delay {pick}ms from {min_ms}-{max_ms}]"),
                );
            }
            Feature::ProgressiveDelay(policy) => {
                policy.validate()?;
                expectation.http_response.delay = Some(Delay::milliseconds(policy.base));
                expectation.times = Some(Times::Exactly(1));
                expectation.progressive = Some(*policy);
                annotate(
                    expectation,
                    format!(
                        "[progressive delay: base={}, step={}, cap={}]",
                        policy.base, policy.step, policy.cap
                    ),
                );
            }
            Feature::Limit(times) => {
                expectation.times = Some(*times);
            }
            Feature::Priority(priority) => {
                expectation.priority = *priority;
            }
            Feature::ContentLength(action) => {
                let options = expectation.http_response.connection_options_mut();
                match action {
                    ContentLengthAction::Override(value) => {
                        options.content_length_header_override = Some(*value);
                    }
                    ContentLengthAction::Suppress => {
                        options.suppress_content_length_header = true;
                    }
                }
            }
            Feature::CacheControl(policy) => {
                expectation
                    .http_response
                    .headers
                    .upsert("Cache-Control", vec![policy.header_value()]);
            }
            Feature::EtagFromBody => {
                let body = expectation
                    .http_response
                    .body
                    .as_ref()
                    .ok_or_else(|| Error::validation("httpResponse.body", "no body to hash"))?;
                let (bytes, _) = body_to_bytes(body)?;
                expectation
                    .http_response
                    .headers
                    .upsert("ETag", vec![quoted_content_hash(&bytes)]);
            }
            Feature::Compression { algo, mode } => {
                apply_compression(expectation, *algo, *mode)?;
            }
            Feature::SuppressConnectionHeader => {
                expectation
                    .http_response
                    .connection_options_mut()
                    .suppress_connection_header = true;
            }
            Feature::Chunked { chunk_size } => {
                if *chunk_size == 0 {
                    return Err(Error::validation("chunkSize", "chunk size must be positive"));
                }
                expectation.http_response.connection_options_mut().chunk_size = Some(*chunk_size);
                // The engine derives both headers from the chunking itself.
                expectation.http_response.headers.remove("Content-Length");
                expectation.http_response.headers.remove("Transfer-Encoding");
            }
            Feature::KeepAlive => {
                let options = expectation.http_response.connection_options_mut();
                options.keep_alive_override = Some(true);
                options.close_socket = false;
                expectation.http_response.headers.remove("Connection");
            }
            Feature::CloseSocket { delay_ms } => {
                let options = expectation.http_response.connection_options_mut();
                options.close_socket = true;
                options.close_socket_delay = delay_ms.map(Delay::milliseconds);
            }
        }
        debug!(feature = self.key().as_str(), expectation = %expectation.label(), "applied feature");
        Ok(())
    }

    /// The catalog key this feature belongs to.
    pub fn key(&self) -> FeatureKey {
        match self {
            Feature::FixedDelay { .. }
            | Feature::RangeDelay { .. }
            | Feature::ProgressiveDelay(_) => FeatureKey::Delays,
            Feature::Limit(_) => FeatureKey::Limits,
            Feature::Priority(_) => FeatureKey::Priority,
            Feature::ContentLength(_) => FeatureKey::ContentLengthHeaders,
            Feature::CacheControl(_) | Feature::EtagFromBody => FeatureKey::Caching,
            Feature::Compression { .. } => FeatureKey::Compression,
            Feature::SuppressConnectionHeader => FeatureKey::SuppressConnectionHeader,
            Feature::Chunked { .. } => FeatureKey::ChunkedEncoding,
            Feature::KeepAlive => FeatureKey::KeepAlive,
            Feature::CloseSocket { .. } => FeatureKey::CloseSocket,
        }
    }
}

/// Apply a sequence of features, reverting the expectation to its state
/// before the first feature if any of them fails.
pub fn apply_all(expectation: &mut Expectation, features: &[Feature]) -> Result<()> {
    let snapshot = expectation.deep_clone();
    for feature in features {
        if let Err(e) = feature.apply(expectation) {
            *expectation = snapshot;
            return Err(e);
        }
    }
    Ok(())
}

/// Feature group shown in menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureCategory {
    ResponseBehavior,
    ConnectionControl,
}

impl FeatureCategory {
    pub fn label(&self) -> &'static str {
        match self {
            FeatureCategory::ResponseBehavior => "Response Behavior",
            FeatureCategory::ConnectionControl => "Connection Control",
        }
    }
}

/// Stable identifier of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    Delays,
    Limits,
    Priority,
    ContentLengthHeaders,
    Caching,
    Compression,
    SuppressConnectionHeader,
    ChunkedEncoding,
    KeepAlive,
    CloseSocket,
}

impl FeatureKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::Delays => "delays",
            FeatureKey::Limits => "limits",
            FeatureKey::Priority => "priority",
            FeatureKey::ContentLengthHeaders => "content-length-headers",
            FeatureKey::Caching => "caching",
            FeatureKey::Compression => "compression",
            FeatureKey::SuppressConnectionHeader => "suppress-connection-header",
            FeatureKey::ChunkedEncoding => "chunked-encoding",
            FeatureKey::KeepAlive => "keep-alive",
            FeatureKey::CloseSocket => "close-socket",
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct FeatureInfo {
    pub key: FeatureKey,
    pub category: FeatureCategory,
    pub label: &'static str,
    pub description: &'static str,
}

const CATALOG: &[FeatureInfo] = &[
    FeatureInfo {
        key: FeatureKey::Delays,
        category: FeatureCategory::ResponseBehavior,
        label: "Response Delays",
        description: "Add fixed, random, or progressive delays",
    },
    FeatureInfo {
        key: FeatureKey::Limits,
        category: FeatureCategory::ResponseBehavior,
        label: "Response Limits",
        description: "Limit how many times expectation matches",
    },
    FeatureInfo {
        key: FeatureKey::Priority,
        category: FeatureCategory::ResponseBehavior,
        label: "Expectation Priority",
        description: "Set priority for conflicting expectations",
    },
    FeatureInfo {
        key: FeatureKey::ContentLengthHeaders,
        category: FeatureCategory::ResponseBehavior,
        label: "Control Content Length Header",
        description: "Manually set or remove Content-Length header",
    },
    FeatureInfo {
        key: FeatureKey::Caching,
        category: FeatureCategory::ResponseBehavior,
        label: "Cache Control",
        description: "Configure cache headers and ETags",
    },
    FeatureInfo {
        key: FeatureKey::Compression,
        category: FeatureCategory::ResponseBehavior,
        label: "Response Compression",
        description: "Enable gzip/deflate compression",
    },
    FeatureInfo {
        key: FeatureKey::SuppressConnectionHeader,
        category: FeatureCategory::ConnectionControl,
        label: "Suppress Connection Header",
        description: "Suppress the Connection header in responses",
    },
    FeatureInfo {
        key: FeatureKey::ChunkedEncoding,
        category: FeatureCategory::ConnectionControl,
        label: "Chunked Encoding, Specify Chunk Size",
        description: "Control chunked transfer encoding",
    },
    FeatureInfo {
        key: FeatureKey::KeepAlive,
        category: FeatureCategory::ConnectionControl,
        label: "Override Keep-Alive Settings",
        description: "Connection persistence patterns",
    },
    FeatureInfo {
        key: FeatureKey::CloseSocket,
        category: FeatureCategory::ConnectionControl,
        label: "Close Socket",
        description: "Forcefully close the connection after response",
    },
];

/// The complete feature catalog.
pub fn catalog() -> &'static [FeatureInfo] {
    CATALOG
}
