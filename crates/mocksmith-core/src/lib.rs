//! Expectation model and transformation engine for MockServer-style HTTP
//! mocking configurations.
//!
//! The crate builds and manipulates expectation JSON: polymorphic body
//! matchers, case-insensitive header/parameter collections, deep cloning,
//! progressive delay expansion, response compression and the feature
//! catalog that ties them together. It produces and transforms
//! configuration only; it never serves traffic or executes matching.

pub mod body;
pub mod collection;
pub mod compression;
pub mod config;
pub mod error;
pub mod expectation;
pub mod features;
pub mod progressive;

pub use body::{BodyMatcher, MatchType, Parameter};
pub use collection::{NameValueList, NameValues};
pub use compression::{apply_compression, CompressionAlgo, CompressionMode};
pub use config::{ConfigMetadata, ConfigSettings, ExpectationStats, MockConfiguration};
pub use error::{Error, Result};
pub use expectation::{
    ConnectionOptions, Delay, Expectation, HttpRequest, HttpResponse, ResponseBody, TimeToLive,
    TimeUnit, Times,
};
pub use features::{
    apply_all, catalog, CachePolicy, ContentLengthAction, Feature, FeatureCategory, FeatureInfo,
    FeatureKey,
};
pub use progressive::{expand_progressive, ProgressivePolicy};
