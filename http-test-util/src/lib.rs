pub mod drain;

use bytes::Bytes;
use http_body_util::Full;

pub const CHECK_VERSION_PATH: &str = "/update/check_version";

#[inline]
pub fn byte_body<B: Into<Bytes>>(bytes: B) -> Full<Bytes> {
    Full::new(bytes.into())
}

/// Body posted by a client asking whether it runs the latest release.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VersionCheckRequest {
    pub version: String,
    #[serde(rename = "os-arch", default)]
    pub os_arch: String,
}

impl VersionCheckRequest {
    #[must_use]
    pub fn new(version: impl Into<String>, os_arch: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            os_arch: os_arch.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VersionCheckResponse {
    pub version: String,
    pub update_url: String,
    pub update_log: String,
    pub need_update: bool,
}

/// Error body returned with any non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
