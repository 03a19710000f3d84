//! AWS Signature Version 4 request signing.
//!
//! MinIO authenticates admin calls exactly like S3 calls: the request is
//! signed for service `s3` in the deployment's region, with the payload
//! hash carried in `x-amz-content-sha256`.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningParams,
    SigningSettings, UriPathNormalizationMode,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{AdminError, AdminResult};

/// Region MinIO assumes when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Service name used in the credential scope.
pub const SERVICE: &str = "s3";

/// Signing credentials and scope.
#[derive(Clone, Copy)]
pub struct SigV4<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

impl<'a> SigV4<'a> {
    /// Credentials scoped to MinIO's defaults.
    pub fn minio(access_key: &'a str, secret_key: &'a str) -> Self {
        Self {
            access_key,
            secret_key,
            region: DEFAULT_REGION,
            service: SERVICE,
        }
    }

    /// Headers to attach to a request for it to authenticate.
    ///
    /// Returns `x-amz-date`, `x-amz-content-sha256` and `authorization`.
    /// `host` is signed as well but set by the HTTP client from the URL.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> AdminResult<Vec<(String, String)>> {
        self.sign_with(s3_settings(), method, url, payload, now)
    }

    fn sign_with(
        &self,
        settings: SigningSettings,
        method: &str,
        url: &Url,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> AdminResult<Vec<(String, String)>> {
        let identity = Identity::new(
            Credentials::new(self.access_key, self.secret_key, None, None, "minio-admin"),
            None,
        );
        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(self.region)
            .name(self.service)
            .time(SystemTime::from(now))
            .settings(settings)
            .build()
            .map_err(|e| AdminError::Signing(e.to_string()))?
            .into();

        let request = SignableRequest::new(
            method,
            url.as_str(),
            std::iter::empty(),
            SignableBody::Bytes(payload),
        )
        .map_err(|e| AdminError::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| AdminError::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

/// S3 signing rules: single percent-encoding, no path normalization and a
/// signed payload hash header.
fn s3_settings() -> SigningSettings {
    let mut settings = SigningSettings::default();
    settings.percent_encoding_mode = PercentEncodingMode::Single;
    settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;
    settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
    settings
}
