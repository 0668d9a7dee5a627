// ============================================================
// Layer 6 - S3-Compatible Blob Store
// ============================================================
// Talks to MinIO (or any S3 API) over plain HTTP using path-style
// URLs: {scheme}://{host}/{bucket}/{key}
//
// Requests are signed with AWS Signature Version 4:
//
//   canonical request ─sha256→ string to sign
//   secret ─HMAC(date)→ HMAC(region)→ HMAC("s3")→ HMAC("aws4_request")
//   signature = hex(HMAC(signing key, string to sign))
//
// Only GET and PUT of whole objects are needed, so the signer
// covers exactly three headers: host, x-amz-content-sha256 and
// x-amz-date.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use sha2::{Digest, Sha256};

use crate::domain::error::PipelineError;
use crate::domain::traits::BlobStore;

type HmacSha256 = Hmac<Sha256>;

const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

/// Credentials and location of an S3-compatible service
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// `http://host:port`, `https://host`, or bare `host:port` (http)
    pub endpoint:   String,
    pub access_key: String,
    pub secret_key: String,
    pub region:     String,
}

pub struct S3BlobStore {
    client:   Client,
    scheme:   String,
    host:     String,
    settings: S3Settings,
}

impl S3BlobStore {
    pub fn new(settings: S3Settings) -> Result<Self> {
        let (scheme, host) = match settings.endpoint.split_once("://") {
            Some((scheme, host)) => (scheme.to_string(), host.trim_end_matches('/').to_string()),
            None => ("http".to_string(), settings.endpoint.trim_end_matches('/').to_string()),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, scheme, host, settings })
    }

    fn signed_headers(
        &self,
        method: &str,
        path: &str,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date     = now.format("%Y%m%d").to_string();

        let canonical = canonical_request(method, path, &self.host, payload_hash, &amz_date);
        let scope     = format!("{date}/{}/s3/aws4_request", self.settings.region);
        let to_sign   = format!("AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}", sha256_hex(canonical.as_bytes()));

        let key       = signing_key(&self.settings.secret_key, &date, &self.settings.region, "s3")?;
        let signature = hex(&hmac(&key, to_sign.as_bytes())?);

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            self.settings.access_key
        );
        Ok((amz_date, authorization))
    }

    fn object_path(bucket: &str, key: &str) -> String {
        format!("/{}/{}", uri_encode(bucket), uri_encode(key))
    }
}

impl BlobStore for S3BlobStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path         = Self::object_path(bucket, key);
        let payload_hash = sha256_hex(b"");
        let (amz_date, authorization) = self.signed_headers("GET", &path, &payload_hash, Utc::now())?;

        let response = self
            .client
            .get(format!("{}://{}{}", self.scheme, self.host, path))
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .header("authorization", authorization)
            .send()
            .map_err(|e| PipelineError::retrieval(bucket, key, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PipelineError::retrieval(bucket, key, "object does not exist").into());
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::retrieval(bucket, key, format!("HTTP {status}: {body}")).into());
        }

        let expected = response.content_length();
        let bytes    = response.bytes().map_err(|e| PipelineError::retrieval(bucket, key, e))?;
        if let Some(expected) = expected {
            if bytes.len() as u64 != expected {
                let reason = format!("truncated body: got {} of {expected} bytes", bytes.len());
                return Err(PipelineError::retrieval(bucket, key, reason).into());
            }
        }

        Ok(bytes.to_vec())
    }

    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let path         = Self::object_path(bucket, key);
        let payload_hash = sha256_hex(bytes);
        let (amz_date, authorization) = self.signed_headers("PUT", &path, &payload_hash, Utc::now())?;

        let response = self
            .client
            .put(format!("{}://{}{}", self.scheme, self.host, path))
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .header("authorization", authorization)
            .body(bytes.to_vec())
            .send()
            .with_context(|| format!("PUT {bucket}/{key} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            anyhow::bail!("PUT {bucket}/{key} returned HTTP {status}: {body}");
        }

        tracing::debug!("Uploaded {} bytes to {}/{}", bytes.len(), bucket, key);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

// ─── Signature V4 helpers ─────────────────────────────────────────────────────

fn canonical_request(method: &str, path: &str, host: &str, payload_hash: &str, amz_date: &str) -> String {
    format!(
        "{method}\n{path}\n\nhost:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{payload_hash}"
    )
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date    = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region  = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("Invalid HMAC key: {e}"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex(&Sha256::digest(data))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Percent-encode everything except RFC 3986 unreserved characters
fn uri_encode(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}
