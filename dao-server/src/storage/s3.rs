//! S3-compatible blob store
//!
//! Hand-rolled SigV4 over reqwest, path-style addressing. Works
//! against MinIO-style endpoints which accept any region; we sign
//! with a fixed one.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::utils::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const REGION: &str = "us-east-1";
const SERVICE: &str = "s3";

#[derive(Clone)]
pub struct S3Store {
    http: Client,
    endpoint: String,
    bucket: String,
    access_key: String,
    secret_key: String,
}

impl S3Store {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
    ) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::internal(format!("build blob client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    fn host(&self) -> String {
        self.endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string()
    }

    pub async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let url = self.object_url(key);
        let payload_hash = hex::encode(Sha256::digest(&bytes));
        let (date, auth) = self.sign("PUT", key, &payload_hash)?;
        let resp = self
            .http
            .put(&url)
            .header("Host", self.host())
            .header("x-amz-date", &date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", auth)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("blob put: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "blob put returned {}",
                resp.status()
            )));
        }
        Ok(url)
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let url = self.object_url(key);
        let payload_hash = hex::encode(Sha256::digest(b""));
        let (date, auth) = self.sign("DELETE", key, &payload_hash)?;
        let resp = self
            .http
            .delete(&url)
            .header("Host", self.host())
            .header("x-amz-date", &date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", auth)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("blob delete: {e}")))?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::upstream(format!(
                "blob delete returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    pub fn key_of_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/{}/", self.endpoint, self.bucket);
        url.strip_prefix(&prefix)
            .map(str::to_string)
            .filter(|k| !k.is_empty())
    }

    /// SigV4 signature for a request carrying the standard amz headers
    fn sign(&self, method: &str, key: &str, payload_hash: &str) -> AppResult<(String, String)> {
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let host = self.host();

        let canonical_uri = format!("/{}/{}", self.bucket, key);
        let canonical_headers = format!(
            "host:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n"
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "{method}\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );

        let scope = format!("{date_stamp}/{REGION}/{SERVICE}/aws4_request");
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let k_date = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), &date_stamp)?;
        let k_region = hmac_sha256(&k_date, REGION)?;
        let k_service = hmac_sha256(&k_region, SERVICE)?;
        let k_signing = hmac_sha256(&k_service, "aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, &string_to_sign)?);

        let auth = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key
        );
        Ok((amz_date, auth))
    }
}

fn hmac_sha256(key: &[u8], data: &str) -> AppResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::internal(format!("hmac key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_mapping() {
        let store = S3Store::new("http://minio:9000", "dao", "ak", "sk").unwrap();
        assert_eq!(store.object_url("ab/x.png"), "http://minio:9000/dao/ab/x.png");
        assert_eq!(
            store.key_of_url("http://minio:9000/dao/ab/x.png").as_deref(),
            Some("ab/x.png")
        );
        assert!(store.key_of_url("http://other/dao/ab/x.png").is_none());
    }

    #[test]
    fn signature_shape() {
        let store = S3Store::new("http://minio:9000", "dao", "AKID", "secret").unwrap();
        let (date, auth) = store.sign("PUT", "ab/x.png", "deadbeef").unwrap();
        assert_eq!(date.len(), 16);
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
    }
}
