//! Signed retrieval links.

use crate::error::{Result, ToolError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use sha2::{Digest, Sha256};

/// Characters escaped inside one key segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'[')
    .add(b']');

/// Issues and verifies links of the form
/// `{base}/{key}?expires={unix}&signature={digest}`.
#[derive(Clone)]
pub struct LinkSigner {
    base: String,
    secret: Vec<u8>,
}

impl std::fmt::Debug for LinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSigner").field("base", &self.base).finish_non_exhaustive()
    }
}

impl LinkSigner {
    pub fn new(public_base_url: &str, secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(ToolError::Configuration(
                "artifact signing key is empty; set ATELIER_SIGNING_KEY or storage.signing_key"
                    .to_string(),
            ));
        }
        url::Url::parse(public_base_url).map_err(|e| {
            ToolError::Configuration(format!(
                "invalid storage.public_base_url '{}': {}",
                public_base_url, e
            ))
        })?;

        Ok(Self {
            base: public_base_url.trim_end_matches('/').to_string(),
            secret: secret.as_bytes().to_vec(),
        })
    }

    /// Issue a link for `key`, valid until `expires_at`.
    pub fn sign(&self, key: &str, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.timestamp();
        let path = key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");

        format!(
            "{}/{}?expires={}&signature={}",
            self.base,
            path,
            expires,
            self.signature(key, expires)
        )
    }

    /// Check a link and return the key it grants access to.
    pub fn verify(&self, link: &str, now: DateTime<Utc>) -> Result<String> {
        let rest = link
            .strip_prefix(&self.base)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| ToolError::Storage("link was not issued by this store".to_string()))?;

        let (path, query) = rest
            .split_once('?')
            .ok_or_else(|| ToolError::Storage("link is not signed".to_string()))?;

        let key = percent_decode_str(path)
            .decode_utf8()
            .map_err(|e| ToolError::Storage(format!("malformed link path: {}", e)))?
            .into_owned();

        let mut expires = None;
        let mut signature = None;
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "expires" => expires = value.parse::<i64>().ok(),
                "signature" => signature = Some(value.into_owned()),
                _ => {}
            }
        }

        let (expires, signature) = expires
            .zip(signature)
            .ok_or_else(|| ToolError::Storage("link is not signed".to_string()))?;

        if !constant_time_eq(&self.signature(&key, expires), &signature) {
            return Err(ToolError::Storage("link signature mismatch".to_string()));
        }

        if now.timestamp() >= expires {
            let at = Utc
                .timestamp_opt(expires, 0)
                .single()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| expires.to_string());
            return Err(ToolError::Storage(format!("link expired at {}", at)));
        }

        Ok(key)
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let inner = Sha256::new()
            .chain_update(&self.secret)
            .chain_update(key.as_bytes())
            .chain_update(b"\n")
            .chain_update(expires.to_string().as_bytes())
            .finalize();
        let outer = Sha256::new()
            .chain_update(&self.secret)
            .chain_update(inner)
            .finalize();
        URL_SAFE_NO_PAD.encode(outer)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
