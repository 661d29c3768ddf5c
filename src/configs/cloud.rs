//! Encrypted remote configuration.
//!
//! The document is two non-empty lines: base64 IV, then base64 AES-256-CBC
//! ciphertext of a JSON object. The key is hex, read from `SECURITY_AGENT_AES_PASSWORD`.

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose};
use cbc::Decryptor;
use cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use serde_json::{Value, json};
use std::env;

use crate::core::error::AgentError;

pub const KEY_ENV: &str = "SECURITY_AGENT_AES_PASSWORD";

/// Decrypts a downloaded document with a hex key.
pub fn decrypt_document(content: &str, key_hex: &str) -> Result<Value, AgentError> {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    let (iv_b64, ct_b64) = match (lines.next(), lines.next()) {
        (Some(iv), Some(ct)) => (iv, ct),
        _ => return Err(AgentError::ConfigError("Invalid remote config format: expected IV and ciphertext".into())),
    };

    let iv = general_purpose::STANDARD
        .decode(iv_b64)
        .map_err(|_| AgentError::ConfigError("Invalid IV encoding".into()))?;
    let mut buf = general_purpose::STANDARD
        .decode(ct_b64)
        .map_err(|_| AgentError::ConfigError("Invalid ciphertext encoding".into()))?;
    let key = hex::decode(key_hex.trim()).map_err(|_| AgentError::ConfigError("Invalid key hex".into()))?;

    let decryptor = Decryptor::<Aes256>::new_from_slices(&key, &iv)
        .map_err(|_| AgentError::ConfigError("Key must be 32 bytes and IV 16 bytes".into()))?;
    let plain = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| AgentError::ConfigError(format!("Decryption failed: {:?}", e)))?;

    serde_json::from_slice(plain).map_err(|e| AgentError::ConfigError(format!("Decrypted config is not JSON: {}", e)))
}

/// `commonAll` overlaid with the section named after `profile`.
pub fn select_profile(document: &Value, profile: &str) -> Value {
    let mut merged = document.get("commonAll").cloned().unwrap_or(json!({}));
    if let (Some(base), Some(specific)) = (merged.as_object_mut(), document.get(profile).and_then(Value::as_object)) {
        for (k, v) in specific {
            base.insert(k.clone(), v.clone());
        }
    }
    merged
}

/// Downloads and decrypts the remote document.
pub async fn load_remote_json(url: &str) -> Result<Value, AgentError> {
    let key = env::var(KEY_ENV).map_err(|_| AgentError::ConfigError(format!("Missing {}", KEY_ENV)))?;

    let response = reqwest::get(url)
        .await
        .map_err(|e| AgentError::HttpError(format!("Remote config download failed: {}", e)))?;
    if !response.status().is_success() {
        return Err(AgentError::HttpError(format!("Remote config returned status {}", response.status().as_u16())));
    }
    let content = response
        .text()
        .await
        .map_err(|e| AgentError::HttpError(format!("Remote config read failed: {}", e)))?;

    decrypt_document(&content, &key)
}
