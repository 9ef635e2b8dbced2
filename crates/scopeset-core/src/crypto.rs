//! Reversible payload encryption for properties marked encrypted.
//!
//! Encrypted properties store a string envelope
//! `"sse1:<nonce b64>:<ciphertext b64>"` instead of their plaintext JSON
//! encoding. Encryption runs outside the cast pipeline: after `set`
//! casts on save, before `get` casts on load.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chacha20poly1305::aead::{Aead, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, KeyInit, Nonce};
use serde_json::Value;

use scopeset_types::prelude::*;

/// Envelope prefix marking an encrypted payload
const ENVELOPE_PREFIX: &str = "sse1:";

/// Reversible encryption applied by the mapper to properties marked
/// encrypted. `decrypt(encrypt(v))` must reproduce `v` exactly.
pub trait Encrypter: Send + Sync {
	fn encrypt(&self, value: &Value) -> ScResult<Value>;
	fn decrypt(&self, payload: &Value) -> ScResult<Value>;
}

/// ChaCha20-Poly1305 encrypter with a process-wide 32-byte key.
#[derive(Clone)]
pub struct ChaChaEncrypter {
	key: [u8; 32],
}

impl ChaChaEncrypter {
	pub fn new(key: [u8; 32]) -> Self {
		Self { key }
	}

	/// Accepts a base64-encoded 32-byte key, the form keys usually take
	/// in process configuration.
	pub fn from_base64(encoded: &str) -> ScResult<Self> {
		let bytes = URL_SAFE_NO_PAD
			.decode(encoded.as_bytes())
			.or_else(|_| STANDARD.decode(encoded.as_bytes()))
			.map_err(|err| Error::Crypto(format!("invalid base64 key: {}", err).into()))?;

		let key: [u8; 32] =
			bytes.try_into().map_err(|_| Error::Crypto("expected a 32-byte key".into()))?;

		Ok(Self::new(key))
	}

	fn cipher(&self) -> ScResult<ChaCha20Poly1305> {
		ChaCha20Poly1305::new_from_slice(&self.key)
			.map_err(|err| Error::Crypto(format!("failed to initialize cipher: {}", err).into()))
	}
}

impl std::fmt::Debug for ChaChaEncrypter {
	// never print the key
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChaChaEncrypter").finish_non_exhaustive()
	}
}

impl Encrypter for ChaChaEncrypter {
	fn encrypt(&self, value: &Value) -> ScResult<Value> {
		let plaintext = serde_json::to_vec(value)?;
		let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
		let ciphertext = self
			.cipher()?
			.encrypt(&nonce, plaintext.as_ref())
			.map_err(|err| Error::Crypto(format!("encrypt failed: {}", err).into()))?;

		Ok(Value::String(format!(
			"{}{}:{}",
			ENVELOPE_PREFIX,
			URL_SAFE_NO_PAD.encode(nonce),
			URL_SAFE_NO_PAD.encode(ciphertext)
		)))
	}

	fn decrypt(&self, payload: &Value) -> ScResult<Value> {
		let raw = payload
			.as_str()
			.ok_or_else(|| Error::Crypto("encrypted payload is not a string".into()))?;
		let envelope = raw
			.strip_prefix(ENVELOPE_PREFIX)
			.ok_or_else(|| Error::Crypto("encrypted payload is missing its envelope prefix".into()))?;
		let (nonce_b64, ciphertext_b64) = envelope
			.split_once(':')
			.ok_or_else(|| Error::Crypto("malformed encryption envelope".into()))?;

		let nonce_bytes = URL_SAFE_NO_PAD
			.decode(nonce_b64.as_bytes())
			.map_err(|err| Error::Crypto(format!("invalid nonce encoding: {}", err).into()))?;
		if nonce_bytes.len() != 12 {
			return Err(Error::Crypto("expected a 12-byte nonce".into()));
		}
		let ciphertext = URL_SAFE_NO_PAD
			.decode(ciphertext_b64.as_bytes())
			.map_err(|err| Error::Crypto(format!("invalid ciphertext encoding: {}", err).into()))?;

		let plaintext = self
			.cipher()?
			.decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
			.map_err(|err| Error::Crypto(format!("decrypt failed: {}", err).into()))?;

		Ok(serde_json::from_slice(&plaintext)?)
	}
}

/// Whether a payload carries the encryption envelope.
pub fn is_encrypted_payload(payload: &Value) -> bool {
	payload.as_str().is_some_and(|raw| raw.starts_with(ENVELOPE_PREFIX))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn encrypter() -> ChaChaEncrypter {
		ChaChaEncrypter::new([7; 32])
	}

	#[test]
	fn test_roundtrip() {
		let value = json!({ "token": "s3cr3t", "uses": 3 });

		let encrypted = encrypter().encrypt(&value).expect("encrypt should succeed");
		assert!(is_encrypted_payload(&encrypted));
		// The stored form never equals the plaintext JSON encoding
		assert_ne!(encrypted, value);

		let decrypted = encrypter().decrypt(&encrypted).expect("decrypt should succeed");
		assert_eq!(decrypted, value);
	}

	#[test]
	fn test_nonces_differ_between_calls() {
		let value = json!("same plaintext");

		let a = encrypter().encrypt(&value).expect("encrypt should succeed");
		let b = encrypter().encrypt(&value).expect("encrypt should succeed");
		assert_ne!(a, b);
	}

	#[test]
	fn test_tampered_ciphertext_fails() {
		let encrypted = encrypter().encrypt(&json!("payload")).expect("encrypt should succeed");
		let raw = encrypted.as_str().expect("envelope is a string");

		let mut tampered = raw.to_string();
		tampered.pop();
		tampered.push(if raw.ends_with('A') { 'B' } else { 'A' });

		assert!(encrypter().decrypt(&json!(tampered)).is_err());
	}

	#[test]
	fn test_wrong_key_fails() {
		let encrypted = encrypter().encrypt(&json!("payload")).expect("encrypt should succeed");

		let other = ChaChaEncrypter::new([8; 32]);
		assert!(other.decrypt(&encrypted).is_err());
	}

	#[test]
	fn test_rejects_unenveloped_payloads() {
		assert!(encrypter().decrypt(&json!("plain string")).is_err());
		assert!(encrypter().decrypt(&json!(42)).is_err());
	}

	#[test]
	fn test_key_from_base64() {
		let encoded = URL_SAFE_NO_PAD.encode([7; 32]);
		let from_encoded = ChaChaEncrypter::from_base64(&encoded).expect("key should parse");

		let encrypted = encrypter().encrypt(&json!("payload")).expect("encrypt should succeed");
		assert_eq!(
			from_encoded.decrypt(&encrypted).expect("decrypt should succeed"),
			json!("payload")
		);

		assert!(ChaChaEncrypter::from_base64("too-short").is_err());
	}
}

// vim: ts=4
