//! Token format of the signed-upload handshake.
//!
//! ```text
//! token = base64( iv[16] || AES-256-CFB(key, iv, percent_encode(plaintext)) )
//! key   = SHA-256(shared secret)
//! ```
//!
//! This is a fixed upstream protocol, reproduced bit for bit. It is not a
//! confidentiality mechanism: the secret ships with every browser client.

use aes::Aes256;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::UploadError;

type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

const IV_SIZE: usize = 16;

/// Characters left unescaped by a browser's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone)]
pub struct HandshakeCipher {
    key: [u8; 32],
}

impl HandshakeCipher {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn seal(&self, plaintext: &str) -> Result<String, UploadError> {
        let mut iv = [0u8; IV_SIZE];
        rand::rng().fill_bytes(&mut iv);

        let mut buf = utf8_percent_encode(plaintext, URI_COMPONENT)
            .to_string()
            .into_bytes();
        Aes256CfbEnc::new_from_slices(&self.key, &iv)
            .map_err(|e| UploadError::Cipher(format!("cipher init: {e}")))?
            .encrypt(&mut buf);

        let mut token = Vec::with_capacity(IV_SIZE + buf.len());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&buf);
        Ok(STANDARD.encode(token))
    }

    /// Reverse of [`seal`](Self::seal).
    pub fn open(&self, token: &str) -> Result<String, UploadError> {
        let raw = STANDARD
            .decode(token.trim())
            .map_err(|e| UploadError::Cipher(format!("token is not base64: {e}")))?;
        if raw.len() <= IV_SIZE {
            return Err(UploadError::Cipher(format!(
                "token too short ({} bytes)",
                raw.len()
            )));
        }

        let (iv, ciphertext) = raw.split_at(IV_SIZE);
        let mut buf = ciphertext.to_vec();
        Aes256CfbDec::new_from_slices(&self.key, iv)
            .map_err(|e| UploadError::Cipher(format!("cipher init: {e}")))?
            .decrypt(&mut buf);

        let encoded = String::from_utf8(buf)
            .map_err(|_| UploadError::Cipher("decrypted token is not UTF-8".into()))?;
        percent_decode_str(&encoded)
            .decode_utf8()
            .map(|s| s.into_owned())
            .map_err(|_| {
                UploadError::Cipher("decrypted token is not valid percent-encoding".into())
            })
    }
}
