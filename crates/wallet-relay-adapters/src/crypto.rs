use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use alloy::hex;
use hkdf::Hkdf;
use k256::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use wallet_relay_core::PortError;

pub const ENVELOPE_VERSION: &str = "secp256k1-hkdf-sha256-aes256gcm";
const KEY_INFO: &[u8] = b"wallet_relay_ecies_v1";

/// Encrypted payload addressed to one secp256k1 public key. Byte fields are
/// `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    pub version: String,
    pub nonce: String,
    pub ephem_public_key: String,
    pub ciphertext: String,
}

impl EncryptedEnvelope {
    /// Accepts the envelope as JSON or as `0x` hex of the JSON text.
    pub fn parse(raw: &str) -> Result<Self, PortError> {
        let raw = raw.trim();
        let json = if raw.starts_with('{') {
            raw.as_bytes().to_vec()
        } else {
            hex::decode(raw)
                .map_err(|e| PortError::Validation(format!("ciphertext is not hex: {e}")))?
        };
        serde_json::from_slice(&json)
            .map_err(|e| PortError::Validation(format!("invalid encrypted envelope: {e}")))
    }
}

pub fn generate_nonce() -> Result<[u8; 12], PortError> {
    let mut nonce = [0u8; 12];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| PortError::Transport(format!("nonce generation failed: {e}")))?;
    Ok(nonce)
}

pub fn generate_secret_key() -> Result<SecretKey, PortError> {
    let mut bytes = Zeroizing::new([0u8; 32]);
    getrandom::getrandom(&mut bytes[..])
        .map_err(|e| PortError::Transport(format!("key generation failed: {e}")))?;
    SecretKey::from_slice(&bytes[..])
        .map_err(|e| PortError::Transport(format!("key generation failed: {e}")))
}

pub fn public_key_hex(public_key: &PublicKey) -> String {
    hex::encode_prefixed(public_key.to_encoded_point(false).as_bytes())
}

pub fn encrypt_for_public_key(
    recipient: &PublicKey,
    plaintext: &[u8],
) -> Result<EncryptedEnvelope, PortError> {
    let ephemeral = generate_secret_key()?;
    let enc_key = derive_key(&ephemeral, recipient)?;
    let nonce = generate_nonce()?;
    let ciphertext = encrypt_aes_gcm(&enc_key, nonce, plaintext)?;
    Ok(EncryptedEnvelope {
        version: ENVELOPE_VERSION.to_owned(),
        nonce: hex::encode_prefixed(nonce),
        ephem_public_key: public_key_hex(&ephemeral.public_key()),
        ciphertext: hex::encode_prefixed(ciphertext),
    })
}

pub fn decrypt_envelope(
    secret: &SecretKey,
    envelope: &EncryptedEnvelope,
) -> Result<Vec<u8>, PortError> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(PortError::Validation(format!(
            "unsupported envelope version {}",
            envelope.version
        )));
    }
    let ephem_bytes = decode_field("ephemPublicKey", &envelope.ephem_public_key)?;
    let ephem = PublicKey::from_sec1_bytes(&ephem_bytes)
        .map_err(|e| PortError::Validation(format!("invalid ephemeral public key: {e}")))?;
    let nonce: [u8; 12] = decode_field("nonce", &envelope.nonce)?
        .try_into()
        .map_err(|_| PortError::Validation("nonce must be 12 bytes".to_owned()))?;
    let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;
    let enc_key = derive_key(secret, &ephem)?;
    decrypt_aes_gcm(&enc_key, nonce, &ciphertext)
}

fn derive_key(secret: &SecretKey, peer: &PublicKey) -> Result<Zeroizing<[u8; 32]>, PortError> {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let hk = Hkdf::<Sha256>::new(None, shared.raw_secret_bytes().as_slice());
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(KEY_INFO, &mut key[..])
        .map_err(|_| PortError::Validation("hkdf expand failed".to_owned()))?;
    Ok(key)
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, PortError> {
    hex::decode(value).map_err(|e| PortError::Validation(format!("invalid {name} hex: {e}")))
}

fn encrypt_aes_gcm(
    enc_key: &[u8; 32],
    nonce: [u8; 12],
    plaintext: &[u8],
) -> Result<Vec<u8>, PortError> {
    let cipher = Aes256Gcm::new_from_slice(enc_key)
        .map_err(|e| PortError::Validation(format!("aes-gcm init failed: {e}")))?;
    let nonce = Nonce::<aes_gcm::aead::consts::U12>::from(nonce);
    cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| PortError::Transport(format!("aes-gcm encrypt failed: {e}")))
}

fn decrypt_aes_gcm(
    enc_key: &[u8; 32],
    nonce: [u8; 12],
    ciphertext: &[u8],
) -> Result<Vec<u8>, PortError> {
    let cipher = Aes256Gcm::new_from_slice(enc_key)
        .map_err(|e| PortError::Validation(format!("aes-gcm init failed: {e}")))?;
    let nonce = Nonce::<aes_gcm::aead::consts::U12>::from(nonce);
    cipher
        .decrypt(&nonce, ciphertext)
        .map_err(|e| PortError::Validation(format!("aes-gcm decrypt failed: {e}")))
}
