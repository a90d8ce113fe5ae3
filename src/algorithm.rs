use std::fmt::Debug;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::BytesMut;
use ring::{rand::SecureRandom, signature::RsaKeyPair};

use crate::signature::{KeyDecodingError, SignError};

/// The signature algorithm used to sign the canonical request string. The algorithm
/// determines the hashing and signing steps; the canonicalization is the same for every
/// algorithm and is therefore not part of this trait.
pub trait SignatureAlgorithm {
    /// A short human readable name, used in log output.
    fn name(&self) -> &str;

    /// Digitally sign a block of data, appending the raw signature bytes to `output`.
    /// On failure nothing is appended.
    fn sign(&self, data: &[u8], output: &mut BytesMut) -> Result<(), SignError>;
}

/// RSA PKCS#1 v1.5 signatures over a SHA-256 digest.
pub struct RsaSha256<Rand> {
    key: RsaKeyPair,
    random: Rand,
}

impl<Rand> RsaSha256<Rand> {
    pub fn new(key: RsaKeyPair, random: Rand) -> Self {
        Self { key, random }
    }

    /// Parse an RSA private key from its PKCS#8 DER encoding.
    pub fn from_pkcs8(der: &[u8], random: Rand) -> Result<Self, SignError> {
        let key = RsaKeyPair::from_pkcs8(der)
            .map_err(|err| SignError::KeyDecoding(KeyDecodingError::Pkcs8(err)))?;
        Ok(Self::new(key, random))
    }

    /// Parse an RSA private key from the base64 text of its PKCS#8 DER encoding, the form
    /// in which the API provider hands out keys. Whitespace anywhere in the text is
    /// ignored so keys wrapped over several lines are accepted.
    pub fn from_base64_pkcs8(encoded: &str, random: Rand) -> Result<Self, SignError> {
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let der = STANDARD
            .decode(compact.as_bytes())
            .map_err(|err| SignError::KeyDecoding(KeyDecodingError::Base64(err)))?;
        Self::from_pkcs8(&der, random)
    }

    /// The key pair used for signing.
    pub fn key_pair(&self) -> &RsaKeyPair {
        &self.key
    }
}

impl<Rand: SecureRandom> SignatureAlgorithm for RsaSha256<Rand> {
    fn name(&self) -> &str {
        "rsa-sha256"
    }

    fn sign(&self, data: &[u8], output: &mut BytesMut) -> Result<(), SignError> {
        let start = output.len();
        output.resize(start + self.key.public().modulus_len(), 0);
        let result = self.key.sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &self.random,
            data,
            &mut output[start..],
        );
        if let Err(err) = result {
            output.truncate(start);
            return Err(SignError::Signing(err));
        }
        Ok(())
    }
}

impl<Rand> Debug for RsaSha256<Rand> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSha256")
            .field("modulus_len", &self.key.public().modulus_len())
            .finish()
    }
}
