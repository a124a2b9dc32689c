/// PKCE (Proof Key for Code Exchange) artifact derivation
/// RFC 7636: https://tools.ietf.org/html/rfc7636
use crate::error::{PkceError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Unreserved characters allowed in a code verifier (RFC 7636 section 4.1)
pub const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Minimum code verifier length per RFC 7636
pub const MIN_VERIFIER_LEN: usize = 43;

/// Maximum code verifier length per RFC 7636
pub const MAX_VERIFIER_LEN: usize = 128;

/// Default verifier length used by [`PkceMaterial::generate`]
pub const DEFAULT_VERIFIER_LEN: usize = 64;

/// Injected crypto capabilities for verifier generation and challenge
/// derivation.
///
/// The derivation core depends only on "secure random bytes" and a
/// "SHA-256 digest", so tests can substitute a deterministic provider.
pub trait CryptoProvider {
    /// Fill `buf` with cryptographically secure random bytes.
    ///
    /// Implementations must fail rather than fall back to a
    /// non-cryptographic source.
    fn random_bytes(&self, buf: &mut [u8]) -> Result<()>;

    /// Compute the SHA-256 digest of `data`.
    fn sha256(&self, data: &[u8]) -> [u8; 32];
}

/// OS-backed provider: `OsRng` for entropy, `sha2` for digests
#[derive(Debug, Default, Clone, Copy)]
pub struct OsCrypto;

impl CryptoProvider for OsCrypto {
    fn random_bytes(&self, buf: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| PkceError::RandomSourceUnavailable(e.to_string()))
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }
}

/// Generate a code verifier of `length` characters using the OS random
/// source.
///
/// `length` must be within the RFC 7636 bounds of 43..=128; out-of-range
/// values are rejected with `InvalidInput` rather than clamped.
pub fn generate_verifier(length: usize) -> Result<String> {
    generate_verifier_with(&OsCrypto, length)
}

/// Generate a code verifier with an injected crypto provider.
pub fn generate_verifier_with(crypto: &dyn CryptoProvider, length: usize) -> Result<String> {
    generate_from_charset(crypto, length, VERIFIER_CHARSET)
}

/// Generate a random string of `length` characters drawn from `charset`.
///
/// Each random byte is mapped via `byte % charset.len()`. When the charset
/// size does not evenly divide 256 (the 66-symbol verifier charset does
/// not), the mapping carries a slight statistical skew toward the front of
/// the charset. Accepted: verifier length leaves a large entropy margin,
/// so the skew is not security-relevant.
pub fn generate_from_charset(
    crypto: &dyn CryptoProvider,
    length: usize,
    charset: &[u8],
) -> Result<String> {
    if charset.is_empty() {
        return Err(PkceError::InvalidInput("charset must not be empty".into()));
    }
    if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&length) {
        return Err(PkceError::InvalidInput(format!(
            "verifier length must be {}..={}, got {}",
            MIN_VERIFIER_LEN, MAX_VERIFIER_LEN, length
        )));
    }

    let mut bytes = vec![0u8; length];
    crypto.random_bytes(&mut bytes)?;

    Ok(bytes
        .iter()
        .map(|b| charset[*b as usize % charset.len()] as char)
        .collect())
}

/// Derive the code challenge for `verifier` using the S256 method.
///
/// `challenge = base64url(SHA-256(verifier))` with padding stripped; the
/// output is always 43 characters. Deterministic and pure: the same
/// verifier always yields the same challenge. The transform is one-way by
/// construction; no inverse operation exists in this crate.
///
/// # Examples
///
/// ```
/// use proofkey::pkce::derive_challenge;
///
/// // RFC 7636 Appendix B example pair
/// let challenge = derive_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk").unwrap();
/// assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
/// ```
pub fn derive_challenge(verifier: &str) -> Result<String> {
    derive_challenge_with(&OsCrypto, verifier)
}

/// Derive the code challenge with an injected crypto provider.
pub fn derive_challenge_with(crypto: &dyn CryptoProvider, verifier: &str) -> Result<String> {
    validate_verifier(verifier)?;
    let digest = crypto.sha256(verifier.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(digest))
}

/// Check that `verifier` satisfies the RFC 7636 length and charset rules.
pub fn validate_verifier(verifier: &str) -> Result<()> {
    if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&verifier.len()) {
        return Err(PkceError::InvalidInput(format!(
            "verifier length must be {}..={}, got {}",
            MIN_VERIFIER_LEN,
            MAX_VERIFIER_LEN,
            verifier.len()
        )));
    }
    if !verifier.bytes().all(|b| VERIFIER_CHARSET.contains(&b)) {
        return Err(PkceError::InvalidInput(
            "verifier contains characters outside the unreserved set".into(),
        ));
    }
    Ok(())
}

/// Generate a random `state` parameter (16 bytes, base64url, 22 chars).
///
/// Binds the authorization request to the redirect response; also used as
/// the flow-store key for the verifier handoff.
pub fn generate_state() -> Result<String> {
    generate_state_with(&OsCrypto)
}

/// Generate a `state` parameter with an injected crypto provider.
pub fn generate_state_with(crypto: &dyn CryptoProvider) -> Result<String> {
    let mut bytes = [0u8; 16];
    crypto.random_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// PKCE artifact pair containing code verifier and code challenge
#[derive(Debug, Clone)]
pub struct PkceMaterial {
    code_verifier: String,
    code_challenge: String,
}

impl PkceMaterial {
    /// Generate a new PKCE artifact pair with the default verifier length.
    ///
    /// # Examples
    ///
    /// ```
    /// use proofkey::pkce::PkceMaterial;
    ///
    /// let material = PkceMaterial::generate().unwrap();
    /// assert_eq!(material.code_challenge().len(), 43);
    /// assert_eq!(PkceMaterial::code_challenge_method(), "S256");
    /// ```
    pub fn generate() -> Result<Self> {
        Self::with_length(DEFAULT_VERIFIER_LEN)
    }

    /// Generate a pair with a specific verifier length (43..=128).
    pub fn with_length(length: usize) -> Result<Self> {
        Self::generate_with(&OsCrypto, length)
    }

    /// Generate a pair with an injected crypto provider.
    pub fn generate_with(crypto: &dyn CryptoProvider, length: usize) -> Result<Self> {
        let code_verifier = generate_verifier_with(crypto, length)?;
        let code_challenge = derive_challenge_with(crypto, &code_verifier)?;
        Ok(Self {
            code_verifier,
            code_challenge,
        })
    }

    /// Get the code verifier
    pub fn code_verifier(&self) -> &str {
        &self.code_verifier
    }

    /// Get the code challenge
    pub fn code_challenge(&self) -> &str {
        &self.code_challenge
    }

    /// Get the code challenge method (always S256)
    pub fn code_challenge_method() -> &'static str {
        "S256"
    }
}
