use base64::{Engine, engine::general_purpose::URL_SAFE};
use fernet::Fernet;

use crate::error::IdentityError;

/// Encrypts user identifiers for storage in a client-side cookie.
///
/// The cookie value is the Fernet token wrapped once more in URL-safe base64.
pub struct IdentityCipher {
    fernet: Fernet,
}

impl std::fmt::Debug for IdentityCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCipher").finish_non_exhaustive()
    }
}

impl IdentityCipher {
    pub fn new(key: &str) -> Result<Self, IdentityError> {
        let fernet = Fernet::new(key.trim()).ok_or(IdentityError::InvalidKey)?;
        Ok(Self { fernet })
    }

    /// Fresh random key in Fernet's URL-safe base64 form.
    pub fn generate_key() -> String {
        Fernet::generate_key()
    }

    pub fn encrypt(&self, user_id: &str) -> String {
        let token = self.fernet.encrypt(user_id.as_bytes());
        URL_SAFE.encode(token.as_bytes())
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String, IdentityError> {
        let token = URL_SAFE.decode(encrypted.trim())?;
        let token = String::from_utf8(token)?;
        let plain = self.fernet.decrypt(&token).map_err(|_| IdentityError::Decryption)?;
        Ok(String::from_utf8(plain)?)
    }
}
