use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use std::{path::Path, time::{SystemTime, UNIX_EPOCH}};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read JWT secret file: {0}")]
    Io(#[from] std::io::Error),
    #[error("JWT secret is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("JWT secret must be 32 bytes, got {0}")]
    WrongLength(usize),
    #[error("could not encode JWT: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

const SECRET_LEN: usize = 32;

#[derive(Serialize)]
struct Claims {
    iat: u64,
}

/// Mints fresh `engine_api` bearer tokens from a 32-byte HS256 secret, loaded once at startup.
/// A bad secret file is a configuration error and fails fast rather than surfacing later as a
/// mysterious 401 from the execution client.
pub struct JwtSecret {
    key: EncodingKey,
}

impl JwtSecret {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let trimmed = contents.trim().trim_start_matches("0x");
        let bytes = hex::decode(trimmed)?;
        if bytes.len() != SECRET_LEN {
            return Err(Error::WrongLength(bytes.len()))
        }
        Ok(Self { key: EncodingKey::from_secret(&bytes) })
    }

    /// Produce a bearer token with a fresh `iat` claim, valid for a short window around "now"
    /// per the Engine API authentication spec.
    pub fn bearer_token(&self) -> Result<String, Error> {
        let iat = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let token = encode(&Header::default(), &Claims { iat }, &self.key)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_secret(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("builder-engine-jwt-test-{}.hex", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_rejects_wrong_length_secret() {
        let path = write_secret("deadbeef");
        let err = JwtSecret::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::WrongLength(4)));
    }

    #[test]
    fn test_accepts_32_byte_hex_secret_with_0x_prefix() {
        let secret = "0x".to_string() + &"ab".repeat(32);
        let path = write_secret(&secret);
        let secret = JwtSecret::from_file(&path).unwrap();
        assert!(secret.bearer_token().is_ok());
    }
}
