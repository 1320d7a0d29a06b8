//! Access token issue and verification (HS256).

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shop_core::{AccountKind, ShopError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: i64,
    pub kind: AccountKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expire_secs: i64,
}

impl JwtService {
    pub fn new(secret: &str, expire_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            expire_secs,
        }
    }

    pub fn expire_secs(&self) -> i64 {
        self.expire_secs
    }

    pub fn issue(&self, kind: AccountKind, account_id: i64) -> Result<String, ShopError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: account_id,
            kind,
            iat: now,
            exp: now + self.expire_secs,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ShopError::Internal(format!("jwt encode: {e}")))
    }

    /// Invalid, expired and tampered tokens are all Unauthorized.
    pub fn verify(&self, token: &str) -> Result<Claims, ShopError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ShopError::Unauthorized(format!("invalid token: {e}")))
    }
}
