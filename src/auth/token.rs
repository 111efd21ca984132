//! Creation, verification and extraction of bearer tokens.

use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{AppState, Error, user::UserID};

/// How long a bearer token stays valid after it is issued.
const TOKEN_DURATION: Duration = Duration::hours(12);

/// The state needed to verify bearer tokens.
#[derive(Clone)]
pub struct AuthState {
    /// The key used to verify token signatures.
    pub decoding_key: DecodingKey,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            decoding_key: state.decoding_key.clone(),
        }
    }
}

/// The contents of a bearer token.
///
/// Using `Claims` as a handler argument makes the route require a valid
/// `Authorization: Bearer` header; requests without one are rejected before
/// the handler body runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The expiry time of the token as a unix timestamp.
    pub exp: usize,
    /// The time the token was issued as a unix timestamp.
    pub iat: usize,
    /// The ID of the user the token was issued to.
    pub user_id: UserID,
    /// The email of the user the token was issued to.
    pub email: String,
}

impl<S> FromRequestParts<S> for Claims
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::InvalidToken)?;

        let auth_state = AuthState::from_ref(state);

        let token_data = decode_jwt(bearer.token(), &auth_state.decoding_key)?;

        Ok(token_data.claims)
    }
}

/// The response body for a successful log in or registration.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The signed bearer token.
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
}

impl TokenResponse {
    /// Wrap a signed token in the standard response body.
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_owned(),
        }
    }
}

/// Sign a new bearer token for the user.
pub(crate) fn encode_jwt(
    user_id: UserID,
    email: &str,
    encoding_key: &EncodingKey,
) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        exp: (now + TOKEN_DURATION).unix_timestamp() as usize,
        iat: now.unix_timestamp() as usize,
        user_id,
        email: email.to_owned(),
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|error| {
        tracing::error!("could not sign token: {error}");
        Error::TokenCreation
    })
}

fn decode_jwt(token: &str, decoding_key: &DecodingKey) -> Result<TokenData<Claims>, Error> {
    decode(token, decoding_key, &Validation::default()).map_err(|_| Error::InvalidToken)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{DecodingKey, EncodingKey};

    use crate::{Error, user::UserID};

    use super::{decode_jwt, encode_jwt};

    #[test]
    fn encode_then_decode_gives_back_the_claims() {
        let encoding_key = EncodingKey::from_secret(b"foobar");
        let decoding_key = DecodingKey::from_secret(b"foobar");

        let token = encode_jwt(UserID::new(42), "foo@bar.baz", &encoding_key).unwrap();
        let claims = decode_jwt(&token, &decoding_key).unwrap().claims;

        assert_eq!(claims.user_id, UserID::new(42));
        assert_eq!(claims.email, "foo@bar.baz");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn decode_rejects_tokens_signed_with_another_key() {
        let encoding_key = EncodingKey::from_secret(b"foobar");
        let wrong_decoding_key = DecodingKey::from_secret(b"not-foobar");

        let token = encode_jwt(UserID::new(42), "foo@bar.baz", &encoding_key).unwrap();
        let result = decode_jwt(&token, &wrong_decoding_key);

        assert!(matches!(result, Err(Error::InvalidToken)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let decoding_key = DecodingKey::from_secret(b"foobar");

        let result = decode_jwt("not.a.token", &decoding_key);

        assert!(matches!(result, Err(Error::InvalidToken)));
    }
}
