use chrono::{Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    entities::actor::Actor,
    error::{self, AddCode},
};

pub fn token_duration() -> Duration {
    Duration::days(7)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    User(Actor),
    None,
}

impl Auth {
    pub fn actor(&self) -> Option<&Actor> {
        match self {
            Auth::User(actor) => Some(actor),
            Auth::None => None,
        }
    }
}

/// Claims issued by the account service at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: String,
    username: Option<String>,
    email: Option<String>,
    exp: i64,
}

impl Auth {
    pub fn from_token(token: &str, key: &DecodingKey) -> error::Result<Self> {
        let claims = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))
            .map_err(|err| err.code(401))?
            .claims;

        let id = claims.user_id.parse().map_err(|err| {
            anyhow::Error::from(err)
                .context("Token carries a malformed user id")
                .code(401)
        })?;

        Ok(Auth::User(Actor {
            id: Some(id),
            username: claims.username,
            email: claims.email,
        }))
    }

    pub fn to_token(&self, key: &EncodingKey) -> error::Result<String> {
        let Auth::User(actor) = self else {
            return Err(anyhow::anyhow!("Cannot create token for Auth::None").code(500));
        };
        let Some(id) = actor.id else {
            return Err(anyhow::anyhow!("Cannot create token for an actor without id").code(500));
        };

        let claims = Claims {
            user_id: id.to_hex(),
            username: actor.username.clone(),
            email: actor.email.clone(),
            exp: (Utc::now() + token_duration()).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|_| anyhow::anyhow!("Failed to encode token").code(500))
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn token_carries_actor() {
        let actor = Actor::new(ObjectId::new(), "ravi");
        let token = Auth::User(actor.clone())
            .to_token(&EncodingKey::from_secret(SECRET))
            .unwrap();

        let auth = Auth::from_token(&token, &DecodingKey::from_secret(SECRET)).unwrap();
        assert_eq!(auth.actor(), Some(&actor));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = Auth::User(Actor::new(ObjectId::new(), "ravi"))
            .to_token(&EncodingKey::from_secret(b"other"))
            .unwrap();

        let err = Auth::from_token(&token, &DecodingKey::from_secret(SECRET)).unwrap_err();
        assert_eq!(err.code, 401);
    }

    #[test]
    fn no_token_for_anonymous() {
        assert!(Auth::None.to_token(&EncodingKey::from_secret(SECRET)).is_err());
    }
}
