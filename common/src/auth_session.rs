use std::collections::HashMap;

use actix_web::HttpRequest;
use jsonwebtoken::DecodingKey;

use crate::{auth::Auth, entities::actor::Actor};

pub fn jwt_from_header(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|x| x.to_str().ok())
        .and_then(|x| x.strip_prefix("Bearer ")) // remove prefix
}

/// Resolves the bearer credential of a request into an identity.
pub trait SessionManager: Send + Sync {
    fn authenticate(&self, token: Option<&str>) -> Auth;
}

pub struct JwtSessionManager {
    key: DecodingKey,
}

impl JwtSessionManager {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl SessionManager for JwtSessionManager {
    fn authenticate(&self, token: Option<&str>) -> Auth {
        let Some(token) = token else {
            log::debug!("No authorization header provided");
            return Auth::None;
        };

        match Auth::from_token(token, &self.key) {
            Ok(auth) => auth,
            Err(err) => {
                log::warn!("Error parsing token: {}", err);
                Auth::None
            }
        }
    }
}

/// Maps fixed tokens to actors, for tests.
#[derive(Default)]
pub struct TestSessionManager(HashMap<String, Actor>);

impl TestSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.0.insert(token.into(), actor);
        self
    }
}

impl SessionManager for TestSessionManager {
    fn authenticate(&self, token: Option<&str>) -> Auth {
        token
            .and_then(|token| self.0.get(token))
            .cloned()
            .map_or(Auth::None, Auth::User)
    }
}
