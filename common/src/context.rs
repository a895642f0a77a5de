use std::sync::Arc;

use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use anyhow::anyhow;
use type_map::concurrent::TypeMap;

use crate::{
    auth::Auth,
    auth_session::{jwt_from_header, SessionManager},
    entities::actor::Actor,
    error::{self, AddCode, ServiceError},
    repository::RepositoryObject,
};

/// Process-wide state shared by all request handlers.
pub struct ServiceState {
    pub repositories: TypeMap,
    pub sessions: Box<dyn SessionManager>,
}

impl ServiceState {
    pub fn new(sessions: impl SessionManager + 'static) -> Self {
        Self {
            repositories: TypeMap::new(),
            sessions: Box::new(sessions),
        }
    }

    pub fn insert<T: 'static>(&mut self, repository: RepositoryObject<T>) {
        self.repositories.insert(repository);
    }

    pub fn insert_manual<T: Send + Sync + 'static>(&mut self, value: T) {
        self.repositories.insert(value);
    }
}

#[derive(Clone)]
pub struct HandlerContext {
    pub user_auth: Auth,
}

/// Per-request view: shared state plus the caller's identity.
#[derive(Clone)]
pub struct Context(pub Arc<ServiceState>, pub HandlerContext);

impl FromRequest for Context {
    type Error = ServiceError;

    type Future = futures_util::future::LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        fn from_request_inner(req: &HttpRequest, _payload: &mut Payload) -> error::Result<Context> {
            let Some(state) = req.app_data::<Data<Arc<ServiceState>>>() else {
                return Err(anyhow!("No state provided".to_string()).into());
            };

            let user_auth = state.sessions.authenticate(jwt_from_header(req));

            Ok(Context(Arc::clone(state), HandlerContext { user_auth }))
        }
        let result = from_request_inner(req, payload);

        Box::pin(async move { result })
    }
}

impl Context {
    pub fn new(state: Arc<ServiceState>, user_auth: Auth) -> Self {
        Self(state, HandlerContext { user_auth })
    }

    pub fn auth(&self) -> &Auth {
        &self.1.user_auth
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.1.user_auth.actor()
    }

    pub fn try_get_repository<T: 'static>(&self) -> error::Result<RepositoryObject<T>> {
        self.0
            .repositories
            .get::<RepositoryObject<T>>()
            .cloned()
            .ok_or(
                anyhow!(
                    "Repository for type {} not found",
                    std::any::type_name::<T>()
                )
                .code(500),
            )
    }

    pub fn try_get_manual<T: Clone + 'static>(&self) -> error::Result<T> {
        self.0.repositories.get::<T>().cloned().ok_or(
            anyhow!("State for type {} not found", std::any::type_name::<T>()).code(500),
        )
    }
}
