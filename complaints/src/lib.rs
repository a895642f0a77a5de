pub mod config;
pub mod error;
pub mod handlers;
pub mod migrations;
pub mod service;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::ServiceFactory;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::middleware;
use actix_web::web;
use actix_web::App;
use common::auth_session::TestSessionManager;
use common::context::ServiceState;
use common::entities::complaint::Complaint;
use common::repository::test_repository::TestRepository;

use error::Error;
pub use handlers::complaint::*;
use handlers::openapi_json;
use service::lifecycle::LifecycleSettings;

/// Room for a base64 encoded photo plus the rest of the request.
const JSON_LIMIT: usize = 10 * 1024 * 1024;

pub fn create_app(
    state: Arc<ServiceState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let cors = Cors::permissive();
    App::new()
        .wrap(cors)
        .wrap(middleware::Logger::default())
        .app_data(web::Data::new(state))
        .app_data(
            web::JsonConfig::default()
                .limit(JSON_LIMIT)
                .error_handler(|err, _| Error::from(err).into()),
        )
        .service(get_complaints)
        .service(get_summary)
        .service(get_my_complaints)
        .service(get_complaint)
        .service(post_complaint)
        .service(put_complaint_status)
        .service(patch_complaint)
        .service(openapi_json)
}

pub fn create_test_app(
    sessions: TestSessionManager,
    settings: LifecycleSettings,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let mut state = ServiceState::new(sessions);
    state.insert::<Complaint>(Arc::new(TestRepository::<Complaint>::new()));
    state.insert_manual(settings);

    create_app(Arc::new(state))
}
