use std::sync::Arc;

use actix_web::HttpServer;
use anyhow::Context;

use common::{
    auth_session::JwtSessionManager,
    context::ServiceState,
    entities::complaint::Complaint,
    repository::mongo_repository::MongoRepository,
    verification::verify,
};
use complaints::{
    config::Config,
    create_app,
    migrations::{up_migrations, COMPLAINTS},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;

    up_migrations(&config.mongo_uri, &config.database)
        .await
        .context("Migration error")?;

    verify::<Complaint>(&config.mongo_uri, &config.database, COMPLAINTS, true)
        .await
        .context("Complaints collection verification fail")?;

    let complaint_repo: MongoRepository<Complaint> =
        MongoRepository::new(&config.mongo_uri, &config.database, COMPLAINTS).await?;

    let mut state = ServiceState::new(JwtSessionManager::new(&config.jwt_secret));
    state.insert::<Complaint>(Arc::new(complaint_repo));
    state.insert_manual(config.lifecycle.clone());
    let state = Arc::new(state);

    log::info!(
        "Listening on port {} (proximity threshold {} km, {:?} transitions)",
        config.port,
        config.lifecycle.threshold_km,
        config.lifecycle.transitions
    );

    HttpServer::new(move || create_app(state.clone()))
        .bind(("0.0.0.0", config.port))?
        .run()
        .await?;
    Ok(())
}
