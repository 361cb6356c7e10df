use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use splitledger::{auth::TokenSigner, routes, settings::Settings, store::Store};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitledger={level},actix_web={level}",
            level = settings.log.level
        ))
        .init();

    tracing::info!(database = %settings.database.name, "connecting to MongoDB");
    let store = Store::connect(&settings.database).await?;
    tracing::info!("Connected");

    let signer = TokenSigner::new(&settings.auth.secret, settings.auth.token_ttl_hours);
    let store = web::Data::new(store);
    let signer = web::Data::new(signer);

    let bind = (settings.server.bind.clone(), settings.server.port);
    tracing::info!("listening on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(signer.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
