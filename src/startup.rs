use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::configuration::AuthConfig;
use crate::logger::RequestLogger;
use crate::middleware::AuthGuard;
use crate::routes::{current_identity, get_user, health_check, login, refresh, register};
use crate::store::UserStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    auth_config: AuthConfig,
) -> Result<Server, std::io::Error> {
    let store = web::Data::from(store);
    let auth_config = web::Data::new(auth_config);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestLogger)

            // Shared state
            .app_data(store.clone())
            .app_data(auth_config.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .service(
                        web::resource("/me")
                            .wrap(AuthGuard::new(auth_config.clone()))
                            .route(web::get().to(current_identity)),
                    ),
            )

            // Protected routes
            .service(
                web::scope("/users")
                    .wrap(AuthGuard::new(auth_config.clone()))
                    .route("/{user_id}", web::get().to(get_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
