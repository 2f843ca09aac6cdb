use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::configuration::JwtSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{change_password, get_current_user, health_check, login, logout, register};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    // The dispatch hook observes every issued token; here it feeds the
    // audit log, leaving the issuer unaware of the transport layer.
    let issuer = TokenIssuer::with_dispatch_hook(
        jwt_config.clone(),
        Arc::new(|_token, claims| {
            tracing::debug!(user_id = %claims.sub, jti = %claims.jti, "Access token issued");
            Ok(())
        }),
    );

    let connection = web::Data::new(connection);
    let issuer_data = web::Data::new(issuer);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(connection.clone())
            .app_data(issuer_data.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))

            // Protected routes (JWT validated and revocation-checked)
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(
                        connection.get_ref().clone(),
                        jwt_config.clone(),
                    ))
                    .route("/me", web::get().to(get_current_user))
                    .route("/logout", web::post().to(logout))
                    .route("/password", web::post().to(change_password)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
