use clap::Parser;
use filmstrip::cli::{
    Args, build_config, init_logging, load_jwt_secret, open_database, validate_cookie_config,
    validate_frontend_url,
};
use filmstrip::run_server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(cookie) = validate_cookie_config(
        args.cookie_name.clone(),
        args.cookie_domain.clone(),
        args.cookie_path.clone(),
    ) else {
        std::process::exit(1);
    };

    let Some(frontend_url) = validate_frontend_url(&args.frontend_url) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let config = build_config(&args, db, jwt_secret, cookie, frontend_url);
    info!(
        issuer = %config.issuer,
        access_ttl = ?config.access_ttl,
        refresh_ttl = ?config.refresh_ttl,
        "Session settings"
    );

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
