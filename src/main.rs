use chrono::Utc;
use rental_admin_backend::{
    config::{get_config, init_config},
    database::{
        pool::{create_pool, run_migrations},
        Store,
    },
    middleware::cors::portal_cors,
    routes, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    init_config()?;
    let config = get_config();

    let store = if config.database_url.is_some() {
        let pool = create_pool(config).await?;
        run_migrations(&pool).await?;
        info!("using postgres store");
        Store::postgres(pool)
    } else {
        tracing::warn!("DATABASE_URL not set, data is kept in memory only");
        Store::memory()
    };

    let app_state = AppState::new(Arc::new(config.clone()), store)?;

    let scheduler = JobScheduler::new().await?;
    {
        let otp = app_state.otp_service.clone();
        let every = Duration::from_secs(config.otp_sweep_interval_seconds.max(1));
        scheduler
            .add(Job::new_repeated_async(every, move |_id, _scheduler| {
                let otp = otp.clone();
                Box::pin(async move {
                    let removed = otp.sweep_expired(Utc::now()).await;
                    if removed > 0 {
                        info!(removed, "expired verification codes swept");
                    }
                })
            })?)
            .await?;
    }
    scheduler.start().await?;

    let app = routes::router(app_state)
        .layer(portal_cors(&config.portal_url))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
