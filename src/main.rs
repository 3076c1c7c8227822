use std::{process, sync::Arc};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use menusync::{
    application::{
        dishes::DishService,
        error::AppError,
        jobs::{SyncJobContext, process_sync_job, sync_schedule},
        menus::MenuService,
        repos::{DishesRepo, MenusRepo, SubmenusRepo, SyncRepo},
        submenus::SubmenuService,
        sync::Synchronizer,
    },
    cache::{CacheConfig, CacheService, CacheStore, MemoryCacheStore},
    config,
    infra::{
        cache::RedisCacheStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        spreadsheet, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Sync(_) => run_sync(settings).await,
    }
}

struct ApplicationContext {
    api_state: ApiState,
    synchronizer: Arc<Synchronizer>,
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = init_cache(&settings)?;
    if settings.cache.flush_on_start {
        cache.flush_all().await;
        info!(target = "menusync::serve", "cache flushed on start");
    }
    let app = build_application_context(repositories, cache);

    let monitor = if settings.sync.enabled {
        let source = spreadsheet::from_settings(&settings.sync.source)?;
        info!(
            target = "menusync::serve",
            source = %source.describe(),
            schedule = %settings.sync.schedule,
            "scheduled sync enabled"
        );
        let context = SyncJobContext::new(app.synchronizer.clone(), source);
        let handle = spawn_sync_monitor(context.clone(), &settings.sync.schedule)?;
        Some((handle, context))
    } else {
        info!(target = "menusync::serve", "scheduled sync disabled");
        None
    };

    let result = serve_http(&settings, app.api_state).await;

    if let Some((handle, context)) = monitor {
        if tokio::time::timeout(settings.server.graceful_shutdown, context.wait_idle())
            .await
            .is_err()
        {
            warn!(
                target = "menusync::serve",
                "sync pass still running at shutdown deadline"
            );
        }
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_sync(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = init_cache(&settings)?;
    let app = build_application_context(repositories, cache);
    let source = spreadsheet::from_settings(&settings.sync.source)?;

    let report = app.synchronizer.run(source.as_ref()).await?;
    info!(
        target = "menusync::sync",
        menus = ?report.menus,
        submenus = ?report.submenus,
        dishes = ?report.dishes,
        discounts = report.discounts_written,
        invalidated = report.invalidated_keys.len(),
        "sync finished"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn init_cache(settings: &config::Settings) -> Result<CacheService, AppError> {
    let store: Arc<dyn CacheStore> = match settings.cache.redis_url.as_deref() {
        Some(url) => Arc::new(RedisCacheStore::connect(url, &settings.cache)?),
        None => {
            warn!(
                target = "menusync::cache",
                "no redis url configured, using the in-process cache"
            );
            Arc::new(MemoryCacheStore::new())
        }
    };
    Ok(CacheService::new(store, CacheConfig::from(&settings.cache)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    cache: CacheService,
) -> ApplicationContext {
    let menus_repo: Arc<dyn MenusRepo> = repositories.clone();
    let submenus_repo: Arc<dyn SubmenusRepo> = repositories.clone();
    let dishes_repo: Arc<dyn DishesRepo> = repositories.clone();
    let sync_repo: Arc<dyn SyncRepo> = repositories;

    let api_state = ApiState {
        menus: Arc::new(MenuService::new(menus_repo, cache.clone())),
        submenus: Arc::new(SubmenuService::new(submenus_repo, cache.clone())),
        dishes: Arc::new(DishService::new(dishes_repo, cache.clone())),
    };

    ApplicationContext {
        api_state,
        synchronizer: Arc::new(Synchronizer::new(sync_repo, cache)),
    }
}

fn spawn_sync_monitor(
    context: SyncJobContext,
    schedule: &str,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = sync_schedule(schedule)
        .map_err(|err| InfraError::configuration(format!("invalid sync schedule: {err}")))?;

    let sync_worker = WorkerBuilder::new("sync-worker")
        .data(context)
        .backend(CronStream::new(schedule))
        .build_fn(process_sync_job);

    let monitor = Monitor::new().register(sync_worker);

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_api_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "menusync::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "menusync::serve", "shutdown requested");
}
