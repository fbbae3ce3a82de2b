use std::{process, sync::Arc, time::Duration};

use atelier::{
    application::{
        admin::{
            audit::AdminAuditService, categories::AdminCategoryService, pages::AdminPageService,
            projects::AdminProjectService, uploads::AdminUploadService,
        },
        content::{CacheTrigger, ContentService, ContentSource},
        error::AppError,
        repos::{
            AuditRepo, CategoriesRepo, CategoriesWriteRepo, PagesRepo, PagesWriteRepo,
            ProjectImagesRepo, ProjectsRepo, ProjectsWriteRepo,
        },
    },
    cache::{CacheConfig, FallbackContent},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        telemetry,
        uploads::UploadStorage,
    },
};
use metrics::{gauge, histogram};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    let sweep_handle = spawn_cache_sweep(app.content.clone(), &settings.cache);

    let result = serve_http(&settings, app.router_state).await;

    sweep_handle.abort();
    let _ = sweep_handle.await;

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "atelier::migrate", "migrations applied");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

struct ApplicationContext {
    router_state: RouterState,
    content: Arc<ContentService>,
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let categories_write_repo: Arc<dyn CategoriesWriteRepo> = repositories.clone();
    let projects_repo: Arc<dyn ProjectsRepo> = repositories.clone();
    let projects_write_repo: Arc<dyn ProjectsWriteRepo> = repositories.clone();
    let project_images_repo: Arc<dyn ProjectImagesRepo> = repositories.clone();
    let pages_repo: Arc<dyn PagesRepo> = repositories.clone();
    let pages_write_repo: Arc<dyn PagesWriteRepo> = repositories.clone();
    let audit_repo: Arc<dyn AuditRepo> = repositories.clone();

    let upload_storage = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    let cache_config = CacheConfig::from(&settings.cache);
    let content_source: Arc<dyn ContentSource> = repositories.clone();
    let content = Arc::new(ContentService::new(
        &cache_config,
        content_source,
        FallbackContent::load(),
    ));
    let cache_trigger = cache_config
        .enabled
        .then(|| CacheTrigger::new(content.clone()));

    let audit_service = AdminAuditService::new(audit_repo.clone());
    let category_service = Arc::new(
        AdminCategoryService::new(
            categories_repo.clone(),
            categories_write_repo,
            audit_service.clone(),
        )
        .with_cache_trigger_opt(cache_trigger.clone()),
    );
    let project_service = Arc::new(
        AdminProjectService::new(
            projects_repo,
            projects_write_repo,
            project_images_repo,
            categories_repo,
            audit_service.clone(),
        )
        .with_cache_trigger_opt(cache_trigger.clone()),
    );
    let page_service = Arc::new(
        AdminPageService::new(pages_repo, pages_write_repo, audit_service.clone())
            .with_cache_trigger_opt(cache_trigger.clone()),
    );
    let upload_service = Arc::new(AdminUploadService::new(
        upload_storage.clone(),
        audit_service.clone(),
    ));

    let api_state = ApiState {
        categories: category_service,
        projects: project_service,
        pages: page_service,
        uploads: upload_service,
        audit: Arc::new(audit_service),
    };

    let http_state = HttpState {
        content: content.clone(),
        db: repositories,
        upload_storage,
    };

    Ok(ApplicationContext {
        router_state: RouterState {
            http: http_state,
            api: api_state,
        },
        content,
    })
}

fn spawn_cache_sweep(
    content: Arc<ContentService>,
    cache: &config::CacheSettings,
) -> tokio::task::JoinHandle<()> {
    let interval = CacheConfig::from(cache).sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // Skip the first immediate tick
        loop {
            ticker.tick().await;
            let start = std::time::Instant::now();
            let evicted = content.purge_expired();
            histogram!("atelier_cache_sweep_ms").record(start.elapsed().as_millis() as f64);
            gauge!("atelier_cache_entries").set(content.cached_entries() as f64);
            if evicted > 0 {
                debug!(
                    target = "atelier::cache::sweep",
                    evicted, "evicted expired cache entries"
                );
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let upload_body_limit = settings.uploads.max_request_bytes.get() as usize;
    let router = http::build_router(state, upload_body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "atelier::server",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(drain_limit: Duration) {
    let _ = tokio::signal::ctrl_c().await;
    info!(
        target = "atelier::server",
        "shutdown signal received; draining connections"
    );

    // Bound the drain so a stuck connection cannot hold the process open.
    tokio::spawn(async move {
        tokio::time::sleep(drain_limit).await;
        warn!(
            target = "atelier::server",
            "graceful shutdown timed out; exiting"
        );
        process::exit(0);
    });
}
