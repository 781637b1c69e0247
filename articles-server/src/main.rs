mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use application::article_service::ArticleService;
use application::auth_service::AuthService;
use application::file_service::FileService;
use application::notification_service::NotificationService;
use application::report_jobs::{DailyJob, ReportJob};
use application::user_service::UserService;
use data::article_repository::{
    ArticleRepository, InMemoryArticleRepository, PostgresArticleRepository,
};
use data::user_repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
use infrastructure::config::AppConfig;
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::logging::init_logging;
use infrastructure::mailer::LogMailer;
use infrastructure::scheduler::{Schedule, Scheduler};
use infrastructure::security::JwtKeys;
use infrastructure::storage::LocalObjectStorage;
use server::{AppState, start_rest_server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env()?;

    let (article_repo, user_repo): (Arc<dyn ArticleRepository>, Arc<dyn UserRepository>) =
        match &config.database_url {
            Some(url) => {
                let pool = create_pool(url).await?;
                run_migrations(&pool).await?;
                (
                    Arc::new(PostgresArticleRepository::new(pool.clone())),
                    Arc::new(PostgresUserRepository::new(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL is not set, data is kept in memory only");
                (
                    Arc::new(InMemoryArticleRepository::new()),
                    Arc::new(InMemoryUserRepository::new()),
                )
            }
        };

    let keys = JwtKeys::new(config.jwt_secret.clone(), config.jwt_ttl_secs);
    let articles = ArticleService::new(article_repo);
    let storage = LocalObjectStorage::new(
        &config.storage_dir,
        config.storage_bucket.clone(),
        config.storage_public_url.clone(),
    );

    let state = AppState {
        articles: articles.clone(),
        users: UserService::new(Arc::clone(&user_repo)),
        auth: AuthService::new(user_repo, keys),
        notifications: NotificationService::new(Arc::new(LogMailer::new(
            Duration::from_millis(config.mail_delay_ms),
        ))),
        files: FileService::new(Arc::new(storage)),
    };

    let mut scheduler = Scheduler::new();
    scheduler.add(
        ReportJob::new(articles),
        Schedule::FixedRate(Duration::from_secs(config.report_interval_secs.max(1))),
    );
    scheduler.add(Arc::new(DailyJob), Schedule::cron(&config.daily_job_cron)?);
    let jobs = scheduler.start();

    let served = start_rest_server(&config, state).await;

    scheduler.shutdown();
    for job in jobs {
        let _ = job.await;
    }
    info!("shutdown complete");

    served
}
