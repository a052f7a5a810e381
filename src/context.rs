/// Application context and dependency injection
use crate::{
    account::AccountManager,
    admin::AdminManager,
    config::ServerConfig,
    db,
    error::ApiResult,
    mailer::Mailer,
    moderation::ReportManager,
    notify::Notifier,
    posts::PostStore,
    rate_limit::{RateLimitConfig, RateLimiter},
    reactions::ReactionManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub post_store: Arc<PostStore>,
    pub report_manager: Arc<ReportManager>,
    pub reaction_manager: Arc<ReactionManager>,
    pub admin_manager: Arc<AdminManager>,
    pub notifier: Notifier,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(db.clone(), config.clone()));
        let post_store = Arc::new(PostStore::new(db.clone()));
        let report_manager = Arc::new(ReportManager::new(db.clone()));
        let reaction_manager = Arc::new(ReactionManager::new(db.clone()));
        let admin_manager = Arc::new(AdminManager::new(db.clone()));

        let mailer = Arc::new(Mailer::new(config.email.clone())?);
        if !mailer.is_configured() {
            tracing::warn!("Email not configured, notifications will be skipped");
        }
        let notifier = Notifier::new(db.clone(), mailer.clone(), config.service.base_url.clone());

        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));

        Ok(Self {
            config,
            db,
            account_manager,
            post_store,
            report_manager,
            reaction_manager,
            admin_manager,
            notifier,
            rate_limiter,
            mailer,
        })
    }
}
