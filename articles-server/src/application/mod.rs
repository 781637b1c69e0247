pub mod article_cache;
pub mod article_service;
pub mod auth_service;
pub mod file_service;
pub mod notification_service;
pub mod report_jobs;
pub mod user_service;
