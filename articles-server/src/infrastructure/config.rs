use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// In-memory repositories are used when unset.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub cors_origins: Vec<String>,
    pub storage_dir: String,
    pub storage_bucket: String,
    pub storage_public_url: String,
    pub mail_delay_ms: u64,
    pub report_interval_secs: u64,
    pub daily_job_cron: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "127.0.0.1");
        let port = parse(&lookup, "PORT", 8080)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let jwt_ttl_secs = parse(&lookup, "JWT_TTL_SECS", 86_400)?;
        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            jwt_ttl_secs,
            cors_origins,
            storage_dir: var("STORAGE_DIR", "./uploads"),
            storage_bucket: var("STORAGE_BUCKET", "articles"),
            storage_public_url: var("STORAGE_PUBLIC_URL", "http://localhost:8080/files"),
            mail_delay_ms: parse(&lookup, "MAIL_DELAY_MS", 3_000)?,
            report_interval_secs: parse(&lookup, "REPORT_INTERVAL_SECS", 10)?,
            daily_job_cron: var("DAILY_JOB_CRON", "0 0 1 * * *"),
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        None => Ok(default),
    }
}
