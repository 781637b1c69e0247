use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::application::article_service::ArticleService;
use crate::infrastructure::scheduler::Job;

/// Periodic report over the active article set.
pub struct ReportJob {
    articles: ArticleService,
}

impl ReportJob {
    pub fn new(articles: ArticleService) -> Arc<Self> {
        Arc::new(Self { articles })
    }
}

#[async_trait]
impl Job for ReportJob {
    fn name(&self) -> &str {
        "report"
    }

    async fn run(&self) -> anyhow::Result<()> {
        info!("generating report in background");
        let active = self.articles.list_all().await?;
        info!(active_articles = active.len(), "report generated");
        Ok(())
    }
}

pub struct DailyJob;

#[async_trait]
impl Job for DailyJob {
    fn name(&self) -> &str {
        "daily"
    }

    async fn run(&self) -> anyhow::Result<()> {
        info!("running daily job");
        Ok(())
    }
}
