use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::application::article_cache::{ArticleCache, CacheKey, CachedArticles};
use crate::data::article_repository::ArticleRepository;
use crate::domain::article::{Article, ArticleInput, TITLE_MAX_CHARS};
use crate::domain::error::DomainError;

#[derive(Clone)]
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    cache: ArticleCache,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self::with_cache(repo, ArticleCache::new())
    }

    pub fn with_cache(repo: Arc<dyn ArticleRepository>, cache: ArticleCache) -> Self {
        Self { repo, cache }
    }

    pub async fn list_all(&self) -> Result<Vec<Article>, DomainError> {
        if let Some(CachedArticles::List(articles)) = self.cache.get(CacheKey::All) {
            debug!(key = %CacheKey::All, "article cache hit");
            return Ok(articles.as_ref().clone());
        }

        let seen = self.cache.generation();
        let articles = self.repo.list_active().await?;
        if !self
            .cache
            .put(CacheKey::All, CachedArticles::List(Arc::new(articles.clone())), seen)
        {
            debug!(key = %CacheKey::All, "skipped caching listing invalidated mid-read");
        }
        Ok(articles)
    }

    /// Soft-deleted articles are returned as well.
    pub async fn get_by_id(&self, id: i64) -> Result<Article, DomainError> {
        let key = CacheKey::Id(id);
        if let Some(CachedArticles::Single(article)) = self.cache.get(key) {
            debug!(key = %key, "article cache hit");
            return Ok(article.as_ref().clone());
        }

        let seen = self.cache.generation();
        let article = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::article_not_found(id))?;
        self.cache
            .put(key, CachedArticles::Single(Arc::new(article.clone())), seen);
        Ok(article)
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: ArticleInput) -> Result<Article, DomainError> {
        validate_new_article(&input)?;

        let article = self.repo.save(Article::from(input)).await?;
        self.cache.evict(CacheKey::All);

        info!(article_id = ?article.id, "article created");
        Ok(article)
    }

    /// Replaces every mutable field; no business validation runs here.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: ArticleInput) -> Result<Article, DomainError> {
        let mut article = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::article_not_found(id))?;

        article.apply(input);
        let article = self.repo.save(article).await?;
        self.evict_article(id);

        info!(article_id = id, "article updated");
        Ok(article)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let mut article = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::article_not_found(id))?;

        article.deleted_at = Some(Utc::now());
        self.repo.save(article).await?;
        self.evict_article(id);

        info!(article_id = id, "article soft-deleted");
        Ok(())
    }

    fn evict_article(&self, id: i64) {
        self.cache.evict(CacheKey::Id(id));
        self.cache.evict(CacheKey::All);
    }
}

/// Checks run in a fixed order; the first failure is reported.
fn validate_new_article(input: &ArticleInput) -> Result<(), DomainError> {
    if input.title.trim().is_empty() {
        return Err(DomainError::InvalidInput("Title must not be empty".into()));
    }
    if input.author.trim().is_empty() {
        return Err(DomainError::InvalidInput("Author must not be empty".into()));
    }
    if input.title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::InvalidInput(
            "Title must not exceed 255 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rstest::rstest;

    use super::*;
    use crate::data::article_repository::InMemoryArticleRepository;

    /// Counts reads and can run a hook in the middle of `list_active`.
    #[derive(Default)]
    struct TrackingRepo {
        inner: InMemoryArticleRepository,
        list_calls: AtomicUsize,
        find_calls: AtomicUsize,
        during_list: Option<Box<dyn Fn() + Send + Sync>>,
    }

    #[async_trait]
    impl ArticleRepository for TrackingRepo {
        async fn list_active(&self) -> Result<Vec<Article>, DomainError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let rows = self.inner.list_active().await;
            if let Some(hook) = &self.during_list {
                hook();
            }
            rows
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<Article>, DomainError> {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id).await
        }

        async fn save(&self, article: Article) -> Result<Article, DomainError> {
            self.inner.save(article).await
        }

        async fn delete_all(&self) -> Result<u64, DomainError> {
            self.inner.delete_all().await
        }
    }

    fn input(title: &str, author: &str) -> ArticleInput {
        ArticleInput {
            title: title.into(),
            description: Some("Test Description".into()),
            content: Some("Test Content".into()),
            author: author.into(),
        }
    }

    fn service() -> (ArticleService, Arc<TrackingRepo>) {
        let repo = Arc::new(TrackingRepo::default());
        (ArticleService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn create_sets_audit_fields() {
        let (service, _) = service();
        let article = service.create(input("Test Title", "Reja")).await.unwrap();

        assert!(article.id.is_some());
        assert!(article.created_at <= article.updated_at);
        assert!(article.deleted_at.is_none());
        assert_eq!(article.title, "Test Title");
    }

    #[rstest]
    #[case::blank_title("   ".to_string(), "Reja", "Title must not be empty")]
    #[case::blank_author("Title".to_string(), "", "Author must not be empty")]
    #[case::long_title("A".repeat(300), "Reja", "Title must not exceed 255 characters")]
    #[case::blank_title_wins_over_blank_author(String::new(), " ", "Title must not be empty")]
    #[case::blank_author_wins_over_long_title("A".repeat(300), "", "Author must not be empty")]
    #[tokio::test]
    async fn create_rejects_invalid_input(
        #[case] title: String,
        #[case] author: &str,
        #[case] message: &str,
    ) {
        let (service, repo) = service();
        let err = service.create(input(&title, author)).await.unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(err.to_string(), message);
        assert!(repo.inner.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn title_of_exactly_255_chars_is_accepted() {
        let (service, _) = service();
        assert!(service.create(input(&"A".repeat(255), "Reja")).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (service, _) = service();

        let get = service.get_by_id(999).await.unwrap_err();
        let update = service.update(999, input("X", "Y")).await.unwrap_err();
        let delete = service.delete(999).await.unwrap_err();

        for err in [get, update, delete] {
            assert!(matches!(err, DomainError::NotFound { id: 999, .. }));
            assert!(err.to_string().contains("999"));
        }
    }

    #[tokio::test]
    async fn listing_is_served_from_cache_until_mutation() {
        let (service, repo) = service();
        service.create(input("Test", "Reja")).await.unwrap();

        let first = service.list_all().await.unwrap();
        let second = service.list_all().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);

        service.create(input("Another", "Reja")).await.unwrap();
        assert_eq!(service.list_all().await.unwrap().len(), 2);
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn get_by_id_is_cached_and_evicted_on_update() {
        let (service, repo) = service();
        let id = service.create(input("Old", "Reja")).await.unwrap().id.unwrap();

        service.get_by_id(id).await.unwrap();
        service.get_by_id(id).await.unwrap();
        assert_eq!(repo.find_calls.load(Ordering::SeqCst), 1);

        service.update(id, input("New", "Reja")).await.unwrap();
        assert_eq!(service.get_by_id(id).await.unwrap().title, "New");
    }

    #[tokio::test]
    async fn soft_delete_hides_from_listing_only() {
        let (service, _) = service();
        let id = service.create(input("Test", "Reja")).await.unwrap().id.unwrap();

        let listed = service.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Test");
        service.get_by_id(id).await.unwrap();

        service.delete(id).await.unwrap();

        assert!(service.list_all().await.unwrap().is_empty());
        let deleted = service.get_by_id(id).await.unwrap();
        assert!(deleted.deleted_at.is_some());
        assert_eq!(deleted.title, "Test");
    }

    #[tokio::test]
    async fn update_overwrites_every_field_without_validation() {
        let (service, _) = service();
        let created = service.create(input("Title", "Reja")).await.unwrap();
        let id = created.id.unwrap();

        let updated = service
            .update(
                id,
                ArticleInput {
                    title: "  ".into(),
                    description: None,
                    content: Some(String::new()),
                    author: String::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "  ");
        assert_eq!(updated.description, None);
        assert_eq!(updated.content.as_deref(), Some(""));
        assert_eq!(updated.author, "");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn listing_invalidated_mid_read_is_not_cached() {
        let cache = ArticleCache::new();
        let evicting = cache.clone();
        let repo = Arc::new(TrackingRepo {
            during_list: Some(Box::new(move || evicting.evict(CacheKey::All))),
            ..TrackingRepo::default()
        });
        let service = ArticleService::with_cache(repo.clone(), cache.clone());

        service.list_all().await.unwrap();
        assert!(cache.get(CacheKey::All).is_none());

        service.list_all().await.unwrap();
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }
}
