//! Persistence for submissions, subscriptions, content and accounts.
//!
//! Handlers only see the repository traits below, held as `Arc<dyn ...>` in
//! [`Stores`]. The in-memory implementations in [`memory`] keep every record
//! for the lifetime of the process; each operation is atomic with respect to
//! the others on the same store.
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> AppResult<...> {
//!     state.stores.contacts.append(submission).await?;
//! }
//! ```

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::AppError;
use crate::models::{
    Account, ContactStatus, ContactSubmission, ContentItem, ContentQuery, NewsletterSubscription,
    Page, PageRequest,
};

pub use memory::InMemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record with this (lowercased) email already exists
    #[error("a record for {0} already exists")]
    DuplicateEmail(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => AppError::Conflict {
                code: "DUPLICATE",
                message: "A record with this email already exists".to_string(),
            },
        }
    }
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn append(&self, submission: ContactSubmission) -> StoreResult<()>;

    /// Submissions newest-first, optionally restricted to one status.
    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<ContactSubmission>>;

    async fn count(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a subscription unless one exists for the same email.
    async fn insert(&self, subscription: NewsletterSubscription) -> StoreResult<()>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<NewsletterSubscription>>;

    /// Mark the subscription for `email` confirmed and return it, or `None`
    /// when there is no such subscription.
    async fn confirm(
        &self,
        email: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<NewsletterSubscription>>;

    async fn count(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Items matching `query`, newest-first, paginated.
    async fn list(&self, query: &ContentQuery) -> StoreResult<Page<ContentItem>>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert an account unless one exists for the same email.
    async fn insert(&self, account: Account) -> StoreResult<()>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    async fn count(&self) -> StoreResult<usize>;
}

/// All repositories the handlers use.
#[derive(Clone)]
pub struct Stores {
    pub contacts: Arc<dyn ContactRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub accounts: Arc<dyn AccountRepository>,
}

impl Stores {
    /// Fresh in-memory stores with the given content catalogue.
    pub fn in_memory(content: Vec<ContentItem>) -> Self {
        Self {
            contacts: Arc::new(InMemoryStore::<ContactSubmission>::new()),
            subscriptions: Arc::new(InMemoryStore::<NewsletterSubscription>::new()),
            content: Arc::new(InMemoryStore::from_records(content)),
            accounts: Arc::new(InMemoryStore::<Account>::new()),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
