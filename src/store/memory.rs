//! In-memory repositories.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{
    AccountRepository, ContactRepository, ContentRepository, StoreError, StoreResult,
    SubscriptionRepository,
};
use crate::models::{
    Account, ContactStatus, ContactSubmission, ContentItem, ContentQuery, NewsletterSubscription,
    Page, PageRequest, paginate,
};

/// Append-only record list behind a read/write lock.
#[derive(Debug)]
pub struct InMemoryStore<T> {
    records: RwLock<Vec<T>>,
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone> InMemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<T>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    fn push(&self, record: T) {
        self.records.write().push(record);
    }

    /// Push `record` unless `conflicts` matches an existing one. The check
    /// and the insert happen under one write lock.
    fn push_unique(&self, record: T, conflicts: impl Fn(&T) -> bool) -> bool {
        let mut records = self.records.write();
        if records.iter().any(conflicts) {
            return false;
        }
        records.push(record);
        true
    }

    fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.records.read().iter().find(|r| predicate(r)).cloned()
    }

    /// Matching records, newest insertion first.
    fn collect_newest_first(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.records
            .read()
            .iter()
            .rev()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

/// Sort by timestamp, newest first. The sort is stable, so records with
/// equal timestamps keep their newest-insertion-first order.
fn sort_newest_first<T>(records: &mut [T], timestamp: impl Fn(&T) -> DateTime<Utc>) {
    records.sort_by_key(|r| Reverse(timestamp(r)));
}

#[async_trait]
impl ContactRepository for InMemoryStore<ContactSubmission> {
    async fn append(&self, submission: ContactSubmission) -> StoreResult<()> {
        self.push(submission);
        Ok(())
    }

    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<ContactSubmission>> {
        let mut matching = self.collect_newest_first(|s| status.is_none_or(|st| s.status == st));
        sort_newest_first(&mut matching, |s| s.submitted_at);
        Ok(paginate(matching, page))
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.len())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore<NewsletterSubscription> {
    async fn insert(&self, subscription: NewsletterSubscription) -> StoreResult<()> {
        let email = subscription.email.clone();
        if self.push_unique(subscription, |s| s.email.eq_ignore_ascii_case(&email)) {
            Ok(())
        } else {
            Err(StoreError::DuplicateEmail(email))
        }
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<NewsletterSubscription>> {
        Ok(self.find(|s| s.email.eq_ignore_ascii_case(email)))
    }

    async fn confirm(
        &self,
        email: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<NewsletterSubscription>> {
        let mut records = self.records.write();
        Ok(records
            .iter_mut()
            .find(|s| s.email.eq_ignore_ascii_case(email))
            .map(|s| {
                s.confirm(at);
                s.clone()
            }))
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.len())
    }
}

#[async_trait]
impl ContentRepository for InMemoryStore<ContentItem> {
    async fn list(&self, query: &ContentQuery) -> StoreResult<Page<ContentItem>> {
        let mut matching = self.collect_newest_first(|item| query.matches(item));
        sort_newest_first(&mut matching, |item| item.published_at);
        Ok(paginate(matching, query.page_request()))
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore<Account> {
    async fn insert(&self, account: Account) -> StoreResult<()> {
        let email = account.email.clone();
        if self.push_unique(account, |a| a.email.eq_ignore_ascii_case(&email)) {
            Ok(())
        } else {
            Err(StoreError::DuplicateEmail(email))
        }
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(self.find(|a| a.email.eq_ignore_ascii_case(email)))
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.len())
    }
}
