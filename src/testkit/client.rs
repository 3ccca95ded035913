//! Mock [`MarketplaceClient`](crate::port::MarketplaceClient) implementations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::ClientIdentity;
use crate::error::{Error, Result};
use crate::port::{MarketplaceClient, SearchPage, SearchQuery};

/// A mock client with a scripted queue of search results.
///
/// Each call to `search()` pops the next result; an exhausted queue yields an
/// empty page. Call counts are shared so tests can assert them after the
/// client moves into the resilience stack.
pub struct ScriptedClient {
    results: Mutex<VecDeque<Result<SearchPage>>>,
    search_count: Arc<AtomicU32>,
    auth_count: Arc<AtomicU32>,
    last_identity: Arc<Mutex<Option<ClientIdentity>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            search_count: Arc::new(AtomicU32::new(0)),
            auth_count: Arc::new(AtomicU32::new(0)),
            last_identity: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_results(self, results: Vec<Result<SearchPage>>) -> Self {
        *self.results.lock() = results.into();
        self
    }

    /// Queue one successful page of listings.
    pub fn push_page(&self, page: SearchPage) {
        self.results.lock().push_back(Ok(page));
    }

    /// Queue one failure.
    pub fn push_error(&self, error: Error) {
        self.results.lock().push_back(Err(error));
    }

    /// Shared counter for asserting search call counts.
    pub fn search_counter(&self) -> Arc<AtomicU32> {
        self.search_count.clone()
    }

    pub fn search_count(&self) -> u32 {
        self.search_count.load(Ordering::SeqCst)
    }

    pub fn auth_count(&self) -> u32 {
        self.auth_count.load(Ordering::SeqCst)
    }

    /// The identity used by the most recent search.
    pub fn last_identity(&self) -> Option<ClientIdentity> {
        self.last_identity.lock().clone()
    }

    /// Shared handle to the last-identity slot, usable after the client has
    /// moved into the resilience stack.
    pub fn identity_slot(&self) -> Arc<Mutex<Option<ClientIdentity>>> {
        self.last_identity.clone()
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketplaceClient for ScriptedClient {
    async fn authenticate(&self) -> Result<()> {
        self.auth_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(&self, _query: &SearchQuery, identity: &ClientIdentity) -> Result<SearchPage> {
        self.search_count.fetch_add(1, Ordering::SeqCst);
        *self.last_identity.lock() = Some(identity.clone());
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }
}

/// A mock client whose searches never complete.
///
/// For tests that need a search pinned in the executing state (active-search
/// guards, execution timeouts).
pub struct HangingClient {
    search_count: Arc<AtomicU32>,
}

impl HangingClient {
    pub fn new() -> Self {
        Self {
            search_count: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn search_count(&self) -> u32 {
        self.search_count.load(Ordering::SeqCst)
    }

    pub fn search_counter(&self) -> Arc<AtomicU32> {
        self.search_count.clone()
    }
}

impl Default for HangingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketplaceClient for HangingClient {
    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _query: &SearchQuery, _identity: &ClientIdentity) -> Result<SearchPage> {
        self.search_count.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        unreachable!("pending future never resolves")
    }
}
