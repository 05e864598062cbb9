//! Thread registry: lists prior runs and loads a selected run's history.
//! Only consulted when the service reports stateful mode.

use flowscope_types::{ThreadInfo, TraceStep};

use crate::api::ConsoleApi;
use crate::error::Result;

#[derive(Debug)]
pub struct ThreadRegistry {
    api: ConsoleApi,
    threads: Vec<ThreadInfo>,
}

impl ThreadRegistry {
    pub fn new(api: ConsoleApi) -> Self {
        Self {
            api,
            threads: Vec::new(),
        }
    }

    /// The most recently fetched thread list.
    pub fn threads(&self) -> &[ThreadInfo] {
        &self.threads
    }

    /// Re-fetch the thread list, optionally filtered by id substring.
    pub async fn refresh(&mut self, filter: Option<&str>) -> Result<&[ThreadInfo]> {
        self.threads = self.api.fetch_threads(filter).await?;
        Ok(&self.threads)
    }

    /// Load one thread's persisted step history for hydration.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<TraceStep>> {
        self.api.fetch_history(thread_id).await
    }
}
