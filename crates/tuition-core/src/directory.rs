//! [`Directory`], the read side of the service: filter options and faceted
//! centre search over any [`DirectoryStore`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  centre::CentreView,
  filter::{CentreQuery, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT, build_filter},
  store::DirectoryStore,
};

pub const NO_DATA_REASON: &str =
  "Filters temporarily disabled. No offerings data yet.";
pub const DISABLED_REASON: &str = "Filters disabled by configuration.";

/// What the UI may offer as filter choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
  pub enabled:  bool,
  pub levels:   Vec<String>,
  pub subjects: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason:   Option<String>,
}

impl FilterOptions {
  fn disabled(reason: &str) -> Self {
    Self {
      enabled:  false,
      levels:   Vec::new(),
      subjects: Vec::new(),
      reason:   Some(reason.to_owned()),
    }
  }
}

/// A user's search as it arrives from the outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
  pub search:   Option<String>,
  pub levels:   Vec<String>,
  pub subjects: Vec<String>,
  pub page:     u32,
  pub limit:    u32,
}

impl Default for SearchRequest {
  fn default() -> Self {
    Self {
      search:   None,
      levels:   Vec::new(),
      subjects: Vec::new(),
      page:     DEFAULT_PAGE,
      limit:    DEFAULT_LIMIT,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
  pub centres:         Vec<CentreView>,
  pub page:            u32,
  pub limit:           u32,
  pub total:           u64,
  pub total_pages:     u64,
  /// False when a selection was given but filtering was bypassed.
  pub filters_applied: bool,
}

/// Read-side facade over a store.
pub struct Directory<S> {
  store:           Arc<S>,
  filters_enabled: bool,
}

impl<S> Clone for Directory<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), filters_enabled: self.filters_enabled }
  }
}

impl<S: DirectoryStore> Directory<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store, filters_enabled: true } }

  /// Switch filtering off regardless of data.
  pub fn with_filters_enabled(mut self, enabled: bool) -> Self {
    self.filters_enabled = enabled;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Filtering is active only when switched on and at least one offering
  /// exists.
  pub async fn filters_active(&self) -> Result<bool, S::Error> {
    if !self.filters_enabled {
      return Ok(false);
    }
    Ok(self.store.offering_count().await? > 0)
  }

  pub async fn filter_options(&self) -> Result<FilterOptions, S::Error> {
    if !self.filters_enabled {
      return Ok(FilterOptions::disabled(DISABLED_REASON));
    }
    if self.store.offering_count().await? == 0 {
      return Ok(FilterOptions::disabled(NO_DATA_REASON));
    }
    Ok(FilterOptions {
      enabled:  true,
      levels:   self.store.offered_levels().await?,
      subjects: self.store.offered_subjects().await?,
      reason:   None,
    })
  }

  /// Run a search. A selection made while filtering is inactive is ignored,
  /// so the caller gets the unfiltered listing rather than an empty page.
  pub async fn search(
    &self,
    request: SearchRequest,
  ) -> Result<SearchResults, S::Error> {
    let mut filter = build_filter(&request.levels, &request.subjects);
    if filter.is_some() && !self.filters_active().await? {
      filter = None;
    }
    let filters_applied = filter.is_some();

    let query = CentreQuery {
      search: request.search,
      filter,
      page: request.page.max(1),
      limit: request.limit.clamp(1, MAX_LIMIT),
    };
    let page = self.store.search_centres(&query).await?;

    Ok(SearchResults {
      centres: page.centres,
      page: query.page,
      limit: query.limit,
      total: page.total,
      total_pages: page.total.div_ceil(u64::from(query.limit)),
      filters_applied,
    })
  }

  pub async fn centre(&self, id: Uuid) -> Result<Option<CentreView>, S::Error> {
    self.store.get_centre(id).await
  }
}
