//! The faceted filter: turns a user's level/subject selection into an
//! [`OfferingFilter`] that matches whole offering rows.
//!
//! A centre matches when **one** of its offerings has a level in the selected
//! levels and a subject in the selected subjects. Matching the axes
//! independently would admit centres that teach the level and the subject
//! only in different combinations.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{level::Stage, offering::OfferingPair};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Trim, drop blanks, and de-duplicate.
pub fn clean_names<I, S>(names: I) -> BTreeSet<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  names
    .into_iter()
    .map(|name| name.as_ref().trim().to_owned())
    .filter(|name| !name.is_empty())
    .collect()
}

/// Replace category names ("Primary", "Secondary", "JC", "Junior College")
/// with their concrete levels. Concrete names pass through unchanged.
pub fn expand_levels<I, S>(names: I) -> BTreeSet<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  clean_names(names)
    .into_iter()
    .flat_map(|name| match Stage::from_category(&name) {
      Some(stage) => stage.level_names().collect::<Vec<_>>(),
      None => vec![name],
    })
    .collect()
}

/// A same-row offering predicate. `None` on an axis leaves it unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OfferingFilter {
  pub levels:   Option<BTreeSet<String>>,
  pub subjects: Option<BTreeSet<String>>,
}

impl OfferingFilter {
  pub fn matches_pair(&self, level: &str, subject: &str) -> bool {
    self.levels.as_ref().is_none_or(|levels| levels.contains(level))
      && self
        .subjects
        .as_ref()
        .is_none_or(|subjects| subjects.contains(subject))
  }

  /// True when any single offering satisfies both axes.
  pub fn matches<'a, I>(&self, offerings: I) -> bool
  where
    I: IntoIterator<Item = &'a OfferingPair>,
  {
    offerings
      .into_iter()
      .any(|o| self.matches_pair(&o.level, &o.subject))
  }
}

/// Build the filter for a selection. `None` when neither axis selects
/// anything.
pub fn build_filter<L, S>(levels: L, subjects: S) -> Option<OfferingFilter>
where
  L: IntoIterator,
  L::Item: AsRef<str>,
  S: IntoIterator,
  S::Item: AsRef<str>,
{
  let levels = expand_levels(levels);
  let subjects = clean_names(subjects);
  if levels.is_empty() && subjects.is_empty() {
    return None;
  }
  Some(OfferingFilter {
    levels:   (!levels.is_empty()).then_some(levels),
    subjects: (!subjects.is_empty()).then_some(subjects),
  })
}

/// A resolved centre search, ready for a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentreQuery {
  /// Case-insensitive substring over name and location.
  pub search: Option<String>,
  pub filter: Option<OfferingFilter>,
  /// 1-based.
  pub page:   u32,
  pub limit:  u32,
}

impl Default for CentreQuery {
  fn default() -> Self {
    Self { search: None, filter: None, page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
  }
}

impl CentreQuery {
  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }

  /// The search term, trimmed, if it is not blank.
  pub fn search_term(&self) -> Option<&str> {
    self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }
}
