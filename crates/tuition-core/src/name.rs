//! Centre identity: display names, branch suffixes and locations.
//!
//! A branch can arrive two ways: as a separate column, or already embedded as
//! a trailing `(branch)` in the name. Both reconcile to the same display name
//! so that the dedupe key is stable across datasets.

use std::sync::LazyLock;

use regex::Regex;

use crate::centre::DedupeKey;

static TRAILING_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(.+?)\s*\(([^()]+)\)$").expect("valid regex")
});

/// Collapse internal whitespace runs and trim.
pub fn collapse_whitespace(raw: &str) -> String {
  raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"base (branch)"`, or just `base` when there is no branch.
pub fn compose_display_name(base: &str, branch: Option<&str>) -> String {
  match branch.map(str::trim).filter(|b| !b.is_empty()) {
    Some(branch) => format!("{} ({branch})", base.trim()),
    None => base.trim().to_owned(),
  }
}

/// The name with any trailing `(branch)` removed.
pub fn centre_name(full: &str) -> &str {
  let full = full.trim();
  TRAILING_BRANCH
    .captures(full)
    .and_then(|caps| caps.get(1))
    .map_or(full, |m| m.as_str().trim())
}

/// The trailing `(branch)` of a name, if present.
pub fn branch_name(full: &str) -> Option<&str> {
  TRAILING_BRANCH
    .captures(full.trim())
    .and_then(|caps| caps.get(2))
    .map(|m| m.as_str().trim())
}

/// A reconciled centre identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentreIdentity {
  pub base_name:    String,
  pub branch:       Option<String>,
  pub display_name: String,
  /// Address, else area. `None` when neither was supplied.
  pub location:     Option<String>,
}

impl CentreIdentity {
  /// `None` when the location is missing; such a centre cannot be stored.
  pub fn dedupe_key(&self) -> Option<DedupeKey> {
    let location = self.location.clone()?;
    Some(DedupeKey { name: self.display_name.clone(), location })
  }
}

fn present(raw: Option<&str>) -> Option<String> {
  raw.map(collapse_whitespace).filter(|s| !s.is_empty())
}

/// Reconcile raw name, branch, address and area into one identity.
pub fn normalize_identity(
  raw_name: &str,
  raw_branch: Option<&str>,
  address: Option<&str>,
  area: Option<&str>,
) -> CentreIdentity {
  let name = collapse_whitespace(raw_name);
  let location = present(address).or_else(|| present(area));

  let (base_name, branch, display_name) = match present(raw_branch) {
    Some(branch) if branch_name(&name) == Some(branch.as_str()) => {
      (centre_name(&name).to_owned(), Some(branch), name)
    }
    Some(branch) => {
      let display = compose_display_name(&name, Some(&branch));
      (name, Some(branch), display)
    }
    None => (
      centre_name(&name).to_owned(),
      branch_name(&name).map(str::to_owned),
      name,
    ),
  };

  CentreIdentity { base_name, branch, display_name, location }
}
