//! Academic levels: stages, canonical names, and the compact range grammar
//! used in spreadsheet exports (`P1-P6`, `Sec1/Sec2`, `J1`, `UNKNOWN`).

use std::{cmp::Ordering, sync::LazyLock};

use regex::Regex;

static SINGLE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([A-Za-z][A-Za-z ]*?)\s*(\d+)$").expect("valid regex")
});

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^([A-Za-z][A-Za-z ]*?)\s*(\d+)\s*-\s*(?:([A-Za-z][A-Za-z ]*?)\s*)?(\d+)$",
  )
  .expect("valid regex")
});

// ─── Stage ───────────────────────────────────────────────────────────────────

/// A schooling stage. Declaration order is academic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
  Primary,
  Secondary,
  Jc,
}

impl Stage {
  pub const ALL: [Stage; 3] = [Stage::Primary, Stage::Secondary, Stage::Jc];

  /// The word used in canonical level names.
  pub fn label(self) -> &'static str {
    match self {
      Stage::Primary => "Primary",
      Stage::Secondary => "Secondary",
      Stage::Jc => "JC",
    }
  }

  /// Highest year in the stage. Years start at 1.
  pub fn max_year(self) -> u8 {
    match self {
      Stage::Primary => 6,
      Stage::Secondary => 5,
      Stage::Jc => 2,
    }
  }

  /// Resolve a range prefix (`P`, `Pri`, `Primary`, `Sec`, `J`, …),
  /// case-insensitively.
  pub fn from_prefix(prefix: &str) -> Option<Self> {
    let prefix = prefix.trim().to_ascii_lowercase();
    match prefix.as_str() {
      "p" | "pri" | "primary" => Some(Stage::Primary),
      "s" | "sec" | "secondary" => Some(Stage::Secondary),
      "j" | "jc" | "junior college" => Some(Stage::Jc),
      _ => None,
    }
  }

  /// Resolve a category name used in filter selections ("Primary",
  /// "Secondary", "JC", "Junior College").
  pub fn from_category(name: &str) -> Option<Self> {
    match name.trim() {
      "Primary" => Some(Stage::Primary),
      "Secondary" => Some(Stage::Secondary),
      "JC" | "Junior College" => Some(Stage::Jc),
      _ => None,
    }
  }

  pub fn level_name(self, year: u8) -> String {
    format!("{} {year}", self.label())
  }

  /// Every canonical level name in the stage, in order.
  pub fn level_names(self) -> impl Iterator<Item = String> {
    (1..=self.max_year()).map(move |year| self.level_name(year))
  }

  fn contains(self, year: u8) -> bool { (1..=self.max_year()).contains(&year) }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// The reading of one level-range token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelRange {
  /// Canonical level names. `ambiguous` is set for a slash list whose members
  /// are not consecutive years of one stage (`Sec1/Sec4`).
  Levels { names: Vec<String>, ambiguous: bool },
  /// The literal `UNKNOWN`, or no range at all.
  Unknown,
  /// Anything the grammar does not accept.
  Unparseable,
}

/// Parse a single level such as `P3`, `Sec 2`, `J1` or `Primary 6`.
pub fn parse_single(token: &str) -> Option<(Stage, u8)> {
  let caps = SINGLE.captures(token.trim())?;
  let stage = Stage::from_prefix(&caps[1])?;
  let year: u8 = caps[2].parse().ok()?;
  stage.contains(year).then_some((stage, year))
}

/// Parse a level-range token.
///
/// - `P1-P6` / `P1-6`: inclusive range; a second prefix must name the same
///   stage.
/// - `Sec1/Sec2`: exactly the listed levels, never a range.
/// - `J1`: a single level.
/// - blank or `UNKNOWN`: [`LevelRange::Unknown`].
pub fn parse_level_range(token: &str) -> LevelRange {
  let token = token.trim();
  if token.is_empty() || token.eq_ignore_ascii_case("unknown") {
    return LevelRange::Unknown;
  }

  if token.contains('/') {
    return parse_slash_list(token);
  }

  if let Some(caps) = RANGE.captures(token) {
    let Some(stage) = Stage::from_prefix(&caps[1]) else {
      return LevelRange::Unparseable;
    };
    let second = caps.get(3).map(|m| Stage::from_prefix(m.as_str()));
    if second.is_some_and(|second| second != Some(stage)) {
      return LevelRange::Unparseable;
    }
    let (Ok(from), Ok(to)) = (caps[2].parse::<u8>(), caps[4].parse::<u8>())
    else {
      return LevelRange::Unparseable;
    };
    if from > to || !stage.contains(from) || !stage.contains(to) {
      return LevelRange::Unparseable;
    }
    let names = (from..=to).map(|year| stage.level_name(year)).collect();
    return LevelRange::Levels { names, ambiguous: false };
  }

  match parse_single(token) {
    Some((stage, year)) => LevelRange::Levels {
      names:     vec![stage.level_name(year)],
      ambiguous: false,
    },
    None => LevelRange::Unparseable,
  }
}

fn parse_slash_list(token: &str) -> LevelRange {
  let mut parsed = Vec::new();
  for part in token.split('/') {
    match parse_single(part) {
      Some(level) => parsed.push(level),
      None => return LevelRange::Unparseable,
    }
  }
  parsed.sort();
  parsed.dedup();

  let ambiguous = parsed
    .windows(2)
    .any(|pair| pair[0].0 == pair[1].0 && pair[1].1 - pair[0].1 != 1);
  let names = parsed
    .into_iter()
    .map(|(stage, year)| stage.level_name(year))
    .collect();
  LevelRange::Levels { names, ambiguous }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Academic ordering for level names: Primary, Secondary, JC by year, then
/// any other names alphabetically.
pub fn compare_levels(a: &str, b: &str) -> Ordering {
  let rank = |name: &str| {
    Stage::ALL
      .iter()
      .find_map(|stage| {
        let year = name.strip_prefix(stage.label())?.trim().parse::<u8>().ok()?;
        Some((*stage as u8, year))
      })
      .unwrap_or((u8::MAX, 0))
  };
  rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}
