//! Subject canonicalization.
//!
//! Spreadsheet exports spell subjects many ways and mix in programme names
//! and syllabus topics. [`canonical_subject`] maps each raw name onto a
//! parent-facing academic subject, rejects known non-subjects, and passes
//! anything else through untouched so the centre can be reviewed.

use std::{
  collections::{BTreeSet, HashMap},
  sync::LazyLock,
};

/// Raw name → canonical subject. `None` marks a known non-subject.
const ALIASES: &[(&str, Option<&str>)] = &[
  // Mathematics
  ("Math", Some("Mathematics")),
  ("Maths", Some("Mathematics")),
  ("Mathematics", Some("Mathematics")),
  ("Mathematics (GEP)", Some("Mathematics")),
  ("Mathematics (IP)", Some("Mathematics")),
  ("Mathematics (IB Diploma HL/SL)", Some("Mathematics")),
  ("Express Math", Some("Mathematics")),
  ("IP Math", Some("Mathematics")),
  ("Excellence in Mathematics", Some("Mathematics")),
  ("MATHS TUITION", Some("Mathematics")),
  ("IGCSE High School Mathematics", Some("Mathematics")),
  ("E Math", Some("Elementary Mathematics")),
  ("E-Math", Some("Elementary Mathematics")),
  ("Elementary Math", Some("Elementary Mathematics")),
  ("Elementary Mathematics", Some("Elementary Mathematics")),
  ("Elementary Mathematics (O Level)", Some("Elementary Mathematics")),
  ("IGCSE E-Math", Some("Elementary Mathematics")),
  ("A Math", Some("Additional Mathematics")),
  ("A-Math", Some("Additional Mathematics")),
  ("A- Math", Some("Additional Mathematics")),
  ("Additional Math", Some("Additional Mathematics")),
  ("Additional Mathematics", Some("Additional Mathematics")),
  ("Additional Mathematics (O Level)", Some("Additional Mathematics")),
  ("IGCSE A- Math", Some("Additional Mathematics")),
  ("Excellence in Additional Mathematics", Some("Additional Mathematics")),
  // Languages
  ("English", Some("English")),
  ("English (O level)", Some("English")),
  ("English (IP)", Some("English")),
  ("Express English", Some("English")),
  ("IP English", Some("English")),
  ("Excellence in English", Some("English")),
  ("Excellence in English (IP)", Some("English")),
  ("Chinese", Some("Chinese")),
  ("Chinese (Normal/Express/HCL)", Some("Chinese")),
  ("Higher Chinese", Some("Chinese")),
  ("O Level Higher Chinese", Some("Chinese")),
  ("Tamil", Some("Tamil")),
  // Sciences
  ("Science", Some("Science")),
  ("Science (GEP)", Some("Science")),
  ("Science (IP)", Some("Science")),
  ("Science (IB Diploma HL/SL)", Some("Science")),
  ("Science (Chem/Physics)", Some("Science")),
  ("IP/Express Science", Some("Science")),
  ("Express Science", Some("Science")),
  ("IP Science", Some("Science")),
  ("Science and Mathematics", Some("Science")),
  ("Excellence in Science", Some("Science")),
  ("Combined Science", Some("Combined Science")),
  ("Combined Science (Physics / Chemistry)", Some("Combined Science")),
  ("Combined", Some("Combined Science")),
  ("IGCSE Combined", Some("Combined Science")),
  ("Physics", Some("Physics")),
  ("Pure Physics", Some("Physics")),
  ("Physics (O Level)", Some("Physics")),
  ("Physics (IP)", Some("Physics")),
  ("Physics (IB Diploma HL/SL)", Some("Physics")),
  ("Secondary Physics", Some("Physics")),
  ("IGCSE Pure", Some("Physics")),
  ("Chemistry", Some("Chemistry")),
  ("Pure Chemistry", Some("Chemistry")),
  ("Chemistry (O Level)", Some("Chemistry")),
  ("Chemistry (IP)", Some("Chemistry")),
  ("Chemistry (IB Diploma HL/SL)", Some("Chemistry")),
  ("Biology", Some("Biology")),
  ("Pure Biology", Some("Biology")),
  ("Biology (O Level)", Some("Biology")),
  ("Biology (IP)", Some("Biology")),
  ("Biology (IB Diploma HL/SL)", Some("Biology")),
  ("Biology)", Some("Biology")),
  // Humanities
  ("Economics", Some("Economics")),
  ("General Paper", Some("General Paper")),
  ("General Paper (GP)", Some("General Paper")),
  ("General Paper English", Some("General Paper")),
  ("Principles of Accounting", Some("Accounting")),
  ("Principle of Accounts (POA)", Some("Accounting")),
  ("POA", Some("Accounting")),
  ("Accounting", Some("Accounting")),
  ("Geography", Some("Geography")),
  ("History", Some("History")),
  ("Literature", Some("Literature")),
  ("Literature in English", Some("Literature")),
  ("Social Studies", Some("Social Studies")),
  ("China Studies in English", Some("China Studies")),
  // Programmes and workshops
  ("Chinese 4Cs", None),
  ("Higher Chinese 4Cs", None),
  ("PSLE A* Writer", None),
  ("P1 Mighty Reader", None),
  ("P5 & 6 Sci Boost", None),
  ("P5 Math-Booster", None),
  ("P6 Science Mock Exam", None),
  ("PSLE Mathematics Preparation", None),
  ("Young Science Explorers", None),
  ("S4 AMath Intensive Revision", None),
  ("S4 Pure Physics Intensive Revision", None),
  ("Chinese Enrichment", None),
  ("Chinese Language Enrichment Program", None),
  ("Chinese Public Speaking", None),
  ("Chinese Essay Writing", None),
  ("Chinese Workshop", None),
  ("English Workshop", None),
  ("Master Chinese for Exams & Beyond", None),
  ("Excellence in Writing", None),
  // Skill components
  ("Creative Writing", None),
  ("Comprehension", None),
  ("Grammar and Sentence Construction", None),
  ("Oral", None),
  ("Vocabulary", None),
  ("Paper 1", None),
  ("Paper 2", None),
  // Syllabus topics
  ("Numbers", None),
  ("Money", None),
  ("Measurement and Geometry", None),
  ("Statistics", None),
  ("Factors and Multiples", None),
  ("Four Operations", None),
  ("Fractions", None),
  ("Decimals", None),
  ("Time and Area", None),
  ("Algebra", None),
  ("Computational Fluency", None),
  ("Times Tables", None),
  ("Fractions and Decimals", None),
  ("Reasoning", None),
  ("Problem Solving", None),
  ("Positive and Negative Numbers", None),
  ("Ratio", None),
  ("Fractions and Percentages", None),
  ("Equations", None),
  ("Graphing", None),
  // Category labels and fragments
  ("Primary", None),
  ("Secondary", None),
  ("H1", None),
  ("H2", None),
  ("IB SL", None),
  ("IB HL", None),
  ("Sciences (Physics", None),
  ("Pure", None),
];

static EXACT: LazyLock<HashMap<&'static str, Option<&'static str>>> =
  LazyLock::new(|| ALIASES.iter().copied().collect());

static FOLDED: LazyLock<HashMap<String, Option<&'static str>>> =
  LazyLock::new(|| {
    ALIASES
      .iter()
      .map(|(raw, canonical)| (raw.to_lowercase(), *canonical))
      .collect()
  });

/// Outcome of canonicalizing one raw subject name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectName {
  Canonical(String),
  /// A programme, topic or label that is not an academic subject.
  NotASubject,
  /// Not in the alias table; carries the whitespace-collapsed raw name.
  Unmapped(String),
}

/// Map a raw subject name to its canonical form. Exact lookup first, then
/// case-insensitive.
pub fn canonical_subject(raw: &str) -> SubjectName {
  let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
  let hit = EXACT
    .get(cleaned.as_str())
    .or_else(|| FOLDED.get(&cleaned.to_lowercase()));
  match hit {
    Some(Some(canonical)) => SubjectName::Canonical((*canonical).to_owned()),
    Some(None) => SubjectName::NotASubject,
    None => SubjectName::Unmapped(cleaned),
  }
}

/// Every canonical subject the alias table can produce, sorted.
pub fn canonical_subjects() -> BTreeSet<&'static str> {
  ALIASES.iter().filter_map(|(_, canonical)| *canonical).collect()
}
