//! Change-impact classification over a [`DiffResult`].
//!
//! Sections are the top-level keys of the compiled document. Whether a
//! section is high impact is decided by a fixed table, not by configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{diff::DiffResult, path};

/// Sections that define what the product is and what it promises.
pub const HIGH_IMPACT_SECTIONS: &[&str] = &[
  "product",
  "goals",
  "requirements",
  "architecture",
  "data_model",
  "interfaces",
  "constraints",
];

/// Section name used when the document root itself changed type.
pub const ROOT_SECTION: &str = "/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
  /// Every touched section, sorted.
  pub affected_sections: Vec<String>,
  pub high_impact:       Vec<String>,
  pub low_impact:        Vec<String>,
}

pub fn is_high_impact(section: &str) -> bool {
  section == ROOT_SECTION || HIGH_IMPACT_SECTIONS.contains(&section)
}

pub fn analyze_impact(result: &DiffResult) -> ImpactReport {
  let sections: BTreeSet<String> = result
    .changes
    .iter()
    .map(|c| path::top_level_segment(&c.path).unwrap_or_else(|| ROOT_SECTION.to_owned()))
    .collect();

  let (high, low): (Vec<String>, Vec<String>) = sections
    .iter()
    .cloned()
    .partition(|s| is_high_impact(s));

  ImpactReport {
    affected_sections: sections.into_iter().collect(),
    high_impact:       high,
    low_impact:        low,
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;
  use crate::diff::diff;

  #[test]
  fn sections_are_deduplicated_and_split() {
    let base = json!({
      "requirements": ["r1", "r2"],
      "glossary": { "a": "x" },
      "product": { "name": "old" }
    });
    let target = json!({
      "requirements": ["r1", "r2 changed", "r3"],
      "glossary": { "a": "y", "b": "z" },
      "product": { "name": "old" }
    });

    let report = analyze_impact(&diff(&base, &target));
    assert_eq!(report.affected_sections, vec!["glossary", "requirements"]);
    assert_eq!(report.high_impact, vec!["requirements"]);
    assert_eq!(report.low_impact, vec!["glossary"]);
  }

  #[test]
  fn no_changes_no_sections() {
    let doc = json!({ "goals": ["g"] });
    assert_eq!(analyze_impact(&diff(&doc, &doc)), ImpactReport::default());
  }

  #[test]
  fn root_replacement_is_high_impact() {
    let report = analyze_impact(&diff(&json!({ "a": 1 }), &json!([1])));
    assert_eq!(report.high_impact, vec![ROOT_SECTION]);
  }
}
