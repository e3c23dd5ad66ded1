//! Starter questions seeded into every new project.

use quire_core::question::{NewQuestion, QuestionKind};
use uuid::Uuid;

pub fn starter_questions(project_id: Uuid) -> Vec<NewQuestion> {
  let q = |text: &str, kind: QuestionKind, priority: i32, paths: &[&str], tags: &[&str]| NewQuestion {
    priority,
    spec_paths: paths.iter().map(|p| p.to_string()).collect(),
    tags: tags.iter().map(|t| t.to_string()).collect(),
    ..NewQuestion::new(project_id, text, kind)
  };

  vec![
    q(
      "What is the product called, and what does it do in one sentence?",
      QuestionKind::Freeform,
      0,
      &["/product/name", "/product/summary"],
      &["product"],
    ),
    q(
      "What problem does it solve, and for whom?",
      QuestionKind::Freeform,
      1,
      &["/product/problem", "/users"],
      &["product", "users"],
    ),
    q(
      "What must be true for the first release to count as a success?",
      QuestionKind::Freeform,
      2,
      &["/goals"],
      &["goals"],
    ),
    q(
      "Where does it need to run?",
      QuestionKind::Multi,
      3,
      &["/constraints/platforms"],
      &["constraints"],
    )
    .with_options(["web", "ios", "android", "desktop", "command line", "server api"]),
    q(
      "How many people will use it in the first year?",
      QuestionKind::Single,
      4,
      &["/constraints/scale"],
      &["constraints"],
    )
    .with_options(["just me", "a small team", "hundreds", "thousands", "millions"]),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starter_questions_are_valid() {
    let project = Uuid::new_v4();
    let questions = starter_questions(project);
    assert_eq!(questions.len(), 5);
    for q in questions {
      assert_eq!(q.project_id, project);
      q.normalize().unwrap();
    }
  }
}
