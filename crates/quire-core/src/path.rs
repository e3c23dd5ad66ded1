//! JSON pointer (RFC 6901) helpers shared by the trace model and the diff
//! engine. The document root is the empty string; `/a/0/b` addresses key `b`
//! of the first element of array `a`.

/// Append one reference token to `base`, escaping `~` and `/`.
pub fn push(base: &str, token: &str) -> String {
  let escaped = token.replace('~', "~0").replace('/', "~1");
  format!("{base}/{escaped}")
}

/// Append an array index to `base`.
pub fn push_index(base: &str, index: usize) -> String { format!("{base}/{index}") }

/// Split a pointer into unescaped reference tokens.
pub fn tokens(path: &str) -> Vec<String> {
  if path.is_empty() {
    return Vec::new();
  }
  path
    .trim_start_matches('/')
    .split('/')
    .map(|t| t.replace("~1", "/").replace("~0", "~"))
    .collect()
}

/// The unescaped first token of `path`, i.e. the document section it lives
/// in. `None` for the root pointer.
pub fn top_level_segment(path: &str) -> Option<String> {
  tokens(path).into_iter().next()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn push_escapes_special_characters() {
    assert_eq!(push("", "a/b"), "/a~1b");
    assert_eq!(push("/x", "m~n"), "/x/m~0n");
  }

  #[test]
  fn tokens_unescape() {
    assert_eq!(tokens("/a~1b/0/m~0n"), vec!["a/b", "0", "m~n"]);
    assert!(tokens("").is_empty());
  }

  #[test]
  fn top_level_segment_of_nested_path() {
    assert_eq!(top_level_segment("/goals/0/text").as_deref(), Some("goals"));
    assert_eq!(top_level_segment(""), None);
  }
}
