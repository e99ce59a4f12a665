//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single left-to-right pass; substituted text is never scanned again, so
/// user text containing `{...}` stays literal. Unknown `{...}` are kept as-is
/// (prompt templates carry JSON examples).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(start) = rest.find('{') {
    out.push_str(&rest[..start]);
    let after = &rest[start + 1..];
    let replaced = after.find('}').and_then(|end| {
      let key = &after[..end];
      pairs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| (*v, end))
    });
    match replaced {
      Some((value, end)) => {
        out.push_str(value);
        rest = &after[end + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Strip a Markdown code fence around a JSON reply, if any.
/// Some providers wrap `application/json` output in ```json ... ```.
pub fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  let Some(inner) = t.strip_prefix("```") else { return t };
  let inner = match inner.get(..4) {
    Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
    _ => inner,
  };
  inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((idx, _)) => format!("{}… ({} bytes total)", &s[..idx], s.len()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_known_keys_and_keeps_json_braces() {
    let tpl = r#"Text: "{text}" -> {"answer": "B"} ({difficulty})"#;
    let out = fill_template(tpl, &[("text", "Hi"), ("difficulty", "hard")]);
    assert_eq!(out, r#"Text: "Hi" -> {"answer": "B"} (hard)"#);
  }

  #[test]
  fn substituted_values_are_not_rescanned() {
    let out = fill_template("{a}|{b}", &[("a", "{b}"), ("b", "x")]);
    assert_eq!(out, "{b}|x");
  }

  #[test]
  fn unmatched_brace_is_literal() {
    assert_eq!(fill_template("open { only", &[("x", "y")]), "open { only");
  }

  #[test]
  fn strips_json_fence() {
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    assert_eq!(strip_code_fence("```JSON\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```Json {\"a\":1}```"), "{\"a\":1}");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    assert!(trunc_for_log("ééééé", 2).starts_with("éé…"));
  }
}
