use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::FormatEngine;
use crate::configuration::FormatOptions;
use crate::loader::LoaderContext;

pub const IGNORE_MARKER: &str = "// prettier-ignore";

/// A tiny deterministic formatter for statements like `a().b("c")`.
///
/// It normalizes string quotes, adds semicolons, breaks member chains that
/// don't fit in the print width and leaves the statement after an ignore
/// marker alone. Formatting its own output is a no-op.
#[derive(Default)]
pub struct TestFormatEngine {
  format_count: AtomicUsize,
}

impl TestFormatEngine {
  pub fn new() -> Self {
    Self::default()
  }

  /// How many times `format_text` was called.
  pub fn format_count(&self) -> usize {
    self.format_count.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl FormatEngine for TestFormatEngine {
  fn name(&self) -> &str {
    "test-engine"
  }

  async fn format_text(&self, file_text: &str, options: &FormatOptions) -> Result<String> {
    self.format_count.fetch_add(1, Ordering::SeqCst);
    format_test_text(file_text, &TestEngineOptions::new(options))
  }

  async fn check(&self, file_text: &str, options: &FormatOptions) -> Result<bool> {
    Ok(format_test_text(file_text, &TestEngineOptions::new(options))? == file_text)
  }
}

struct TestEngineOptions {
  print_width: usize,
  indent: String,
  quote: char,
  semi: bool,
}

impl TestEngineOptions {
  fn new(options: &FormatOptions) -> Self {
    let tab_width = options.get_u64("tabWidth").unwrap_or(2) as usize;
    Self {
      print_width: options.get_u64("printWidth").unwrap_or(80) as usize,
      indent: if options.get_bool("useTabs").unwrap_or(false) {
        "\t".to_string()
      } else {
        " ".repeat(tab_width)
      },
      quote: if options.get_bool("singleQuote").unwrap_or(false) { '\'' } else { '"' },
      semi: options.get_bool("semi").unwrap_or(true),
    }
  }
}

fn format_test_text(file_text: &str, options: &TestEngineOptions) -> Result<String> {
  let lines = file_text.lines().collect::<Vec<_>>();
  let mut output: Vec<String> = Vec::new();
  let mut ignore_next = false;
  let mut index = 0;

  while index < lines.len() {
    let trimmed = lines[index].trim();
    if trimmed.is_empty() {
      if output.last().is_some_and(|line| !line.is_empty()) {
        output.push(String::new());
      }
      index += 1;
      continue;
    }
    if trimmed.starts_with("//") {
      ignore_next = trimmed == IGNORE_MARKER;
      output.push(trimmed.to_string());
      index += 1;
      continue;
    }

    // a statement continues while brackets are open or the next line continues a member chain
    let start = index;
    let mut depth = 0;
    loop {
      depth += bracket_depth_change(lines[index], index)?;
      if depth < 0 {
        bail!("Unexpected closing bracket on line {}.", index + 1);
      }
      index += 1;
      if index >= lines.len() || (depth == 0 && !lines[index].trim_start().starts_with('.')) {
        break;
      }
    }
    if depth != 0 {
      bail!("Unexpected end of input. Unclosed bracket starting on line {}.", start + 1);
    }

    if ignore_next {
      output.extend(lines[start..index].iter().map(|line| line.to_string()));
      ignore_next = false;
      continue;
    }

    let joined = lines[start..index].iter().map(|line| line.trim()).collect::<String>();
    for statement in split_statements(&joined) {
      output.extend(format_statement(statement, options));
    }
  }

  while output.last().is_some_and(|line| line.is_empty()) {
    output.pop();
  }
  if output.is_empty() {
    return Ok(String::new());
  }
  let mut text = output.join("\n");
  text.push('\n');
  Ok(text)
}

/// Walks `text` calling `on_char` for every character outside of string literals.
fn for_each_code_char(text: &str, mut on_char: impl FnMut(usize, char)) -> Result<()> {
  let mut in_string: Option<char> = None;
  let mut escaped = false;
  for (char_index, c) in text.char_indices() {
    if let Some(quote) = in_string {
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == quote {
        in_string = None;
      }
    } else if c == '"' || c == '\'' {
      in_string = Some(c);
    } else {
      on_char(char_index, c);
    }
  }
  if in_string.is_some() {
    bail!("Unterminated string literal.");
  }
  Ok(())
}

fn bracket_depth_change(line: &str, line_index: usize) -> Result<i32> {
  let mut depth = 0;
  for_each_code_char(line, |_, c| match c {
    '(' | '[' | '{' => depth += 1,
    ')' | ']' | '}' => depth -= 1,
    _ => {}
  })
  .with_context(|| format!("Failed on line {}.", line_index + 1))?;
  Ok(depth)
}

fn split_statements(text: &str) -> Vec<&str> {
  let mut statements = Vec::new();
  let mut start = 0;
  let mut depth = 0;
  // strings were validated when the lines were collected
  let _ = for_each_code_char(text, |char_index, c| match c {
    '(' | '[' | '{' => depth += 1,
    ')' | ']' | '}' => depth -= 1,
    ';' if depth == 0 => {
      statements.push(&text[start..char_index]);
      start = char_index + 1;
    }
    _ => {}
  });
  statements.push(&text[start..]);
  statements.into_iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect()
}

fn format_statement(statement: &str, options: &TestEngineOptions) -> Vec<String> {
  let statement = normalize_quotes(statement, options.quote);
  let terminator = if options.semi { ";" } else { "" };
  let single_line = format!("{}{}", statement, terminator);
  if single_line.chars().count() <= options.print_width {
    return vec![single_line];
  }

  let segments = split_member_chain(&statement);
  if segments.len() < 2 {
    return vec![single_line];
  }
  let mut lines = Vec::with_capacity(segments.len());
  lines.push(segments[0].to_string());
  for segment in &segments[1..] {
    lines.push(format!("{}{}", options.indent, segment));
  }
  if let Some(last) = lines.last_mut() {
    last.push_str(terminator);
  }
  lines
}

/// Splits before each `.` that directly follows a call at the top level.
fn split_member_chain(statement: &str) -> Vec<&str> {
  let mut segments = Vec::new();
  let mut start = 0;
  let mut depth = 0;
  let mut last_code_char = ' ';
  let _ = for_each_code_char(statement, |char_index, c| {
    match c {
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => depth -= 1,
      '.' if depth == 0 && last_code_char == ')' => {
        segments.push(&statement[start..char_index]);
        start = char_index;
      }
      _ => {}
    }
    last_code_char = c;
  });
  segments.push(&statement[start..]);
  segments
}

fn normalize_quotes(statement: &str, preferred_quote: char) -> String {
  let mut result = String::with_capacity(statement.len());
  let mut chars = statement.chars();
  while let Some(c) = chars.next() {
    if c != '"' && c != '\'' {
      result.push(c);
      continue;
    }
    let mut content = String::new();
    let mut escaped = false;
    for inner in chars.by_ref() {
      if escaped {
        escaped = false;
      } else if inner == '\\' {
        escaped = true;
      } else if inner == c {
        break;
      }
      content.push(inner);
    }
    let quote = if content.contains(preferred_quote) || content.contains('\\') {
      c
    } else {
      preferred_quote
    };
    result.push(quote);
    result.push_str(&content);
    result.push(quote);
  }
  result
}

/// A host context for driving a single stage in tests.
pub struct TestLoaderContext {
  context: PathBuf,
  root_context: PathBuf,
  resource_path: PathBuf,
  options: Value,
  stage_names: Vec<String>,
  stage_index: usize,
  cacheable: Mutex<Option<bool>>,
  warnings: Mutex<Vec<String>>,
}

impl TestLoaderContext {
  pub fn new(resource_path: impl AsRef<Path>, options: Value) -> Self {
    let resource_path = resource_path.as_ref().to_path_buf();
    Self {
      context: resource_path.parent().map(|p| p.to_path_buf()).unwrap_or_default(),
      root_context: PathBuf::from("/project"),
      resource_path,
      options,
      stage_names: Vec::new(),
      stage_index: 0,
      cacheable: Default::default(),
      warnings: Default::default(),
    }
  }

  pub fn with_root_context(mut self, root_context: impl AsRef<Path>) -> Self {
    self.root_context = root_context.as_ref().to_path_buf();
    self
  }

  /// Sets the rule's chain and the position of the stage under test in it.
  pub fn with_stage_names(mut self, stage_names: &[&str], stage_index: usize) -> Self {
    self.stage_names = stage_names.iter().map(|name| name.to_string()).collect();
    self.stage_index = stage_index;
    self
  }

  pub fn was_marked_cacheable(&self) -> bool {
    *self.cacheable.lock() == Some(true)
  }

  pub fn warnings(&self) -> Vec<String> {
    self.warnings.lock().clone()
  }
}

impl LoaderContext for TestLoaderContext {
  fn context(&self) -> &Path {
    &self.context
  }

  fn root_context(&self) -> &Path {
    &self.root_context
  }

  fn resource_path(&self) -> &Path {
    &self.resource_path
  }

  fn options(&self) -> &Value {
    &self.options
  }

  fn cacheable(&self, flag: bool) {
    *self.cacheable.lock() = Some(flag);
  }

  fn emit_warning(&self, message: String) {
    self.warnings.lock().push(message);
  }

  fn is_followed_by(&self, name: &str) -> bool {
    self.stage_names.iter().skip(self.stage_index + 1).any(|stage_name| stage_name == name)
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn options(value: Value) -> FormatOptions {
    serde_json::from_value(value).unwrap()
  }

  #[tokio::test]
  async fn breaks_long_member_chains() {
    let engine = TestFormatEngine::new();
    let text = format!("{}long(\"chaining\")", "very().".repeat(20));
    let formatted = engine.format_text(&text, &options(json!({ "singleQuote": true }))).await.unwrap();
    let mut expected = String::from("very()\n");
    for _ in 0..19 {
      expected.push_str("  .very()\n");
    }
    expected.push_str("  .long('chaining');\n");
    assert_eq!(formatted, expected);
    assert!(engine.check(&formatted, &options(json!({ "singleQuote": true }))).await.unwrap());
    assert!(!engine.check(&formatted, &options(json!({ "tabWidth": 8 }))).await.unwrap());
    assert_eq!(engine.format_count(), 1);
  }

  #[tokio::test]
  async fn keeps_statement_after_ignore_marker() {
    let engine = TestFormatEngine::new();
    let text = "// prettier-ignore\nconst   x = 'keep'\nfoo('a')\n";
    let formatted = engine.format_text(text, &FormatOptions::new()).await.unwrap();
    assert_eq!(formatted, "// prettier-ignore\nconst   x = 'keep'\nfoo(\"a\");\n");
  }

  #[tokio::test]
  async fn fails_on_unbalanced_input() {
    let engine = TestFormatEngine::new();
    assert!(engine.format_text("foo(", &FormatOptions::new()).await.is_err());
    assert!(engine.format_text("foo('a)", &FormatOptions::new()).await.is_err());
    assert!(engine.format_text("foo())", &FormatOptions::new()).await.is_err());
  }
}
