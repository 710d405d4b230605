//! Text extraction from captured markup.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::json;
use spinneret_engine::{ExecutionContext, TaskError, TaskExecutor};

use crate::catalog::params;

/// Extracts the text content of the first element matching a selector.
///
/// Works on captured markup, not the live page, so it can run after the
/// browser has moved on.
pub struct ExtractTextFromElementExecutor;

#[async_trait]
impl TaskExecutor for ExtractTextFromElementExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let html = ctx
      .string_input(params::HTML)
      .ok_or_else(|| TaskError::MissingInput {
        name: params::HTML.to_string(),
      })?;
    let selector_input =
      ctx
        .string_input(params::SELECTOR)
        .ok_or_else(|| TaskError::MissingInput {
          name: params::SELECTOR.to_string(),
        })?;

    let selector = Selector::parse(selector_input).map_err(|e| TaskError::InvalidInput {
      name: params::SELECTOR.to_string(),
      message: e.to_string(),
    })?;

    let document = Html::parse_document(html);
    let element = document
      .select(&selector)
      .next()
      .ok_or_else(|| TaskError::Failed(format!("no element matches '{selector_input}'")))?;

    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
      return Err(TaskError::Failed(format!(
        "element '{selector_input}' has no text"
      )));
    }

    ctx.set_output(params::EXTRACTED_TEXT, json!(text));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::catalog::task_types;
  use crate::test_util::Fixture;

  const PAGE: &str = r#"<html><body>
    <h1 class="title">Hello <b>World</b></h1>
    <p id="empty"></p>
  </body></html>"#;

  #[tokio::test]
  async fn extracts_and_normalizes_text() {
    let mut fixture = Fixture::new(task_types::EXTRACT_TEXT_FROM_ELEMENT)
      .with_input(params::HTML, json!(PAGE))
      .with_input(params::SELECTOR, json!(".title"));

    ExtractTextFromElementExecutor
      .run(&mut fixture.ctx())
      .await
      .unwrap();

    assert_eq!(
      fixture.output(params::EXTRACTED_TEXT),
      Some(&json!("Hello World"))
    );
  }

  #[tokio::test]
  async fn missing_element_fails() {
    let mut fixture = Fixture::new(task_types::EXTRACT_TEXT_FROM_ELEMENT)
      .with_input(params::HTML, json!(PAGE))
      .with_input(params::SELECTOR, json!(".nope"));

    let err = ExtractTextFromElementExecutor
      .run(&mut fixture.ctx())
      .await
      .unwrap_err();
    assert!(matches!(err, TaskError::Failed(_)));
  }

  #[tokio::test]
  async fn empty_element_fails() {
    let mut fixture = Fixture::new(task_types::EXTRACT_TEXT_FROM_ELEMENT)
      .with_input(params::HTML, json!(PAGE))
      .with_input(params::SELECTOR, json!("#empty"));

    let err = ExtractTextFromElementExecutor
      .run(&mut fixture.ctx())
      .await
      .unwrap_err();
    assert!(matches!(err, TaskError::Failed(_)));
  }

  #[tokio::test]
  async fn invalid_selector_is_invalid_input() {
    let mut fixture = Fixture::new(task_types::EXTRACT_TEXT_FROM_ELEMENT)
      .with_input(params::HTML, json!(PAGE))
      .with_input(params::SELECTOR, json!("???"));

    let err = ExtractTextFromElementExecutor
      .run(&mut fixture.ctx())
      .await
      .unwrap_err();
    assert!(matches!(err, TaskError::InvalidInput { .. }));
  }
}
