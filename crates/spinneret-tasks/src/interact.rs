//! Selector-driven page interaction tasks.

use std::time::Duration;

use async_trait::async_trait;
use spinneret_engine::{ExecutionContext, TaskError, TaskExecutor};

use crate::catalog::params;

const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

fn missing(name: &str) -> TaskError {
  TaskError::MissingInput {
    name: name.to_string(),
  }
}

/// Sets the value of a form element.
pub struct FillInputExecutor;

#[async_trait]
impl TaskExecutor for FillInputExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let page = ctx.page().ok_or_else(|| missing(params::WEB_PAGE))?;
    let selector = ctx
      .string_input(params::SELECTOR)
      .ok_or_else(|| missing(params::SELECTOR))?
      .to_string();
    let value = ctx
      .string_input(params::VALUE)
      .ok_or_else(|| missing(params::VALUE))?
      .to_string();

    page.fill(&selector, &value).await?;
    ctx.log().info(format!("filled '{selector}'"));
    Ok(())
  }
}

/// Clicks the first element matching a selector.
pub struct ClickElementExecutor;

#[async_trait]
impl TaskExecutor for ClickElementExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let page = ctx.page().ok_or_else(|| missing(params::WEB_PAGE))?;
    let selector = ctx
      .string_input(params::SELECTOR)
      .ok_or_else(|| missing(params::SELECTOR))?
      .to_string();

    page.click(&selector).await?;
    ctx.log().info(format!("clicked '{selector}'"));
    Ok(())
  }
}

/// Waits for an element to become visible (or hidden).
pub struct WaitForElementExecutor;

#[async_trait]
impl TaskExecutor for WaitForElementExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let page = ctx.page().ok_or_else(|| missing(params::WEB_PAGE))?;
    let selector = ctx
      .string_input(params::SELECTOR)
      .ok_or_else(|| missing(params::SELECTOR))?
      .to_string();

    let visible = match ctx.string_input(params::VISIBILITY) {
      None | Some("visible") => true,
      Some("hidden") => false,
      Some(other) => {
        return Err(TaskError::InvalidInput {
          name: params::VISIBILITY.to_string(),
          message: format!("expected 'visible' or 'hidden', got '{other}'"),
        });
      }
    };

    page
      .wait_for_selector(&selector, visible, WAIT_TIMEOUT)
      .await?;
    ctx.log().info(format!(
      "'{selector}' became {}",
      if visible { "visible" } else { "hidden" }
    ));
    Ok(())
  }
}

/// Scrolls the first matching element into view.
pub struct ScrollToElementExecutor;

#[async_trait]
impl TaskExecutor for ScrollToElementExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let page = ctx.page().ok_or_else(|| missing(params::WEB_PAGE))?;
    let selector = ctx
      .string_input(params::SELECTOR)
      .ok_or_else(|| missing(params::SELECTOR))?
      .to_string();

    page.scroll_to(&selector).await?;
    ctx.log().info(format!("scrolled to '{selector}'"));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::json;

  use super::*;
  use crate::catalog::task_types;
  use crate::test_util::{Fixture, MockPage};

  #[tokio::test]
  async fn fill_passes_selector_and_value() {
    let page = Arc::new(MockPage::default());
    let mut fixture = Fixture::new(task_types::FILL_INPUT)
      .with_page(page.clone())
      .with_input(params::SELECTOR, json!("#search"))
      .with_input(params::VALUE, json!("rust"));

    FillInputExecutor.run(&mut fixture.ctx()).await.unwrap();
    assert_eq!(*page.calls.lock().unwrap(), ["fill #search=rust"]);
  }

  #[tokio::test]
  async fn click_missing_element_fails() {
    let page = Arc::new(MockPage::default());
    let mut fixture = Fixture::new(task_types::CLICK_ELEMENT)
      .with_page(page)
      .with_input(params::SELECTOR, json!("#absent"));

    let err = ClickElementExecutor.run(&mut fixture.ctx()).await.unwrap_err();
    assert!(matches!(err, TaskError::Browser(_)));
  }

  #[tokio::test]
  async fn wait_defaults_to_visible() {
    let page = Arc::new(MockPage::default());
    let mut fixture = Fixture::new(task_types::WAIT_FOR_ELEMENT)
      .with_page(page.clone())
      .with_input(params::SELECTOR, json!(".banner"));

    WaitForElementExecutor.run(&mut fixture.ctx()).await.unwrap();
    assert_eq!(*page.calls.lock().unwrap(), ["wait .banner visible=true"]);
  }

  #[tokio::test]
  async fn wait_rejects_unknown_visibility() {
    let page = Arc::new(MockPage::default());
    let mut fixture = Fixture::new(task_types::WAIT_FOR_ELEMENT)
      .with_page(page)
      .with_input(params::SELECTOR, json!(".banner"))
      .with_input(params::VISIBILITY, json!("sideways"));

    let err = WaitForElementExecutor
      .run(&mut fixture.ctx())
      .await
      .unwrap_err();
    assert!(matches!(err, TaskError::InvalidInput { .. }));
  }
}
