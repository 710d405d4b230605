//! Browser acquisition and page-level tasks.

use async_trait::async_trait;
use serde_json::json;
use spinneret_browser::{CdpBrowser, LaunchConfig};
use spinneret_engine::{ExecutionContext, TaskError, TaskExecutor};
use url::Url;

use crate::catalog::params;

fn missing(name: &str) -> TaskError {
  TaskError::MissingInput {
    name: name.to_string(),
  }
}

/// Launches the shared browser, opens a page, and navigates it to the
/// starting url. This is the catalog's entry point: it creates the resource
/// every later browser task consumes.
pub struct LaunchBrowserExecutor {
  config: LaunchConfig,
}

impl LaunchBrowserExecutor {
  pub fn new(config: LaunchConfig) -> Self {
    Self { config }
  }
}

impl Default for LaunchBrowserExecutor {
  fn default() -> Self {
    Self::new(LaunchConfig::default())
  }
}

#[async_trait]
impl TaskExecutor for LaunchBrowserExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let url = ctx
      .string_input(params::WEBSITE_URL)
      .ok_or_else(|| missing(params::WEBSITE_URL))?
      .to_string();
    Url::parse(&url).map_err(|e| TaskError::InvalidInput {
      name: params::WEBSITE_URL.to_string(),
      message: e.to_string(),
    })?;

    ctx.log().info(format!("launching browser for {url}"));
    let browser = CdpBrowser::launch(self.config.clone()).await?;
    // Register before opening the page so cleanup finds the browser even
    // when the remaining steps fail.
    ctx.set_browser(Box::new(browser));

    let page = match ctx.browser() {
      Some(browser) => browser.open_page().await?,
      None => return Err(TaskError::Failed("browser was not registered".to_string())),
    };
    page.navigate(&url).await?;
    ctx.set_page(page);

    ctx.log().info(format!("opened {url}"));
    Ok(())
  }
}

/// Navigates the shared page to a new url.
pub struct NavigateUrlExecutor;

#[async_trait]
impl TaskExecutor for NavigateUrlExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let page = ctx.page().ok_or_else(|| missing(params::WEB_PAGE))?;
    let url = ctx
      .string_input(params::URL)
      .ok_or_else(|| missing(params::URL))?
      .to_string();

    page.navigate(&url).await?;
    ctx.log().info(format!("visited {url}"));
    Ok(())
  }
}

/// Captures the page's full markup.
pub struct PageToHtmlExecutor;

#[async_trait]
impl TaskExecutor for PageToHtmlExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let page = ctx.page().ok_or_else(|| missing(params::WEB_PAGE))?;

    let html = page.html().await?;
    ctx
      .log()
      .info(format!("captured {} bytes of markup", html.len()));
    ctx.set_output(params::HTML, json!(html));
    Ok(())
  }
}

/// Captures a base64 png screenshot of the page.
pub struct TakeScreenshotExecutor;

#[async_trait]
impl TaskExecutor for TakeScreenshotExecutor {
  async fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), TaskError> {
    let page = ctx.page().ok_or_else(|| missing(params::WEB_PAGE))?;

    let data = page.screenshot().await?;
    ctx.set_output(params::SCREENSHOT, json!(data));
    ctx.log().info("captured screenshot");
    Ok(())
  }
}
