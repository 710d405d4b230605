//! The builtin task catalog.

use std::sync::Arc;

use spinneret_engine::ExecutorRegistry;
use spinneret_task::{InputDef, OutputDef, ParamKind, TaskDefinition, TaskRegistry};

use crate::browse::{
  LaunchBrowserExecutor, NavigateUrlExecutor, PageToHtmlExecutor, TakeScreenshotExecutor,
};
use crate::data::{AddPropertyToJsonExecutor, ReadPropertyFromJsonExecutor};
use crate::deliver::DeliverViaWebhookExecutor;
use crate::extract::ExtractTextFromElementExecutor;
use crate::interact::{
  ClickElementExecutor, FillInputExecutor, ScrollToElementExecutor, WaitForElementExecutor,
};
use crate::timing::DelayExecutor;

/// Task-type identifiers.
pub mod task_types {
  pub const LAUNCH_BROWSER: &str = "LAUNCH_BROWSER";
  pub const NAVIGATE_URL: &str = "NAVIGATE_URL";
  pub const PAGE_TO_HTML: &str = "PAGE_TO_HTML";
  pub const EXTRACT_TEXT_FROM_ELEMENT: &str = "EXTRACT_TEXT_FROM_ELEMENT";
  pub const FILL_INPUT: &str = "FILL_INPUT";
  pub const CLICK_ELEMENT: &str = "CLICK_ELEMENT";
  pub const WAIT_FOR_ELEMENT: &str = "WAIT_FOR_ELEMENT";
  pub const SCROLL_TO_ELEMENT: &str = "SCROLL_TO_ELEMENT";
  pub const TAKE_SCREENSHOT: &str = "TAKE_SCREENSHOT";
  pub const DELAY: &str = "DELAY";
  pub const READ_PROPERTY_FROM_JSON: &str = "READ_PROPERTY_FROM_JSON";
  pub const ADD_PROPERTY_TO_JSON: &str = "ADD_PROPERTY_TO_JSON";
  pub const DELIVER_VIA_WEBHOOK: &str = "DELIVER_VIA_WEBHOOK";
}

/// Input/output names shared across the catalog.
pub mod params {
  pub const WEBSITE_URL: &str = "Website Url";
  pub const WEB_PAGE: &str = "Web page";
  pub const URL: &str = "Url";
  pub const HTML: &str = "Html";
  pub const SELECTOR: &str = "Selector";
  pub const VALUE: &str = "Value";
  pub const VISIBILITY: &str = "Visibility";
  pub const EXTRACTED_TEXT: &str = "Extracted text";
  pub const SCREENSHOT: &str = "Screenshot";
  pub const DURATION_MS: &str = "Duration ms";
  pub const JSON: &str = "JSON";
  pub const PROPERTY_NAME: &str = "Property name";
  pub const PROPERTY_VALUE: &str = "Property value";
  pub const UPDATED_JSON: &str = "Updated JSON";
  pub const TARGET_URL: &str = "Target URL";
  pub const BODY: &str = "Body";
}

use params::*;
use task_types::*;

/// Definitions of every builtin task type.
pub fn builtin_definitions() -> TaskRegistry {
  let mut registry = TaskRegistry::new();

  registry.register(TaskDefinition {
    task_type: LAUNCH_BROWSER.to_string(),
    label: "Launch browser".to_string(),
    is_entry_point: true,
    credit_cost: 5,
    inputs: vec![InputDef::required(WEBSITE_URL, ParamKind::String)],
    outputs: vec![OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance)],
  });

  registry.register(TaskDefinition {
    task_type: NAVIGATE_URL.to_string(),
    label: "Navigate to url".to_string(),
    is_entry_point: false,
    credit_cost: 2,
    inputs: vec![
      InputDef::required(WEB_PAGE, ParamKind::BrowserInstance),
      InputDef::required(URL, ParamKind::String),
    ],
    outputs: vec![OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance)],
  });

  registry.register(TaskDefinition {
    task_type: PAGE_TO_HTML.to_string(),
    label: "Get html from page".to_string(),
    is_entry_point: false,
    credit_cost: 2,
    inputs: vec![InputDef::required(WEB_PAGE, ParamKind::BrowserInstance)],
    outputs: vec![
      OutputDef::new(HTML, ParamKind::String),
      OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance),
    ],
  });

  registry.register(TaskDefinition {
    task_type: EXTRACT_TEXT_FROM_ELEMENT.to_string(),
    label: "Extract text from element".to_string(),
    is_entry_point: false,
    credit_cost: 2,
    inputs: vec![
      InputDef::required(HTML, ParamKind::String),
      InputDef::required(SELECTOR, ParamKind::String),
    ],
    outputs: vec![OutputDef::new(EXTRACTED_TEXT, ParamKind::String)],
  });

  registry.register(TaskDefinition {
    task_type: FILL_INPUT.to_string(),
    label: "Fill input".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![
      InputDef::required(WEB_PAGE, ParamKind::BrowserInstance),
      InputDef::required(SELECTOR, ParamKind::String),
      InputDef::required(VALUE, ParamKind::String),
    ],
    outputs: vec![OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance)],
  });

  registry.register(TaskDefinition {
    task_type: CLICK_ELEMENT.to_string(),
    label: "Click element".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![
      InputDef::required(WEB_PAGE, ParamKind::BrowserInstance),
      InputDef::required(SELECTOR, ParamKind::String),
    ],
    outputs: vec![OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance)],
  });

  registry.register(TaskDefinition {
    task_type: WAIT_FOR_ELEMENT.to_string(),
    label: "Wait for element".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![
      InputDef::required(WEB_PAGE, ParamKind::BrowserInstance),
      InputDef::required(SELECTOR, ParamKind::String),
      InputDef::optional(VISIBILITY, ParamKind::Select),
    ],
    outputs: vec![OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance)],
  });

  registry.register(TaskDefinition {
    task_type: SCROLL_TO_ELEMENT.to_string(),
    label: "Scroll to element".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![
      InputDef::required(WEB_PAGE, ParamKind::BrowserInstance),
      InputDef::required(SELECTOR, ParamKind::String),
    ],
    outputs: vec![OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance)],
  });

  registry.register(TaskDefinition {
    task_type: TAKE_SCREENSHOT.to_string(),
    label: "Take screenshot".to_string(),
    is_entry_point: false,
    credit_cost: 2,
    inputs: vec![InputDef::required(WEB_PAGE, ParamKind::BrowserInstance)],
    outputs: vec![
      OutputDef::new(SCREENSHOT, ParamKind::String),
      OutputDef::new(WEB_PAGE, ParamKind::BrowserInstance),
    ],
  });

  registry.register(TaskDefinition {
    task_type: DELAY.to_string(),
    label: "Delay".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![InputDef::required(DURATION_MS, ParamKind::Number)],
    outputs: vec![],
  });

  registry.register(TaskDefinition {
    task_type: READ_PROPERTY_FROM_JSON.to_string(),
    label: "Read property from JSON".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![
      InputDef::required(JSON, ParamKind::String),
      InputDef::required(PROPERTY_NAME, ParamKind::String),
    ],
    outputs: vec![OutputDef::new(PROPERTY_VALUE, ParamKind::String)],
  });

  registry.register(TaskDefinition {
    task_type: ADD_PROPERTY_TO_JSON.to_string(),
    label: "Add property to JSON".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![
      InputDef::required(JSON, ParamKind::String),
      InputDef::required(PROPERTY_NAME, ParamKind::String),
      InputDef::required(VALUE, ParamKind::String),
    ],
    outputs: vec![OutputDef::new(UPDATED_JSON, ParamKind::String)],
  });

  registry.register(TaskDefinition {
    task_type: DELIVER_VIA_WEBHOOK.to_string(),
    label: "Deliver via webhook".to_string(),
    is_entry_point: false,
    credit_cost: 1,
    inputs: vec![
      InputDef::required(TARGET_URL, ParamKind::String),
      InputDef::required(BODY, ParamKind::String),
    ],
    outputs: vec![],
  });

  registry
}

/// Executors for every builtin task type.
pub fn builtin_executors() -> ExecutorRegistry {
  let mut registry = ExecutorRegistry::new();
  registry.register(LAUNCH_BROWSER, Arc::new(LaunchBrowserExecutor::default()));
  registry.register(NAVIGATE_URL, Arc::new(NavigateUrlExecutor));
  registry.register(PAGE_TO_HTML, Arc::new(PageToHtmlExecutor));
  registry.register(
    EXTRACT_TEXT_FROM_ELEMENT,
    Arc::new(ExtractTextFromElementExecutor),
  );
  registry.register(FILL_INPUT, Arc::new(FillInputExecutor));
  registry.register(CLICK_ELEMENT, Arc::new(ClickElementExecutor));
  registry.register(WAIT_FOR_ELEMENT, Arc::new(WaitForElementExecutor));
  registry.register(SCROLL_TO_ELEMENT, Arc::new(ScrollToElementExecutor));
  registry.register(TAKE_SCREENSHOT, Arc::new(TakeScreenshotExecutor));
  registry.register(DELAY, Arc::new(DelayExecutor));
  registry.register(
    READ_PROPERTY_FROM_JSON,
    Arc::new(ReadPropertyFromJsonExecutor),
  );
  registry.register(ADD_PROPERTY_TO_JSON, Arc::new(AddPropertyToJsonExecutor));
  registry.register(
    DELIVER_VIA_WEBHOOK,
    Arc::new(DeliverViaWebhookExecutor::default()),
  );
  registry
}
