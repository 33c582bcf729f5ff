//! Real-browser smoke test. Requires a Chrome/Chromium binary; set
//! PAGESCOUT_CHROME_BIN to run it, otherwise the test skips itself.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use log::info;

use pagescout::a11y::CdpTreeBuilder;
use pagescout::adapter::ChromiumPageHandle;
use pagescout::config::{ScoutConfig, Verbosity};
use pagescout::content::{ContentTool, PageContent};
use pagescout::context::ScoutContext;
use pagescout::events::{EventSink, LoggingEventSink};
use pagescout::logging::ScoutLogger;
use pagescout::page::AgentPage;

const TEST_PAGE: &str = "data:text/html,<html><body><h1>Example Heading</h1>\
<p>Some visible text.</p>\
<img src=\"x.png\" alt=\"Logo\">\
<input type=\"text\" aria-label=\"Email\">\
</body></html>";

#[tokio::test]
async fn extracts_content_from_a_live_page() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let chrome_bin = match env::var("PAGESCOUT_CHROME_BIN") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => {
            eprintln!("skipping chromium integration test: PAGESCOUT_CHROME_BIN not set");
            return Ok(());
        }
    };

    if !chrome_bin.exists() {
        eprintln!(
            "skipping chromium integration test: chrome executable not found at {}",
            chrome_bin.display()
        );
        return Ok(());
    }

    let browser_config = BrowserConfig::builder()
        .chrome_executable(chrome_bin)
        .build()
        .map_err(|err| anyhow!(err))?;
    let (mut browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch browser")?;
    let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

    let page = browser
        .new_page(TEST_PAGE)
        .await
        .context("failed to open test page")?;

    let logger = Arc::new(ScoutLogger::new(Verbosity::Detailed));
    let handle = Arc::new(ChromiumPageHandle::new(page, Arc::clone(&logger)));

    let logs = tempfile::tempdir().context("tempdir")?;
    let mut ctx = ScoutContext::new("smoke-task", logs.path());
    ctx.register_page("page-1", Arc::clone(&handle) as Arc<dyn AgentPage>);
    ctx.set_active_page(&"page-1".to_string())
        .context("activate page")?;

    let tool = ContentTool::new(
        ScoutConfig::default(),
        Arc::clone(&logger),
        Arc::new(LoggingEventSink::new(Arc::clone(&logger))) as Arc<dyn EventSink>,
        Arc::new(CdpTreeBuilder::new(Arc::clone(&logger))),
    );

    let content = tool
        .get_content(&ctx, "text_only")
        .await
        .context("text_only extraction")?;
    let text = match content {
        PageContent::Text(text) => text,
        other => return Err(anyhow!("unexpected content variant: {other:?}")),
    };
    info!("Fetched page text ({} bytes)", text.len());
    assert!(text.contains("Some visible text."));
    assert!(text.contains("Other Alt Texts in the page: Logo"));

    let artifact = std::fs::read_to_string(logs.path().join("text_only_dom.txt"))
        .context("text artifact")?;
    assert_eq!(artifact, text);

    let content = tool
        .get_content(&ctx, "input_fields")
        .await
        .context("input_fields extraction")?;
    match content {
        PageContent::InputFields(snapshot) => {
            let count = snapshot
                .get("inputFieldCount")
                .and_then(|value| value.as_u64())
                .unwrap_or(0);
            assert!(count >= 1, "expected at least the email textbox, got {count}");
        }
        other => return Err(anyhow!("unexpected content variant: {other:?}")),
    }

    browser.close().await.ok();
    handler_task.abort();
    Ok(())
}
