use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

use gc_core::config::SETTINGS_KEY;
use gc_core::{Flag, Settings};

pub struct E2eOptions {
    pub chromedriver_url: String,
    pub extension_path: String,
    pub headless: bool,
}

const POPUP_PAGE: &str = "popup.html";
const RENDER_ATTEMPTS: usize = 20;

pub fn run_e2e(opts: E2eOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_e2e_async(opts))
}

async fn run_e2e_async(opts: E2eOptions) -> Result<(), String> {
    let extension_path = canonicalize_path(&opts.extension_path)?;

    let mut caps = ChromeCapabilities::new();
    let mut args = vec![
        format!("--disable-extensions-except={}", extension_path.display()),
        format!("--load-extension={}", extension_path.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ];
    if opts.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    for arg in &args {
        caps.add_arg(arg)
            .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    }

    let driver = WebDriver::new(&opts.chromedriver_url, caps)
        .await
        .map_err(|e| format!("Failed to connect to chromedriver: {}", e))?;

    let cdp = ChromeDevTools::new(driver.handle.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;

    let extension_id = match find_extension_id(&cdp).await {
        Some(id) => id,
        None => {
            driver.quit().await.ok();
            return Err("Failed to locate extension service worker".to_string());
        }
    };
    let popup_url = format!("chrome-extension://{}/{}", extension_id, POPUP_PAGE);

    let mut errors = Vec::new();

    if let Err(e) = check_popup_controls(&driver, &popup_url).await {
        errors.push(format!("Popup check failed: {}", e));
    }

    if let Err(e) = check_seeded_settings(&driver).await {
        errors.push(format!("Install seeding check failed: {}", e));
    }

    if let Err(e) = check_toggle_persists(&driver).await {
        errors.push(format!("Toggle check failed: {}", e));
    }

    driver.quit().await.ok();

    if errors.is_empty() {
        println!("✓ E2E checks passed");
        Ok(())
    } else {
        Err(format!("E2E failed:\n- {}", errors.join("\n- ")))
    }
}

async fn find_extension_id(cdp: &ChromeDevTools) -> Option<String> {
    let targets = cdp.execute_cdp("Target.getTargets").await.ok()?;
    let infos = targets.get("targetInfos")?.as_array()?;
    for info in infos {
        let target_type = info.get("type").and_then(Value::as_str).unwrap_or("");
        let url = info.get("url").and_then(Value::as_str).unwrap_or("");
        let is_background = target_type == "service_worker" || target_type == "background_page";
        if is_background && url.starts_with("chrome-extension://") {
            let id = url.trim_start_matches("chrome-extension://");
            if let Some(id) = id.split('/').next() {
                if !id.is_empty() {
                    return Some(id.to_string());
                }
            }
        }
    }
    None
}

/// The popup renders asynchronously once storage has answered.
async fn wait_for_checkboxes(driver: &WebDriver) -> Result<Vec<WebElement>, String> {
    for _ in 0..RENDER_ATTEMPTS {
        let found = driver
            .find_all(By::Css("input[type=checkbox]"))
            .await
            .map_err(|e| format!("Failed to query checkboxes: {}", e))?;
        if found.len() >= Flag::ALL.len() {
            return Ok(found);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err("Popup did not render its switches".to_string())
}

async fn check_popup_controls(driver: &WebDriver, popup_url: &str) -> Result<(), String> {
    driver.goto(popup_url).await.map_err(|e| format!("Failed to open popup: {}", e))?;
    let checkboxes = wait_for_checkboxes(driver).await?;

    if checkboxes.len() != Flag::ALL.len() {
        return Err(format!("Expected {} switches, found {}", Flag::ALL.len(), checkboxes.len()));
    }
    for flag in Flag::ALL {
        driver
            .find(By::Id(flag.key()))
            .await
            .map_err(|e| format!("Missing switch '{}': {}", flag.key(), e))?;
    }
    Ok(())
}

async fn stored_settings(driver: &WebDriver) -> Result<Settings, String> {
    let script = format!(
        "const done = arguments[arguments.length - 1];\
         chrome.storage.local.get('{key}').then(r => done(r['{key}'] ?? null));",
        key = SETTINGS_KEY
    );
    let result = driver
        .execute_async(&script, Vec::<Value>::new())
        .await
        .map_err(|e| format!("Failed to read storage: {}", e))?;
    serde_json::from_value(result.json().clone())
        .map_err(|e| format!("Stored record does not parse: {}", e))
}

async fn check_seeded_settings(driver: &WebDriver) -> Result<(), String> {
    let stored = stored_settings(driver).await?;
    if stored != Settings::install_defaults() {
        return Err(format!("Unexpected record after install: {:?}", stored));
    }
    Ok(())
}

async fn check_toggle_persists(driver: &WebDriver) -> Result<(), String> {
    let before = stored_settings(driver).await?;
    let flag = Flag::ExplorePage;

    let checkbox = driver
        .find(By::Id(flag.key()))
        .await
        .map_err(|e| format!("Missing switch '{}': {}", flag.key(), e))?;
    checkbox.click().await.map_err(|e| format!("Failed to click switch: {}", e))?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let after = stored_settings(driver).await?;
    if after != before.with(flag, !before.get(flag)) {
        return Err(format!("Expected only '{}' to flip, got {:?}", flag.key(), after));
    }
    Ok(())
}

fn canonicalize_path(path: &str) -> Result<PathBuf, String> {
    std::fs::canonicalize(path)
        .map_err(|e| format!("Failed to resolve '{}': {}", path, e))
}
