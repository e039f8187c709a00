pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;

use anyhow::Result;
use chromiumoxide::{Browser, Page};

use crate::config::{BrowserMode, Config};

/// 按配置接入浏览器并打开目标页面
pub async fn open_target_page(config: &Config) -> Result<(Browser, Page)> {
    match config.browser_mode {
        BrowserMode::Connect => {
            connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await
        }
        BrowserMode::Headless => {
            launch_headless_browser(&config.target_url, config.chrome_executable.as_deref()).await
        }
    }
}
