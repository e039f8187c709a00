use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到已开启调试端口的浏览器，复用已打开的目标页面，没有则新建
pub async fn connect_to_browser_and_page(port: u16, target_url: &str) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);
    debug!("目标 URL: {}", target_url);

    let (browser, mut handler) = Browser::connect(&browser_url)
        .await
        .map_err(|e| {
            error!("连接浏览器失败: {}", e);
            e
        })
        .with_context(|| format!("无法连接到浏览器 (端口: {})", port))?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            if url.starts_with(target_url) {
                info!("✓ 复用已打开的页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到目标页面，创建新页面并导航到: {}", target_url);
    let page = browser
        .new_page(target_url)
        .await
        .map_err(|e| {
            error!("导航到 {} 失败: {}", target_url, e);
            e
        })
        .with_context(|| format!("无法打开页面: {}", target_url))?;
    info!("已导航到: {}", target_url);

    Ok((browser, page))
}
