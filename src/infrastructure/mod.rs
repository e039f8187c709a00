pub mod browser_driver;
pub mod driver;
pub mod js_executor;

pub use browser_driver::BrowserDriver;
pub use driver::PageDriver;
pub use js_executor::JsExecutor;
