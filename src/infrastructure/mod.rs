pub mod js_executor;
pub mod page_driver;
pub mod response_observer;

#[cfg(test)]
pub mod fake_page;

pub use js_executor::JsExecutor;
pub use page_driver::{CdpPage, PageDriver};
pub use response_observer::{CdpResponseObserver, ObservedResponse, ResponseLog};
