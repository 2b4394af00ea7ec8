//! 网络响应观察器
//!
//! 观察器是一个作用域订阅：创建时开始记录 `Network.responseReceived`，
//! 被 drop 时停止监听任务并释放事件流。一次提交尝试对应一个观察器。

use std::sync::{Arc, Mutex};

use chromiumoxide::cdp::browser_protocol::network::{
    EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::AppResult;

/// 记录下来的一条响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    pub request_id: String,
    pub url: String,
    pub status: u16,
}

/// 响应记录的只读视图
#[allow(async_fn_in_trait)]
pub trait ResponseLog {
    /// 到目前为止记录到的响应（按到达顺序）
    fn recorded(&self) -> Vec<ObservedResponse>;

    /// 读取响应体；取不到时返回 None
    async fn body(&self, response: &ObservedResponse) -> Option<String>;
}

/// 基于 CDP 事件流的观察器
pub struct CdpResponseObserver {
    page: Page,
    records: Arc<Mutex<Vec<ObservedResponse>>>,
    listener: JoinHandle<()>,
}

impl CdpResponseObserver {
    /// 注册监听；必须在点击提交按钮之前调用
    pub async fn register(page: &Page) -> AppResult<Self> {
        let mut events = page.event_listener::<EventResponseReceived>().await?;
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);

        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let response = ObservedResponse {
                    request_id: event.request_id.inner().clone(),
                    url: event.response.url.clone(),
                    status: u16::try_from(event.response.status).unwrap_or(0),
                };
                trace!(url = %response.url, status = response.status, "记录响应");
                if let Ok(mut guard) = sink.lock() {
                    guard.push(response);
                }
            }
        });

        debug!("响应观察器已注册");
        Ok(Self {
            page: page.clone(),
            records,
            listener,
        })
    }
}

impl ResponseLog for CdpResponseObserver {
    fn recorded(&self) -> Vec<ObservedResponse> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn body(&self, response: &ObservedResponse) -> Option<String> {
        let params = GetResponseBodyParams::new(RequestId::new(response.request_id.clone()));
        match self.page.execute(params).await {
            // base64 编码的响应体不是文本，不参与内容校验
            Ok(result) if !result.result.base64_encoded => Some(result.result.body.clone()),
            Ok(_) => None,
            Err(e) => {
                debug!(url = %response.url, "读取响应体失败: {}", e);
                None
            }
        }
    }
}

impl Drop for CdpResponseObserver {
    fn drop(&mut self) {
        self.listener.abort();
        debug!("响应观察器已注销");
    }
}
