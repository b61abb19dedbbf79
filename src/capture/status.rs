//! Auto-dismissing status banners.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::dom::{NodeId, SharedDocument};
use crate::report::template::ids;
use crate::{Error, Result};

pub const LOADING_LIBRARY: &str = "正在加载图片生成库，请稍候...";
pub const GENERATING: &str = "正在生成长图，请稍候...（约需10-15秒）";
pub const CROPPING: &str = "正在裁剪和优化图片...";
pub const CROP_FAILED: &str = "裁剪失败，使用原始图片";
pub const PREPARE_FAILED: &str = "内容准备失败，请重试";
pub const LOAD_FAILED: &str = "长图生成功能需要加载图片生成库，请检查网络连接后重试。";
pub const EMPTY_RESULT: &str = "长图生成失败：内容尺寸异常，请重试";
pub const BUSY: &str = "长图正在生成中，请稍候";

pub fn rasterization_failed(reason: &str) -> String {
    format!("长图生成失败：{}，请重试", reason)
}

pub fn save_failed(reason: &str) -> String {
    format!("长图保存失败：{}，请重试", reason)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

impl StatusKind {
    fn background(self) -> &'static str {
        match self {
            StatusKind::Info => "#2196f3",
            StatusKind::Success => "#4caf50",
            StatusKind::Error => "#f44336",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

pub type StatusListener = Arc<dyn Fn(&StatusMessage) + Send + Sync>;

/// Shows status banners in the live document and removes them after a delay.
#[derive(Clone)]
pub struct StatusNotifier {
    doc: SharedDocument,
    dismiss_after: Duration,
    listener: Option<StatusListener>,
}

impl fmt::Debug for StatusNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusNotifier")
            .field("dismiss_after", &self.dismiss_after)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl StatusNotifier {
    pub fn new(doc: SharedDocument, dismiss_after: Duration) -> Self {
        Self {
            doc,
            dismiss_after,
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: StatusListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn document(&self) -> &SharedDocument {
        &self.doc
    }

    fn announce(&self, kind: StatusKind, text: &str) {
        match kind {
            StatusKind::Error => warn!("Status: {}", text),
            _ => info!("Status: {}", text),
        }
        if let Some(listener) = &self.listener {
            listener(&StatusMessage {
                kind,
                text: text.to_string(),
            });
        }
    }

    fn schedule_removal(&self, node: NodeId) {
        let doc = self.doc.clone();
        let delay = self.dismiss_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if doc.lock().await.remove(node) {
                debug!("Dismissed banner {:?}", node);
            }
        });
    }

    /// Replace any previous status banner with a new one.
    pub async fn show(&self, kind: StatusKind, text: &str) -> Result<NodeId> {
        self.announce(kind, text);
        let node = {
            let mut doc = self.doc.lock().await;
            for stale in doc.elements_by_class(ids::STATUS_TIP_CLASS) {
                doc.remove(stale);
            }
            let body = doc.body().ok_or_else(|| Error::ElementNotFound("body".into()))?;
            let node = doc.create_element("div");
            doc.append_child(body, node);
            if let Some(el) = doc.element_mut(node) {
                el.add_class(ids::STATUS_TIP_CLASS);
                el.set_attr(
                    "style",
                    &format!(
                        "position: fixed; top: 20px; left: 50%; transform: translateX(-50%); background-color: {}; color: #ffffff; padding: 12px 24px; z-index: 10000",
                        kind.background()
                    ),
                );
            }
            let text_node = doc.create_text(text);
            doc.append_child(node, text_node);
            node
        };
        self.schedule_removal(node);
        Ok(node)
    }

    pub async fn info(&self, text: &str) -> Result<NodeId> {
        self.show(StatusKind::Info, text).await
    }

    pub async fn success(&self, text: &str) -> Result<NodeId> {
        self.show(StatusKind::Success, text).await
    }

    pub async fn error(&self, text: &str) -> Result<NodeId> {
        self.show(StatusKind::Error, text).await
    }

    /// Inline validation error right after the input group.
    pub async fn input_error(&self, text: &str) -> Result<NodeId> {
        self.announce(StatusKind::Error, text);
        let node = {
            let mut doc = self.doc.lock().await;
            for stale in doc.elements_by_class(ids::ERROR_CLASS) {
                doc.remove(stale);
            }
            let group = doc
                .elements_by_class(ids::INPUT_GROUP_CLASS)
                .into_iter()
                .next()
                .ok_or_else(|| Error::ElementNotFound(format!(".{}", ids::INPUT_GROUP_CLASS)))?;
            let node = doc.create_element("div");
            doc.insert_after(group, node)?;
            if let Some(el) = doc.element_mut(node) {
                el.add_class(ids::ERROR_CLASS);
            }
            let text_node = doc.create_text(text);
            doc.append_child(node, text_node);
            node
        };
        self.schedule_removal(node);
        Ok(node)
    }

    pub async fn clear_input_error(&self) {
        let mut doc = self.doc.lock().await;
        for stale in doc.elements_by_class(ids::ERROR_CLASS) {
            doc.remove(stale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{shared, Document};
    use crate::report::DEFAULT_PAGE;
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn banner_is_replaced_then_dismissed() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let notifier = StatusNotifier::new(doc.clone(), Duration::from_millis(3000)).with_listener(Arc::new(
            move |m: &StatusMessage| sink.lock().unwrap().push(m.text.clone()),
        ));

        notifier.info(GENERATING).await.unwrap();
        let second = notifier.success("done").await.unwrap();
        {
            let guard = doc.lock().await;
            let tips = guard.elements_by_class(ids::STATUS_TIP_CLASS);
            assert_eq!(tips, vec![second]);
            assert_eq!(guard.text_content(second), "done");
        }

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert!(doc.lock().await.elements_by_class(ids::STATUS_TIP_CLASS).is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![GENERATING.to_string(), "done".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn input_error_follows_input_group() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let notifier = StatusNotifier::new(doc.clone(), Duration::from_millis(3000));
        let node = notifier.input_error("请输入分数").await.unwrap();
        {
            let guard = doc.lock().await;
            let group = guard.elements_by_class(ids::INPUT_GROUP_CLASS)[0];
            let parent = guard.parent(group).unwrap();
            let siblings = guard.children(parent);
            let pos = siblings.iter().position(|c| *c == group).unwrap();
            assert_eq!(siblings[pos + 1], node);
        }
        notifier.clear_input_error().await;
        assert!(doc.lock().await.elements_by_class(ids::ERROR_CLASS).is_empty());
    }
}
