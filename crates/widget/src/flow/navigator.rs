use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::chat::events::{EventDispatcher, RcbEventDetail};
use crate::flow::block::{Block, Flow};
use crate::settings::SettingsStore;

/// Tracks the visited path history through the flow graph.
pub struct PathNavigator {
    settings: Arc<SettingsStore>,
    events: Arc<EventDispatcher>,
    flow: ArcSwap<Flow>,
    paths: Mutex<Vec<String>>,
}

impl PathNavigator {
    pub fn new(settings: Arc<SettingsStore>, events: Arc<EventDispatcher>, flow: Flow) -> Self {
        Self {
            settings,
            events,
            flow: ArcSwap::from_pointee(flow),
            paths: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the flow graph and forgets the visited paths.
    pub fn set_flow(&self, flow: Flow) {
        self.flow.store(Arc::new(flow));
        self.lock().clear();
    }

    pub fn block(&self, path: &str) -> Option<Block> {
        self.flow.load().get(path).cloned()
    }

    pub fn get_curr_path(&self) -> Option<String> {
        self.lock().last().cloned()
    }

    pub fn get_prev_path(&self) -> Option<String> {
        let paths = self.lock();
        paths.len().checked_sub(2).map(|index| paths[index].clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Moves to `path`. Returns false for unknown paths or a vetoed change.
    pub async fn go_to_path(&self, path: &str) -> bool {
        if !self.flow.load().contains_key(path) {
            tracing::warn!(path = %path, "refusing to navigate to a path missing from the flow");
            return false;
        }

        if self.settings.settings().event.rcb_change_path {
            let detail = RcbEventDetail::ChangePath {
                curr_path: self.get_curr_path(),
                prev_path: self.get_prev_path(),
                next_path: path.to_string(),
            };
            if self.events.dispatch(detail).await.is_suppressed() {
                return false;
            }
        }

        tracing::debug!(path = %path, "navigated");
        self.lock().push(path.to_string());
        true
    }

    /// Lets listeners inspect or rewrite a block before it is post-processed.
    ///
    /// Returns `None` when a listener vetoed post-processing.
    pub async fn fire_post_process_block_event(&self, path: &str, block: Block) -> Option<Block> {
        if !self.settings.settings().event.rcb_post_process_block {
            return Some(block);
        }

        match self
            .events
            .dispatch(RcbEventDetail::PostProcessBlock {
                path: path.to_string(),
                block,
            })
            .await
            .into_detail()
        {
            Some(RcbEventDetail::PostProcessBlock { block, .. }) => Some(block),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn navigator(settings: Settings) -> (PathNavigator, Arc<EventDispatcher>) {
        let events = Arc::new(EventDispatcher::new());
        let flow = Flow::from([
            ("start".to_string(), Block::new().with_path("end")),
            ("end".to_string(), Block::new()),
        ]);
        let navigator =
            PathNavigator::new(Arc::new(SettingsStore::in_memory(settings)), events.clone(), flow);
        (navigator, events)
    }

    #[tokio::test]
    async fn tracks_current_and_previous_paths() {
        let (navigator, _) = navigator(Settings::default());
        assert_eq!(navigator.get_curr_path(), None);

        assert!(navigator.go_to_path("start").await);
        assert_eq!(navigator.get_prev_path(), None);
        assert!(navigator.go_to_path("end").await);

        assert_eq!(navigator.get_curr_path().as_deref(), Some("end"));
        assert_eq!(navigator.get_prev_path().as_deref(), Some("start"));
    }

    #[tokio::test]
    async fn unknown_path_is_refused() {
        let (navigator, _) = navigator(Settings::default());

        assert!(!navigator.go_to_path("missing").await);
        assert!(navigator.paths().is_empty());
    }

    #[tokio::test]
    async fn change_path_event_can_veto() {
        let mut settings = Settings::default();
        settings.event.rcb_change_path = true;
        let (navigator, events) = navigator(settings);
        events.subscribe_fn(|event| {
            let entering_end = matches!(
                event.detail(),
                RcbEventDetail::ChangePath { next_path, .. } if next_path == "end"
            );
            if entering_end {
                event.prevent_default();
            }
        });

        assert!(navigator.go_to_path("start").await);
        assert!(!navigator.go_to_path("end").await);
        assert_eq!(navigator.paths(), vec!["start"]);
    }

    #[tokio::test]
    async fn post_process_listener_can_rewrite_block() {
        let mut settings = Settings::default();
        settings.event.rcb_post_process_block = true;
        let (navigator, events) = navigator(settings);
        events.subscribe_fn(|event| {
            if let RcbEventDetail::PostProcessBlock { block, .. } = event.detail_mut() {
                block.path = None;
            }
        });

        let block = navigator
            .fire_post_process_block_event("start", Block::new().with_path("end"))
            .await
            .expect("not vetoed");
        assert!(block.path.is_none());
    }

    #[tokio::test]
    async fn set_flow_resets_history() {
        let (navigator, _) = navigator(Settings::default());
        navigator.go_to_path("start").await;

        navigator.set_flow(Flow::from([("other".to_string(), Block::new())]));

        assert_eq!(navigator.get_curr_path(), None);
        assert!(navigator.block("start").is_none());
        assert!(navigator.block("other").is_some());
    }
}
