use crate::api::Backend;
use crate::controller::Controller;
use crate::form::QueryForm;
use chrono::Local;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

const SESSION_ID_LEN: usize = 24;

struct PageSession {
    controller: Arc<Controller>,
    last_seen: Instant,
}

/// Page state per loaded browser page, keyed by the id embedded in that page.
pub struct Sessions {
    backend: Arc<dyn Backend>,
    range_days: i64,
    idle_timeout: Duration,
    pages: RwLock<HashMap<String, PageSession>>,
}

impl Sessions {
    pub fn new(backend: Arc<dyn Backend>, range_days: i64, idle_timeout: Duration) -> Self {
        Self {
            backend,
            range_days,
            idle_timeout,
            pages: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh state for a page load: default dates and a freshly loaded device list.
    pub async fn open(&self) -> (String, Arc<Controller>) {
        let defaults = QueryForm::with_default_dates(Local::now().date_naive(), self.range_days);
        let controller = Arc::new(Controller::new(Arc::clone(&self.backend), defaults));
        controller.load_devices().await;

        let id = new_session_id();
        let now = Instant::now();
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let before = pages.len();
        pages.retain(|_, page| now.duration_since(page.last_seen) < self.idle_timeout);
        if pages.len() < before {
            tracing::debug!(expired = before - pages.len(), "dropped idle page sessions");
        }
        pages.insert(
            id.clone(),
            PageSession {
                controller: Arc::clone(&controller),
                last_seen: now,
            },
        );
        tracing::debug!(open = pages.len(), "opened page session");
        (id, controller)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Controller>> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let page = pages.get_mut(id)?;
        page.last_seen = Instant::now();
        Some(Arc::clone(&page.controller))
    }

    /// Forgets a page that was unloaded.
    pub fn close(&self, id: &str) -> bool {
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }
}

fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}
