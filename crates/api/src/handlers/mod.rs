use std::{path::PathBuf, sync::Arc};

use leave::LeaveRequestService;

pub mod admin;
pub mod leave_requests;
pub mod rules;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LeaveRequestService>,
    /// Where `/admin/reload` re-reads rules from. `None` disables reloading.
    pub rules_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(service: LeaveRequestService) -> Self {
        Self {
            service: Arc::new(service),
            rules_path: None,
        }
    }

    pub fn with_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }
}
