use crate::control::ControlHandler;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlHandler>,
}

impl AppState {
    pub fn new(control: Arc<ControlHandler>) -> Self {
        Self { control }
    }
}
