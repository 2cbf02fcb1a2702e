use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::template::{create_template_store, TemplateStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub template_store: Arc<TemplateStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let template_store = create_template_store(settings.templates.escape.stringifier());

        Self {
            settings: Arc::new(settings),
            template_store,
            start_time: Instant::now(),
        }
    }
}
