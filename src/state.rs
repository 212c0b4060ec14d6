use crate::config::AppConfig;
use crate::services::ai::LlmProvider;
use crate::services::booking::BookingBackend;
use crate::services::messaging::MessagingProvider;
use crate::services::sessions::SessionStore;

pub struct AppState {
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
    pub booking: Box<dyn BookingBackend>,
    pub messaging: Box<dyn MessagingProvider>,
    pub sessions: SessionStore,
}
