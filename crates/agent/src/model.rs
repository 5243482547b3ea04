//! Model selection per turn.

use switchyard_config::AppConfig;
use switchyard_core::thread::ConversationThread;

/// Resolves the model identifier for a turn.
///
/// Precedence: the thread's override, then (CRM turns only) the CRM
/// orchestrator model, then the configured default.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    default_model: String,
    crm_model: Option<String>,
}

impl ModelSelector {
    pub fn new(default_model: impl Into<String>, crm_model: Option<String>) -> Self {
        Self {
            default_model: default_model.into(),
            crm_model: crm_model.filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.default_model, config.models.crm_orchestrator.clone())
    }

    pub fn select(&self, thread: &ConversationThread, crm: bool) -> String {
        thread
            .model_override
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| crm.then(|| self.crm_model.clone()).flatten())
            .unwrap_or_else(|| self.default_model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::thread::ThreadId;

    fn thread(model_override: Option<&str>) -> ConversationThread {
        let mut t = ConversationThread::new(ThreadId::from("t"));
        t.model_override = model_override.map(str::to_string);
        t
    }

    #[test]
    fn thread_override_wins() {
        let s = ModelSelector::new("default", Some("crm".into()));
        assert_eq!(s.select(&thread(Some("mine")), true), "mine");
        assert_eq!(s.select(&thread(Some("mine")), false), "mine");
    }

    #[test]
    fn crm_model_only_for_crm_turns() {
        let s = ModelSelector::new("default", Some("crm".into()));
        assert_eq!(s.select(&thread(None), true), "crm");
        assert_eq!(s.select(&thread(None), false), "default");
    }

    #[test]
    fn blank_values_fall_through() {
        let s = ModelSelector::new("default", Some("  ".into()));
        assert_eq!(s.select(&thread(Some("")), true), "default");
    }

    #[test]
    fn reads_config() {
        let mut config = AppConfig::default();
        config.models.crm_orchestrator = Some("openai/o4-mini".into());
        let s = ModelSelector::from_config(&config);
        assert_eq!(s.select(&thread(None), true), "openai/o4-mini");
        assert_eq!(s.select(&thread(None), false), config.default_model);
    }
}
