//! Fixture settings, resolved once before the workflow is registered.

use lineage::Producer;

use crate::FixtureError;

pub const ENV_NAMESPACE: &str = "OPENLINEAGE_NAMESPACE";

pub const WORKFLOW_NAME: &str = "event_order";
pub const DEFAULT_JOB_NAME: &str = "emit_event.wait-for-me";
pub const DEFAULT_DELAY_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureConfig {
    /// Namespace of the emitted job; omitted from events when unset.
    pub namespace: Option<String>,
    /// Attached to every event this fixture emits.
    pub producer: Producer,
    /// How long `just_wait` sleeps.
    pub delay_secs: u64,
    pub job_name: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            producer: Producer::default(),
            delay_secs: DEFAULT_DELAY_SECS,
            job_name: DEFAULT_JOB_NAME.to_string(),
        }
    }
}

impl FixtureConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_namespace(lookup(ENV_NAMESPACE))
    }

    /// Sets the namespace; blank values leave it unset.
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.trim().is_empty());
        self
    }

    pub fn with_delay_secs(mut self, delay_secs: u64) -> Self {
        self.delay_secs = delay_secs;
        self
    }

    pub fn with_producer(mut self, producer: Producer) -> Self {
        self.producer = producer;
        self
    }

    pub fn validate(&self) -> Result<(), FixtureError> {
        if self.job_name.trim().is_empty() {
            return Err(FixtureError::Config("job name must not be empty".into()));
        }
        if self.producer.as_str().trim().is_empty() {
            return Err(FixtureError::Config("producer must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_comes_from_lookup() {
        let config = FixtureConfig::from_lookup(|key| {
            (key == ENV_NAMESPACE).then(|| "food_delivery".to_string())
        });
        assert_eq!(config.namespace.as_deref(), Some("food_delivery"));
        assert_eq!(config.delay_secs, DEFAULT_DELAY_SECS);
        assert_eq!(config.job_name, DEFAULT_JOB_NAME);
    }

    #[test]
    fn missing_or_blank_namespace_is_none() {
        assert!(FixtureConfig::from_lookup(|_| None).namespace.is_none());
        assert!(FixtureConfig::from_lookup(|_| Some(" ".into())).namespace.is_none());
    }

    #[test]
    fn blank_namespace_override_is_unset() {
        let config = FixtureConfig::default().with_namespace(Some("ns".into()));
        assert_eq!(config.namespace.as_deref(), Some("ns"));
        assert!(config.with_namespace(Some(String::new())).namespace.is_none());
    }

    #[test]
    fn empty_job_name_is_rejected() {
        let config = FixtureConfig { job_name: String::new(), ..FixtureConfig::default() };
        assert!(matches!(config.validate(), Err(FixtureError::Config(_))));
        assert!(FixtureConfig::default().validate().is_ok());
    }
}
