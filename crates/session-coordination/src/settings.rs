//! Engine settings and state store key layout

use session_core::config::CoordinationConfig;

/// Runtime settings for [`SessionCoordinator`](crate::SessionCoordinator)
#[derive(Debug, Clone)]
pub struct CoordinationSettings {
    /// Prefix for every key the engine writes
    pub namespace: String,
    /// Group status counted by `active_groups`
    pub active_status: String,
    /// Used when `configure_failover` is given a threshold of 0
    pub default_failover_threshold: u32,
}

impl Default for CoordinationSettings {
    fn default() -> Self {
        Self::from(&CoordinationConfig::default())
    }
}

impl From<&CoordinationConfig> for CoordinationSettings {
    fn from(config: &CoordinationConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            active_status: config.active_status.clone(),
            default_failover_threshold: config.default_failover_threshold.max(1),
        }
    }
}

impl CoordinationSettings {
    pub(crate) fn keys(&self) -> StoreKeys<'_> {
        StoreKeys {
            namespace: &self.namespace,
        }
    }
}

/// Fixed keys the engine mirrors its tables into
pub(crate) struct StoreKeys<'a> {
    namespace: &'a str,
}

impl StoreKeys<'_> {
    pub fn dependencies(&self) -> String {
        format!("{}:dependencies", self.namespace)
    }

    pub fn groups(&self) -> String {
        format!("{}:groups", self.namespace)
    }

    pub fn failover(&self) -> String {
        format!("{}:failover", self.namespace)
    }

    pub fn assignments(&self) -> String {
        format!("{}:assignments", self.namespace)
    }

    /// Shared-state key for `session_id`
    ///
    /// Ids and keys may contain `:`, so the session id is length-prefixed to
    /// keep distinct (session, key) pairs on distinct store keys.
    pub fn shared(&self, session_id: &str, key: &str) -> String {
        format!(
            "{}:session:{}:{}:shared:{}",
            self.namespace,
            session_id.len(),
            session_id,
            key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let settings = CoordinationSettings::default();
        let keys = settings.keys();
        let all = [
            keys.dependencies(),
            keys.groups(),
            keys.failover(),
            keys.assignments(),
            keys.shared("s1", "k"),
        ];

        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert_eq!(keys.shared("s1", "plan"), "coordination:session:2:s1:shared:plan");
    }

    #[test]
    fn test_shared_keys_do_not_collide_on_separators() {
        let settings = CoordinationSettings::default();
        let keys = settings.keys();

        assert_ne!(keys.shared("a", "x:shared:k"), keys.shared("a:shared:x", "k"));
        assert_ne!(keys.shared("a:1", "k"), keys.shared("a", "1:k"));
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let config = CoordinationConfig {
            default_failover_threshold: 0,
            ..CoordinationConfig::default()
        };
        assert_eq!(CoordinationSettings::from(&config).default_failover_threshold, 1);
    }
}
