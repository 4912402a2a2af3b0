// Per-user metric visibility preferences

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dashboard metric category. The set is fixed; order here is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Cpu,
    Ram,
    Disk,
    Network,
    Processes,
    Services,
    Apps,
    Uptime,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 8] = [
        MetricCategory::Cpu,
        MetricCategory::Ram,
        MetricCategory::Disk,
        MetricCategory::Network,
        MetricCategory::Processes,
        MetricCategory::Services,
        MetricCategory::Apps,
        MetricCategory::Uptime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Cpu => "cpu",
            MetricCategory::Ram => "ram",
            MetricCategory::Disk => "disk",
            MetricCategory::Network => "network",
            MetricCategory::Processes => "processes",
            MetricCategory::Services => "services",
            MetricCategory::Apps => "apps",
            MetricCategory::Uptime => "uptime",
        }
    }

    /// Display label shown by the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            MetricCategory::Cpu => "CPU Usage",
            MetricCategory::Ram => "RAM Usage",
            MetricCategory::Disk => "Disk Usage",
            MetricCategory::Network => "Network I/O",
            MetricCategory::Processes => "Active Processes",
            MetricCategory::Services => "System Services",
            MetricCategory::Apps => "Installed Applications",
            MetricCategory::Uptime => "Uptime & Load",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPreference {
    pub id: MetricCategory,
    pub name: String,
    pub enabled: bool,
}

/// Full preference set for one user, one entry per category in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserPreferenceSet(pub Vec<MetricPreference>);

impl Default for UserPreferenceSet {
    fn default() -> Self {
        Self(
            MetricCategory::ALL
                .into_iter()
                .map(|id| MetricPreference {
                    id,
                    name: id.label().to_string(),
                    enabled: true,
                })
                .collect(),
        )
    }
}

impl UserPreferenceSet {
    pub fn get(&self, id: MetricCategory) -> Option<bool> {
        self.0.iter().find(|p| p.id == id).map(|p| p.enabled)
    }
}

fn default_enabled() -> bool {
    true
}

/// One `{metric_id, enabled}` entry of a PUT /preferences body. `metric_id` stays a raw
/// string so that unknown ids are skipped instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    pub metric_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl PreferenceUpdate {
    /// `None` for ids outside the fixed category set.
    pub fn category(&self) -> Option<MetricCategory> {
        self.metric_id.parse().ok()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdateRequest {
    #[serde(default)]
    pub preferences: Vec<PreferenceUpdate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_is_all_enabled_in_order() {
        let set = UserPreferenceSet::default();
        assert_eq!(set.0.len(), 8);
        assert_eq!(set.0[0].id, MetricCategory::Cpu);
        assert_eq!(set.0[7].id, MetricCategory::Uptime);
        assert!(set.0.iter().all(|p| p.enabled));
    }

    #[test]
    fn unknown_update_ids_have_no_category() {
        let update = |id: &str| PreferenceUpdate {
            metric_id: id.into(),
            enabled: false,
        };
        assert_eq!(update("disk").category(), Some(MetricCategory::Disk));
        assert_eq!(update("gpu").category(), None);
        assert_eq!(update("").category(), None);
    }

    #[test]
    fn update_enabled_defaults_to_true() {
        let req: PreferencesUpdateRequest =
            serde_json::from_str(r#"{"preferences":[{"metric_id":"cpu"}]}"#).unwrap();
        assert!(req.preferences[0].enabled);
    }

    #[test]
    fn category_round_trips_through_str() {
        for c in MetricCategory::ALL {
            assert_eq!(c.as_str().parse::<MetricCategory>(), Ok(c));
        }
        assert!("CPU".parse::<MetricCategory>().is_err());
    }
}
