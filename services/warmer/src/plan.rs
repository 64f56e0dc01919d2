//! Warming plans: the flat list of computations to pre-compute.
//!
//! A plan file is YAML:
//!
//! ```yaml
//! computations:
//!   - kind: cloud_cover
//!     start: 1990-01-01
//!     end: 2000-01-01
//!   - kind: mean_daily_stats
//!     band: maximum_2m_air_temperature
//!     filter: { start_day: 1, end_day: 79 }
//!   - kind: mean_wind_speed
//!     date: 2004-07-19
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use statistics::{Computation, StatisticContext};

/// Ordered computations to warm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarmPlan {
    #[serde(default)]
    pub computations: Vec<Computation>,
}

impl WarmPlan {
    /// Everything the full statistic set depends on.
    pub fn full(ctx: &StatisticContext) -> Result<Self> {
        Ok(Self {
            computations: ctx.default_plan()?,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("invalid warming plan")
    }

    /// Load a plan file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read plan {}", path.display()))?;
        let plan = Self::from_yaml(&content).with_context(|| format!("in {}", path.display()))?;
        info!(path = %path.display(), computations = plan.len(), "Loaded warming plan");
        Ok(plan)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to render warming plan")
    }

    pub fn len(&self) -> usize {
        self.computations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.computations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statistics::PrecipitationKind;

    #[test]
    fn test_parse_plan() {
        let yaml = r#"
computations:
  - kind: cloud_cover
    start: 1990-01-01
    end: 2000-01-01
  - kind: mean_daily_stats
    band: maximum_2m_air_temperature
    filter: { start_day: 1, end_day: 79 }
  - kind: mean_daily_stats
    band: minimum_2m_air_temperature
  - kind: precipitation
    start: 1990-01-01
    end: 1991-01-01
    precipitation: snow
  - kind: high_dewpoint
    date: 2004-07-19
"#;
        let plan = WarmPlan::from_yaml(yaml).unwrap();
        assert_eq!(plan.len(), 5);
        assert!(matches!(
            &plan.computations[1],
            Computation::MeanDailyStats { filter: Some(f), .. } if f.end_day == 79
        ));
        assert!(matches!(&plan.computations[2], Computation::MeanDailyStats { filter: None, .. }));
        assert!(matches!(
            &plan.computations[3],
            Computation::Precipitation { precipitation: PrecipitationKind::Snow, .. }
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let plan = WarmPlan::from_yaml("computations:\n  - kind: mean_wind_speed\n    date: 2001-01-02\n").unwrap();
        let again = WarmPlan::from_yaml(&plan.to_yaml().unwrap()).unwrap();
        assert_eq!(plan, again);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(WarmPlan::from_yaml("computations:\n  - kind: snowfall\n").is_err());
    }

    #[test]
    fn test_empty_plan() {
        let plan = WarmPlan::from_yaml("{}").unwrap();
        assert!(plan.is_empty());
    }
}
