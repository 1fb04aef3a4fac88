use crate::measure::TableMetrics;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config value for `{key}`: {value}")]
    Invalid { key: &'static str, value: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub interaction: InteractionConfig,
}

/// Tuning of the two-level force layout. Repulsion is deliberately strong
/// and edge attraction weak: spacing matters more than compactness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Fixed simulation seed. `None` draws a fresh one per layout.
    pub seed: Option<u64>,
    pub metrics: TableMetrics,

    // Simulation
    pub alpha_min: f64,
    pub velocity_decay: f64,
    /// Extra clearance added to every table's collision radius.
    pub collision_padding: f64,

    // Stage 1: tables inside a group
    pub intra_ticks: usize,
    pub intra_spread: f64,
    pub intra_charge: f64,
    pub intra_link_distance: f64,
    pub intra_link_strength: f64,
    pub intra_center_strength: f64,

    // Stage 2: groups and standalone tables
    pub top_ticks: usize,
    pub top_restarts: usize,
    pub top_initial_alpha: f64,
    pub top_spread_x: f64,
    pub top_spread_y: f64,
    pub top_charge: f64,
    pub top_collide_iterations: usize,
    pub top_position_strength: f64,
    pub top_link_strength: f64,
    pub group_link_min_distance: f64,
    pub link_min_distance: f64,
    pub table_collision_min_radius: f64,

    // Group boxes
    pub group_padding: f64,
    pub group_header_height: f64,
    pub group_safety_margin: f64,
    pub group_min_width: f64,
    pub group_min_height: f64,
    /// Estimated table height per member used before the grid is known.
    pub provisional_member_height: f64,

    // Final separation of top-level boxes
    pub separation_gap: f64,
    pub separation_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: None,
            metrics: TableMetrics::default(),

            alpha_min: 0.001,
            velocity_decay: 0.4,
            collision_padding: 20.0,

            intra_ticks: 500,
            intra_spread: 2000.0,
            intra_charge: -6000.0,
            intra_link_distance: 600.0,
            intra_link_strength: 0.2,
            intra_center_strength: 0.05,

            top_ticks: 2000,
            top_restarts: 3,
            top_initial_alpha: 2.0,
            top_spread_x: 2000.0,
            top_spread_y: 1000.0,
            top_charge: -3000.0,
            top_collide_iterations: 5,
            top_position_strength: 0.2,
            top_link_strength: 0.05,
            group_link_min_distance: 1500.0,
            link_min_distance: 1000.0,
            table_collision_min_radius: 320.0,

            group_padding: 80.0,
            group_header_height: 40.0,
            group_safety_margin: 100.0,
            group_min_width: 800.0,
            group_min_height: 600.0,
            provisional_member_height: 300.0,

            separation_gap: 40.0,
            separation_passes: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
    /// Drop positions snap to multiples of this value on both axes.
    pub grid_size: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self { grid_size: 20.0 }
    }
}

/// Load a JSON config file; missing keys keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(json: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Reject values the layout cannot work with: non-finite numbers,
    /// negative sizes and spreads, and an alpha floor outside (0, 1).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.layout;
        let m = &l.metrics;
        let non_negative = [
            ("charWidth", m.char_width),
            ("tableWidth", m.table_width),
            ("headerHeight", m.header_height),
            ("rowHeight", m.row_height),
            ("paddingX", m.padding_x),
            ("collisionPadding", l.collision_padding),
            ("intraSpread", l.intra_spread),
            ("intraLinkDistance", l.intra_link_distance),
            ("topSpreadX", l.top_spread_x),
            ("topSpreadY", l.top_spread_y),
            ("groupLinkMinDistance", l.group_link_min_distance),
            ("linkMinDistance", l.link_min_distance),
            ("tableCollisionMinRadius", l.table_collision_min_radius),
            ("groupPadding", l.group_padding),
            ("groupHeaderHeight", l.group_header_height),
            ("groupSafetyMargin", l.group_safety_margin),
            ("groupMinWidth", l.group_min_width),
            ("groupMinHeight", l.group_min_height),
            ("provisionalMemberHeight", l.provisional_member_height),
            ("separationGap", l.separation_gap),
            ("gridSize", self.interaction.grid_size),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid { key, value });
            }
        }

        let finite = [
            ("velocityDecay", l.velocity_decay),
            ("intraCharge", l.intra_charge),
            ("intraLinkStrength", l.intra_link_strength),
            ("intraCenterStrength", l.intra_center_strength),
            ("topInitialAlpha", l.top_initial_alpha),
            ("topCharge", l.top_charge),
            ("topPositionStrength", l.top_position_strength),
            ("topLinkStrength", l.top_link_strength),
        ];
        for (key, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::Invalid { key, value });
            }
        }

        if !(l.alpha_min > 0.0 && l.alpha_min < 1.0) {
            return Err(ConfigError::Invalid {
                key: "alphaMin",
                value: l.alpha_min,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.interaction.grid_size, 20.0);
        assert_eq!(config.layout.intra_ticks, 500);
    }

    #[test]
    fn test_partial_override() {
        let config = parse_config(
            r#"{"layout": {"seed": 7, "topRestarts": 1, "metrics": {"tableWidth": 300}},
                "interaction": {"gridSize": 25}}"#,
        )
        .unwrap();
        assert_eq!(config.layout.seed, Some(7));
        assert_eq!(config.layout.top_restarts, 1);
        assert_eq!(config.layout.top_ticks, 2000);
        assert_eq!(config.layout.metrics.table_width, 300.0);
        assert_eq!(config.layout.metrics.row_height, 40.0);
        assert_eq!(config.interaction.grid_size, 25.0);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = parse_config(r#"{"layout": {"intraSpread": -10, "seed": 1}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "intraSpread", .. }));
        assert!(matches!(
            parse_config(r#"{"layout": {"topSpreadY": -1}}"#),
            Err(ConfigError::Invalid { key: "topSpreadY", .. })
        ));
        assert!(matches!(
            parse_config(r#"{"interaction": {"gridSize": -20}}"#),
            Err(ConfigError::Invalid { key: "gridSize", .. })
        ));
        assert!(matches!(
            parse_config(r#"{"layout": {"alphaMin": 0}}"#),
            Err(ConfigError::Invalid { key: "alphaMin", .. })
        ));
        assert!(parse_config(r#"{"layout": {"intraSpread": 0}}"#).is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(parse_config("{"), Err(ConfigError::Json(_))));
        assert!(matches!(
            load_config(Some(Path::new("/definitely/not/here.json"))),
            Err(ConfigError::Io(_))
        ));
    }
}
