//! Editor configuration.
//!
//! Every section has working defaults, so an empty TOML file (or none at all)
//! yields the stock editor. Lengths are in scene units unless a field name
//! ends in `_cells`, in which case it is a multiple of the grid pitch.

use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::{DiagramError, Result};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub grid_pitch: f64,
    pub geometry: GeometryConfig,
    pub optimizer: OptimizerSettings,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_pitch: 20.0,
            geometry: GeometryConfig::default(),
            optimizer: OptimizerSettings::default(),
        }
    }
}

impl EditorConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: EditorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config file {path}"))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.grid_pitch.is_finite() || self.grid_pitch <= 0.0 {
            return Err(DiagramError::InvalidConfig(format!(
                "grid_pitch must be positive, got {}",
                self.grid_pitch
            )));
        }
        self.optimizer.validate()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Minimum block width.
    pub standard_block_width_cells: f64,
    /// From the block top to the first pin anchor.
    pub pin_top_padding_cells: f64,
    /// From the last pin anchor to the block bottom.
    pub pin_bottom_padding_cells: f64,
    /// Between consecutive pin anchors on one side.
    pub pin_spacing_cells: f64,
    /// Height of a block without pins.
    pub empty_block_height_cells: f64,
    /// Space reserved next to a pin label, on each side.
    pub pin_label_padding: f64,
    /// Horizontal padding around the block title.
    pub title_padding: f64,
    /// Per-character metrics used by [`crate::geometry::MonospaceMeasurer`].
    pub char_width: f64,
    pub char_height: f64,
    /// Side of the square a diagram pin occupies around its anchor.
    pub diagram_pin_size: f64,
    pub super_block_margin_x: f64,
    pub super_block_margin_y: f64,
    /// Radius of the spiral search for a free block spot.
    pub placement_search_radius_cells: f64,
    /// Keep diagram inputs and outputs spread along the super block edges.
    pub auto_align_diagram_pins: bool,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            standard_block_width_cells: 8.0,
            pin_top_padding_cells: 1.0,
            pin_bottom_padding_cells: 1.0,
            pin_spacing_cells: 1.0,
            empty_block_height_cells: 2.0,
            pin_label_padding: 10.0,
            title_padding: 10.0,
            char_width: 7.0,
            char_height: 14.0,
            diagram_pin_size: 12.0,
            super_block_margin_x: 120.0,
            super_block_margin_y: 40.0,
            placement_search_radius_cells: 500.0,
            auto_align_diagram_pins: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Optimizer
// ────────────────────────────────────────────────────────────────────────────

/// Search strategy for [`crate::optimize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Accept only strictly improving moves.
    HillClimbing,
    /// Accept worse moves with probability `exp(-delta / T)`.
    SimulatedAnnealing {
        initial_temperature: f64,
        cooling_rate: f64,
    },
}

impl Strategy {
    pub fn annealing() -> Self {
        Strategy::SimulatedAnnealing {
            initial_temperature: 10.0,
            cooling_rate: 0.995,
        }
    }

    /// Iteration count used when a caller picks a strategy but no budget.
    pub fn default_iterations(&self) -> usize {
        match self {
            Strategy::HillClimbing => 200,
            Strategy::SimulatedAnnealing { .. } => 1500,
        }
    }
}

/// How long an optimization run may take. Whichever limit hits first wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    pub max_iterations: usize,
    #[serde(with = "optional_millis")]
    pub time_limit: Option<Duration>,
}

impl Default for Budget {
    fn default() -> Self {
        Self::iterations(Strategy::HillClimbing.default_iterations())
    }
}

impl Budget {
    pub fn iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            time_limit: None,
        }
    }

    /// Wall-clock bound; the iteration count is effectively unlimited.
    pub fn time(limit: Duration) -> Self {
        Self {
            max_iterations: usize::MAX,
            time_limit: Some(limit),
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub intersection_weight: f64,
    pub wirelength_weight: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            intersection_weight: 100.0,
            wirelength_weight: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub strategy: Strategy,
    pub budget: Budget,
    pub seed: u64,
    /// Largest block displacement per move, in grid cells.
    pub move_step_cells: u32,
    pub weights: CostWeights,
    /// Stop once this many sweeps over the candidate moves found no new best.
    pub stall_sweeps: usize,
    /// Emit a progress trace every this many iterations.
    pub reporting_interval: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::HillClimbing,
            budget: Budget::default(),
            seed: 0,
            move_step_cells: 8,
            weights: CostWeights::default(),
            stall_sweeps: 20,
            reporting_interval: 20,
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.budget.max_iterations == 0 && self.budget.time_limit.is_none() {
            return Err(DiagramError::InvalidConfig(
                "optimizer budget allows no iterations".to_string(),
            ));
        }
        if self.move_step_cells == 0 {
            return Err(DiagramError::InvalidConfig(
                "move_step_cells must be at least 1".to_string(),
            ));
        }
        if let Strategy::SimulatedAnnealing {
            initial_temperature,
            cooling_rate,
        } = self.strategy
        {
            let temperature_ok = initial_temperature.is_finite() && initial_temperature > 0.0;
            if !temperature_ok || !(0.0..1.0).contains(&cooling_rate) || cooling_rate == 0.0 {
                return Err(DiagramError::InvalidConfig(format!(
                    "annealing needs T0 > 0 and 0 < cooling < 1, got {initial_temperature} / {cooling_rate}"
                )));
            }
        }
        Ok(())
    }
}
