use anyhow::Result;
use camino::Utf8PathBuf;
use rustyblocks::{Budget, Diagram, EditorConfig, Strategy};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn load_config_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
grid_pitch = 10.0

[geometry]
standard_block_width_cells = 12.0
auto_align_diagram_pins = false

[optimizer]
seed = 99
stall_sweeps = 5

[optimizer.budget]
max_iterations = 50
time_limit = 250

[optimizer.strategy.simulated_annealing]
initial_temperature = 3.0
cooling_rate = 0.9
"#
    )?;
    file.flush()?;
    let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf())
        .map_err(|p| anyhow::anyhow!("non UTF-8 temp path {}", p.display()))?;

    let config = EditorConfig::load(&path)?;
    assert_eq!(config.grid_pitch, 10.0);
    assert!(!config.geometry.auto_align_diagram_pins);
    assert_eq!(config.optimizer.seed, 99);
    assert_eq!(
        config.optimizer.budget,
        Budget::iterations(50).with_time_limit(Duration::from_millis(250))
    );
    assert_eq!(
        config.optimizer.strategy,
        Strategy::SimulatedAnnealing {
            initial_temperature: 3.0,
            cooling_rate: 0.9
        }
    );

    // Geometry follows the configured grid and width.
    let mut diagram = Diagram::with_config(config)?;
    let id = diagram.create_block("A", ["in"], ["out"])?;
    assert_eq!(diagram.block(id)?.size.width, 120.0);
    assert_eq!(diagram.block(id)?.size.height, 20.0);
    Ok(())
}

#[test]
fn invalid_values_are_rejected() {
    assert!(EditorConfig::from_toml_str("grid_pitch = 0.0").is_err());
    assert!(EditorConfig::from_toml_str("grid_pitch = -5.0").is_err());
    assert!(EditorConfig::from_toml_str("[optimizer]\nmove_step_cells = 0").is_err());
    assert!(
        EditorConfig::from_toml_str("[optimizer.budget]\nmax_iterations = 0").is_err()
    );
    assert!(EditorConfig::from_toml_str("grid_pitch = \"wide\"").is_err());

    let mut config = EditorConfig::default();
    config.grid_pitch = f64::NAN;
    assert!(Diagram::with_config(config).is_err());
}

#[test]
fn missing_file_is_an_error() {
    let path = Utf8PathBuf::from("/nonexistent/rustyblocks.toml");
    let err = EditorConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("rustyblocks.toml"));
}
