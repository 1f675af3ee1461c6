use anyhow::Result;
use rustyblocks::{Diagram, Direction, EditorConfig};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_binary_serialization() -> Result<()> {
    let mut config = EditorConfig::default();
    config.optimizer.seed = 42;
    let mut diagram = Diagram::with_config(config)?;
    let a = diagram.create_block("A", ["Control"], ["Data"])?;
    let b = diagram.create_block("B", ["DataIn"], ["DataOut"])?;
    let input = diagram.create_diagram_input("In")?;
    let wire = diagram.create_wire(input, diagram.pin_by_name(a, "Control")?)?;
    diagram.create_wire(diagram.pin_by_name(a, "Data")?, diagram.pin_by_name(b, "DataIn")?)?;
    diagram.set_locked(wire, true)?;
    diagram.set_locked(b, true)?;

    // Create a temporary file
    let temp_file = NamedTempFile::new()?;
    let temp_path = temp_file.path();

    diagram.save_to_binary(temp_path)?;
    let mut loaded = Diagram::load_from_binary(temp_path)?;

    assert_eq!(loaded.snapshot()?, diagram.snapshot()?);
    assert_eq!(loaded.config().optimizer.seed, 42);
    assert!(loaded.is_locked(wire));
    assert!(loaded.is_locked(b));

    // Handles keep working and fresh ones do not collide with old ones.
    let c = loaded.create_block("C", ["x"], Vec::<String>::new())?;
    assert!(c != a && c != b);
    let out = loaded.create_diagram_output("Out")?;
    let data_out = loaded.pin_by_name(b, "DataOut")?;
    loaded.create_wire(data_out, out)?;
    assert_eq!(
        loaded.diagram_pin_by_name(Direction::Output, "Out")?,
        out
    );
    Ok(())
}

#[test]
fn test_rejects_foreign_files() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(b"NOTADIAGRAM\x01\x00\x00\x00")?;
    temp_file.flush()?;
    let err = Diagram::load_from_binary(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("magic"));

    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(b"RUSTYBLK")?;
    temp_file.write_all(&99u32.to_le_bytes())?;
    temp_file.flush()?;
    let err = Diagram::load_from_binary(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("version"));
    Ok(())
}
