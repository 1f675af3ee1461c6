//! Part interchange JSON.
//!
//! A part document describes one structural part: its own ports, the inner
//! parts it contains and the connections between them. Importing builds a
//! [`Diagram`] where the part's ports become diagram pins, each inner part
//! becomes a block named `"{identifier}:{class}"` and each connection becomes
//! a wire. A connection endpoint whose `part_id` equals the top-level
//! identifier refers to a diagram pin.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::diagram::Diagram;
use crate::model::{BlockId, Direction, Endpoint};

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDocument {
    pub format_version: String,
    pub part: Part,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub identifier: String,
    pub class: String,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub inner_parts: Vec<InnerPart>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerPart {
    pub identifier: String,
    pub class: String,
    #[serde(default)]
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: PortRef,
    pub destination: PortRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRef {
    pub part_id: String,
    pub port_id: String,
}

impl PartDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: PartDocument =
            serde_json::from_str(json).context("Failed to parse part document")?;
        if doc.format_version != FORMAT_VERSION {
            warn!(
                found = doc.format_version.as_str(),
                expected = FORMAT_VERSION;
                "Unexpected part document version"
            );
        }
        Ok(doc)
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).with_context(|| format!("Read {}", path))?;
        Self::from_json(&json).with_context(|| format!("Failed to parse {}", path))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a fresh diagram from this document.
    pub fn to_diagram(&self, config: EditorConfig) -> Result<Diagram> {
        let mut diagram = Diagram::with_config(config)?;
        import_part(&mut diagram, &self.part)?;
        Ok(diagram)
    }
}

fn ports_of(ports: &[Port], direction: Direction) -> Vec<&str> {
    ports
        .iter()
        .filter(|p| p.direction == direction)
        .map(|p| p.name.as_str())
        .collect()
}

/// Add the contents of `part` to `diagram`.
pub fn import_part(diagram: &mut Diagram, part: &Part) -> Result<()> {
    for port in &part.ports {
        let created = match port.direction {
            Direction::Input => diagram.create_diagram_input(&port.name),
            Direction::Output => diagram.create_diagram_output(&port.name),
        };
        created.with_context(|| format!("Creating diagram {} '{}'", port.direction, port.name))?;
    }

    let mut blocks: HashMap<&str, BlockId> = HashMap::new();
    for inner in &part.inner_parts {
        if blocks.contains_key(inner.identifier.as_str()) {
            bail!("Inner part '{}' is listed twice", inner.identifier);
        }
        let name = format!("{}:{}", inner.identifier, inner.class);
        let id = diagram
            .create_block(
                &name,
                ports_of(&inner.ports, Direction::Input),
                ports_of(&inner.ports, Direction::Output),
            )
            .with_context(|| format!("Creating block '{}'", name))?;
        blocks.insert(inner.identifier.as_str(), id);
    }

    let resolve = |diagram: &Diagram, port: &PortRef, role: Direction| -> Option<Endpoint> {
        if port.part_id == part.identifier {
            // A diagram pin feeds wires the opposite way round from its label.
            diagram
                .diagram_pin_by_name(role.opposite(), &port.port_id)
                .ok()
                .map(Endpoint::Diagram)
        } else {
            let block = *blocks.get(port.part_id.as_str())?;
            let pin = diagram.pin_by_name(block, &port.port_id).ok()?;
            Some(Endpoint::Block(pin))
        }
    };

    let mut skipped = 0;
    for connection in &part.connections {
        let source = resolve(diagram, &connection.source, Direction::Output);
        let destination = resolve(diagram, &connection.destination, Direction::Input);
        let (Some(source), Some(destination)) = (source, destination) else {
            warn!(
                source:? = connection.source,
                destination:? = connection.destination;
                "Skipping connection with unknown endpoint"
            );
            skipped += 1;
            continue;
        };
        diagram.create_wire(source, destination).with_context(|| {
            format!(
                "Connecting {}.{} to {}.{}",
                connection.source.part_id,
                connection.source.port_id,
                connection.destination.part_id,
                connection.destination.port_id
            )
        })?;
    }

    info!(
        part = part.identifier.as_str(),
        blocks = blocks.len(),
        wires = diagram.store().wire_count(),
        skipped = skipped;
        "Imported part"
    );
    Ok(())
}

/// Split a block name of the form `identifier:class`. Names without a colon
/// export as their own identifier with class `Block`.
fn split_block_name(name: &str) -> (&str, &str) {
    name.rsplit_once(':').unwrap_or((name, "Block"))
}

/// Describe `diagram` as a part document.
pub fn export_part(diagram: &Diagram, identifier: &str, class: &str) -> Result<PartDocument> {
    let store = diagram.store();
    let ports = store
        .diagram_pins_of(Direction::Input)
        .into_iter()
        .chain(store.diagram_pins_of(Direction::Output))
        .map(|id| -> Result<Port> {
            let pin = store.diagram_pin(id)?;
            Ok(Port {
                name: pin.name.clone(),
                direction: pin.direction,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut inner_parts = Vec::with_capacity(store.block_count());
    for block in store.blocks() {
        let (inner_id, inner_class) = split_block_name(&block.name);
        let mut ports = Vec::new();
        for pin in block.inputs.iter().chain(&block.outputs) {
            let pin = store.pin(*pin)?;
            ports.push(Port {
                name: pin.name.clone(),
                direction: pin.direction,
            });
        }
        inner_parts.push(InnerPart {
            identifier: inner_id.to_string(),
            class: inner_class.to_string(),
            ports,
        });
    }

    let port_ref = |endpoint: Endpoint| -> Result<PortRef> {
        Ok(match endpoint {
            Endpoint::Block(id) => {
                let pin = store.pin(id)?;
                let owner = store.block(pin.owner)?;
                PortRef {
                    part_id: split_block_name(&owner.name).0.to_string(),
                    port_id: pin.name.clone(),
                }
            }
            Endpoint::Diagram(id) => PortRef {
                part_id: identifier.to_string(),
                port_id: store.diagram_pin(id)?.name.clone(),
            },
        })
    };
    let connections = store
        .wires()
        .map(|w| -> Result<Connection> {
            Ok(Connection {
                source: port_ref(w.source)?,
                destination: port_ref(w.destination)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PartDocument {
        format_version: FORMAT_VERSION.to_string(),
        part: Part {
            identifier: identifier.to_string(),
            class: class.to_string(),
            ports,
            inner_parts,
            connections,
        },
    })
}
