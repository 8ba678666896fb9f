//! Circuit validation.

use log::warn;

use crate::error::{Result, VoltaicError};

use super::Circuit;

/// Validate a circuit before solving.
///
/// Checks:
/// - At least one device is connected
/// - Some device touches ground
///
/// Nets touched by fewer than two device terminals are only reported with
/// a warning: a dangling net is legal, but usually a typo in a node name.
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.devices().is_empty() {
        return Err(VoltaicError::topology("Circuit has no devices"));
    }

    let grounded = circuit
        .devices()
        .iter()
        .any(|d| d.nodes().iter().any(|n| n.is_ground()));
    if !grounded {
        return Err(VoltaicError::topology(format!(
            "No device is connected to ground '{}'",
            circuit.ground()
        )));
    }

    for (i, count) in terminal_counts(circuit).into_iter().enumerate() {
        if count < 2 {
            warn!(
                "Node '{}' is connected to {} terminal(s) and may be floating",
                circuit.nodes()[i].id,
                count
            );
        }
    }

    Ok(())
}

/// Number of device terminals on each node, indexed like [`Circuit::nodes`].
pub fn terminal_counts(circuit: &Circuit) -> Vec<usize> {
    let mut counts = vec![0usize; circuit.nodes().len()];
    let position: std::collections::HashMap<_, _> = circuit
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| (node.index, i))
        .collect();
    for device in circuit.devices() {
        for node in device.nodes() {
            if let Some(&i) = position.get(node) {
                counts[i] += 1;
            }
        }
    }
    counts
}
