//! Crossing reduction by barycenter sweeps.

use std::collections::HashMap;

pub(super) const SWEEPS: usize = 12;

/// Neighbours of each node across both edge directions.
pub(super) type Neighbours<'a> = HashMap<&'a str, Vec<&'a str>>;

/// Reorder `layers` in place: `SWEEPS` top-down passes, then `SWEEPS`
/// bottom-up passes. The first layer of each pass keeps its order.
pub(super) fn reduce_crossings(layers: &mut [Vec<&str>], neighbours: &Neighbours<'_>) {
    if layers.len() < 2 {
        return;
    }

    for _ in 0..SWEEPS {
        let mut reference: HashMap<&str, f64> = HashMap::new();
        for i in 0..layers.len() {
            if i > 0 {
                sort_by_barycenter(&mut layers[i], &reference, neighbours);
            }
            record_positions(&layers[i], &mut reference);
        }
    }

    for _ in 0..SWEEPS {
        let mut reference: HashMap<&str, f64> = HashMap::new();
        let last = layers.len() - 1;
        for i in (0..layers.len()).rev() {
            if i < last {
                sort_by_barycenter(&mut layers[i], &reference, neighbours);
            }
            record_positions(&layers[i], &mut reference);
        }
    }
}

fn record_positions<'a>(layer: &[&'a str], reference: &mut HashMap<&'a str, f64>) {
    for (idx, id) in layer.iter().enumerate() {
        reference.insert(id, idx as f64);
    }
}

/// Stable sort by the mean reference position of already placed
/// neighbours; nodes without any sort as 0.
fn sort_by_barycenter(
    layer: &mut [&str],
    reference: &HashMap<&str, f64>,
    neighbours: &Neighbours<'_>,
) {
    let barycenter = |id: &str| -> f64 {
        let placed: Vec<f64> = neighbours
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|n| reference.get(n).copied())
            .collect();
        if placed.is_empty() {
            0.0
        } else {
            placed.iter().sum::<f64>() / placed.len() as f64
        }
    };

    let mut keyed: Vec<(f64, &str)> = layer.iter().map(|id| (barycenter(id), *id)).collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (slot, (_, id)) in layer.iter_mut().zip(keyed) {
        *slot = id;
    }
}
