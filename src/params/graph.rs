// ABOUTME: Prompt ordering for parameters that reference each other.
// ABOUTME: Stable topological sort with cycle and unknown-reference detection.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::error::ParamError;
use crate::template::ParamDef;

/// Order `queued` so referenced parameters come first.
///
/// `satisfied` holds names that already have a value and create no edge;
/// `declared` holds every parameter name of the template. Ties keep
/// declaration order. Returns indices into `queued`.
pub fn prompt_order(
    queued: &[&ParamDef],
    satisfied: &HashSet<&str>,
    declared: &HashSet<&str>,
) -> Result<Vec<usize>, ParamError> {
    let index: HashMap<&str, usize> = queued
        .iter()
        .enumerate()
        .map(|(i, def)| (def.name.as_str(), i))
        .collect();

    // dependents[i] = parameters that must wait for i
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); queued.len()];
    let mut pending: Vec<usize> = vec![0; queued.len()];

    for (i, def) in queued.iter().enumerate() {
        for reference in def.metadata.references() {
            if !declared.contains(reference.as_str()) {
                return Err(ParamError::UnknownReference {
                    parameter: def.name.clone(),
                    reference,
                });
            }
            if satisfied.contains(reference.as_str()) {
                continue;
            }
            if let Some(&dep) = index.get(reference.as_str()) {
                dependents[dep].push(i);
                pending[i] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..queued.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(queued.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < queued.len() {
        let path = find_cycle(queued, &dependents, &pending);
        return Err(ParamError::DependencyCycle { path });
    }

    Ok(order)
}

/// Describe one cycle among the nodes left unprocessed, as `a -> b -> a`.
fn find_cycle(queued: &[&ParamDef], dependents: &[Vec<usize>], pending: &[usize]) -> String {
    // Walk "depends on" edges, which is the reverse of `dependents`.
    let mut depends_on: Vec<Vec<usize>> = vec![Vec::new(); queued.len()];
    for (dep, list) in dependents.iter().enumerate() {
        for &d in list {
            depends_on[d].push(dep);
        }
    }

    let Some(start) = (0..queued.len()).find(|&i| pending[i] > 0) else {
        return String::new();
    };

    // Every unprocessed node has an unprocessed predecessor, so walking
    // them must revisit a node.
    let mut seen: HashMap<usize, usize> = HashMap::new();
    let mut walk = vec![start];
    let mut current = start;
    loop {
        seen.insert(current, walk.len() - 1);
        let Some(&next) = depends_on[current].iter().find(|&&n| pending[n] > 0) else {
            break;
        };
        if let Some(&pos) = seen.get(&next) {
            let mut cycle: Vec<&str> = walk[pos..]
                .iter()
                .map(|&i| queued[i].name.as_str())
                .collect();
            cycle.push(cycle[0]);
            return cycle.join(" -> ");
        }
        walk.push(next);
        current = next;
    }

    queued[start].name.clone()
}
