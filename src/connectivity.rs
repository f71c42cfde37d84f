use log::debug;
use std::collections::HashSet;

use crate::case::{BusType, Case};

/// Finds in-service buses with no in-service path to any reference bus.
/// Breadth-first search over the branch table; the case itself is not
/// mutated. Returned ids are external case bus ids.
pub fn check_connectivity(case: &Case) -> HashSet<usize> {
    let nb = case.bus.len();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); nb];
    for br in case.branch.iter() {
        if !br.status {
            continue;
        }
        if case.bus[br.from_bus].is_in_service() && case.bus[br.to_bus].is_in_service() {
            adj[br.from_bus].push(br.to_bus);
            adj[br.to_bus].push(br.from_bus);
        }
    }

    let mut visited = vec![false; nb];
    let mut queue: Vec<usize> = case
        .bus
        .iter()
        .filter(|b| b.bus_type == BusType::Ref)
        .map(|b| b.id)
        .collect();
    for &b in &queue {
        visited[b] = true;
    }
    while let Some(b) = queue.pop() {
        for &next in &adj[b] {
            if !visited[next] {
                visited[next] = true;
                queue.push(next);
            }
        }
    }

    let isolated: HashSet<usize> = case
        .bus
        .iter()
        .filter(|b| b.is_in_service() && !visited[b.id])
        .map(|b| b.id)
        .collect();
    if !isolated.is_empty() {
        debug!("{} isolated buses without a path to a reference bus", isolated.len());
    }
    isolated
}

/// Forces out of service any bus that touches no in-service branch and
/// plays no reference role. Such buses carry nothing the solver could
/// balance against.
pub fn set_isolated_buses_out_of_service(case: &mut Case) {
    let mut touched = vec![false; case.bus.len()];
    for br in case.branch.iter() {
        if br.status {
            touched[br.from_bus] = true;
            touched[br.to_bus] = true;
        }
    }
    for b in case.bus.iter_mut() {
        if b.is_in_service() && !touched[b.id] && b.bus_type != BusType::Ref {
            b.bus_type = BusType::Isolated;
        }
    }
}
