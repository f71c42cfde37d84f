use std::collections::HashSet;

use crate::network::Network;
use crate::options::{ConvertOptions, Mode};

/// Resolved in-service masks, one per element table, indexed by table
/// row. An element is in service iff its own status flag is set and
/// every bus it touches is in service and not isolated.
///
/// Dispatchable static generators, loads and storages are split out of
/// the static masks in OPF mode: they enter the generator table instead
/// of the PQ sums.
#[derive(Debug, Default, Clone)]
pub struct IsElements {
    pub bus: Vec<bool>,

    /// Bus service status addressed by bus id rather than table row.
    pub bus_by_id: Vec<bool>,

    pub ext_grid: Vec<bool>,
    pub gen: Vec<bool>,
    pub sgen: Vec<bool>,
    pub load: Vec<bool>,
    pub storage: Vec<bool>,

    pub sgen_ctrl: Vec<bool>,
    pub load_ctrl: Vec<bool>,
    pub storage_ctrl: Vec<bool>,
}

impl IsElements {
    pub fn n_ext_grid(&self) -> usize {
        count(&self.ext_grid)
    }

    pub fn n_gen(&self) -> usize {
        count(&self.gen)
    }

    pub fn n_sgen_ctrl(&self) -> usize {
        count(&self.sgen_ctrl)
    }

    pub fn n_load_ctrl(&self) -> usize {
        count(&self.load_ctrl)
    }

    pub fn n_storage_ctrl(&self) -> usize {
        count(&self.storage_ctrl)
    }
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| m).count()
}

/// Resolves the in-service element sets. `isolated` holds bus ids that
/// connectivity checking has excluded on top of the user status flags;
/// pass an empty set on the first pass.
pub fn select_is_elements(
    net: &Network,
    opts: &ConvertOptions,
    isolated: &HashSet<usize>,
) -> IsElements {
    let mut bus_by_id = vec![false; net.bus_id_range()];
    let bus: Vec<bool> = net
        .bus
        .iter()
        .map(|b| b.in_service && !isolated.contains(&b.index))
        .collect();
    for (b, &is) in net.bus.iter().zip(&bus) {
        bus_by_id[b.index] = is;
    }
    // A dangling bus reference reads as out of service rather than panicking.
    let bus_is = |id: usize| bus_by_id.get(id).copied().unwrap_or(false);

    let opf = opts.mode == Mode::Opf;

    let ext_grid = net
        .ext_grid
        .iter()
        .map(|eg| eg.in_service && bus_is(eg.bus))
        .collect();
    let gen = net
        .gen
        .iter()
        .map(|g| g.in_service && bus_is(g.bus))
        .collect();

    let sgen: Vec<bool> = net
        .sgen
        .iter()
        .map(|s| s.in_service && bus_is(s.bus) && !(opf && s.controllable))
        .collect();
    let sgen_ctrl = net
        .sgen
        .iter()
        .map(|s| opf && s.controllable && s.in_service && bus_is(s.bus))
        .collect();

    let load: Vec<bool> = net
        .load
        .iter()
        .map(|l| l.in_service && bus_is(l.bus) && !(opf && l.controllable))
        .collect();
    let load_ctrl = net
        .load
        .iter()
        .map(|l| opf && l.controllable && l.in_service && bus_is(l.bus))
        .collect();

    let storage: Vec<bool> = net
        .storage
        .iter()
        .map(|s| s.in_service && bus_is(s.bus) && !(opf && s.controllable))
        .collect();
    let storage_ctrl = net
        .storage
        .iter()
        .map(|s| opf && s.controllable && s.in_service && bus_is(s.bus))
        .collect();

    IsElements {
        bus,
        bus_by_id,
        ext_grid,
        gen,
        sgen,
        load,
        storage,
        sgen_ctrl,
        load_ctrl,
        storage_ctrl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Bus, ExtGrid, Load, Network, Sgen};
    use crate::options::{ConvertOptionsBuilder, Mode};

    fn two_bus_net() -> Network {
        let mut net = Network::new(100.0);
        net.bus.push(Bus {
            index: 1,
            vn_kv: 110.0,
            ..Default::default()
        });
        net.bus.push(Bus {
            index: 5,
            vn_kv: 110.0,
            in_service: false,
            ..Default::default()
        });
        net.ext_grid.push(ExtGrid {
            bus: 1,
            ..Default::default()
        });
        net.load.push(Load {
            bus: 5,
            p_mw: 10.0,
            ..Default::default()
        });
        net
    }

    #[test]
    fn out_of_service_bus_cascades_to_elements() {
        let net = two_bus_net();
        let opts = ConvertOptions::default();
        let is = select_is_elements(&net, &opts, &HashSet::new());

        assert_eq!(is.bus, vec![true, false]);
        assert!(is.bus_by_id[1]);
        assert!(!is.bus_by_id[5]);
        assert_eq!(is.ext_grid, vec![true]);
        assert_eq!(is.load, vec![false]);
    }

    #[test]
    fn isolated_set_overrides_user_status() {
        let mut net = two_bus_net();
        net.bus[1].in_service = true;
        let opts = ConvertOptions::default();
        let isolated = HashSet::from([1]);
        let is = select_is_elements(&net, &opts, &isolated);

        assert_eq!(is.bus, vec![false, true]);
        assert_eq!(is.ext_grid, vec![false]);
    }

    #[test]
    fn controllable_elements_split_in_opf_mode() {
        let mut net = two_bus_net();
        net.bus[1].in_service = true;
        net.sgen.push(Sgen {
            bus: 1,
            p_mw: 2.0,
            controllable: true,
            ..Default::default()
        });

        let pf = ConvertOptions::default();
        let is = select_is_elements(&net, &pf, &HashSet::new());
        assert_eq!(is.sgen, vec![true]);
        assert_eq!(is.sgen_ctrl, vec![false]);

        let opf = ConvertOptionsBuilder::default()
            .mode(Mode::Opf)
            .build()
            .unwrap();
        let is = select_is_elements(&net, &opf, &HashSet::new());
        assert_eq!(is.sgen, vec![false]);
        assert_eq!(is.sgen_ctrl, vec![true]);
    }
}
