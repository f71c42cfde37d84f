use log::debug;

use crate::case::{BusType, Case, CaseBus};
use crate::context::ConversionContext;
use crate::lookup::ElementKind;
use crate::network::{Network, SwitchElement};

/// Materializes auxiliary buses for open bus-branch switches: the
/// switched branch end is rerouted to a fresh out-of-service bus, which
/// takes the branch out of the internal case without touching the
/// remaining connections of the original bus.
///
/// Auxiliary buses always get fresh ids appended after the modeled
/// buses; an existing id is never reused. Bus-bus switches are the
/// domain of the topology merging collaborator and are ignored here.
pub fn switch_branches(net: &Network, ctx: &mut ConversionContext) {
    let n_lines = net.line.len();
    let mut n_aux = 0;

    for sw in net.switch.iter() {
        if sw.closed {
            continue;
        }
        let branch_row = match sw.et {
            SwitchElement::Bus => continue,
            SwitchElement::Line => sw.element,
            SwitchElement::Trafo => n_lines + sw.element,
        };
        if branch_row >= ctx.case.branch.len() {
            continue;
        }
        let Some(bus_row) = ctx.lookups.get(ElementKind::Bus, sw.bus) else {
            continue;
        };

        let aux = add_aux_bus(&mut ctx.case, bus_row);
        n_aux += 1;
        let br = &mut ctx.case.branch[branch_row];
        if br.from_bus == bus_row {
            br.from_bus = aux;
        } else if br.to_bus == bus_row {
            br.to_bus = aux;
        }
    }

    if n_aux > 0 {
        debug!("added {} auxiliary buses for open switches", n_aux);
    }
}

/// Handles branches touching out-of-service buses: a branch with both
/// endpoints out of service is forced out of service itself; a branch
/// with one out-of-service endpoint is rerouted to a fresh auxiliary
/// bus so the shared bus row stays untouched by later status changes.
pub fn branches_with_oos_buses(ctx: &mut ConversionContext) {
    for i in 0..ctx.case.branch.len() {
        if !ctx.case.branch[i].status {
            continue;
        }
        let from = ctx.case.branch[i].from_bus;
        let to = ctx.case.branch[i].to_bus;
        let from_oos = !ctx.case.bus[from].is_in_service();
        let to_oos = !ctx.case.bus[to].is_in_service();

        if from_oos && to_oos {
            ctx.case.branch[i].status = false;
        } else if from_oos {
            let aux = add_aux_bus(&mut ctx.case, from);
            ctx.case.branch[i].from_bus = aux;
        } else if to_oos {
            let aux = add_aux_bus(&mut ctx.case, to);
            ctx.case.branch[i].to_bus = aux;
        }
    }
}

/// Appends an out-of-service auxiliary bus mirroring the voltage level
/// of `template` and returns its id.
fn add_aux_bus(case: &mut Case, template: usize) -> usize {
    let id = case.bus.len();
    let t = &case.bus[template];
    let aux = CaseBus {
        id,
        bus_type: BusType::Isolated,
        pd: 0.0,
        qd: 0.0,
        gs: 0.0,
        bs: 0.0,
        area: t.area,
        vm: 1.0,
        va: 0.0,
        base_kv: t.base_kv,
        zone: t.zone,
        vmax: t.vmax,
        vmin: t.vmin,
    };
    case.bus.push(aux);
    id
}
