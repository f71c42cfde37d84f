use log::debug;
use num_complex::Complex64;

use crate::case::{BusType, CaseBus};
use crate::context::ConversionContext;
use crate::lookup::ElementKind;
use crate::network::Network;
use crate::options::ConvertOptions;
use crate::select::IsElements;

/// Builds the case bus table and the bus lookup. Every modeled bus gets
/// a row; the row position doubles as the external bus id, so the lookup
/// written here maps user ids onto provisional row indices.
pub fn build_bus(
    net: &Network,
    opts: &ConvertOptions,
    ctx: &mut ConversionContext,
    is: &IsElements,
) {
    let mut lookup = vec![None; net.bus_id_range()];

    for (row, (b, &in_service)) in net.bus.iter().zip(&is.bus).enumerate() {
        lookup[b.index] = Some(row);
        ctx.case.bus.push(CaseBus {
            id: row,
            bus_type: if in_service {
                BusType::Pq
            } else {
                BusType::Isolated
            },
            pd: 0.0,
            qd: 0.0,
            gs: 0.0,
            bs: 0.0,
            area: 1,
            vm: opts.init_vm_pu,
            va: 0.0,
            base_kv: b.vn_kv,
            zone: b.zone,
            vmax: b.max_vm_pu,
            vmin: b.min_vm_pu,
        });
    }

    ctx.lookups.write(ElementKind::Bus, lookup);
    debug!("built {} bus rows", ctx.case.bus.len());
}

/// Sums active and reactive power of static loads, static generators and
/// storages onto their host PQ buses. Overwrites any previous sums, so
/// the incremental updater can re-run it on a cached case.
pub fn calc_pq_elements(net: &Network, ctx: &mut ConversionContext, is: &IsElements) {
    for b in ctx.case.bus.iter_mut() {
        b.pd = 0.0;
        b.qd = 0.0;
    }

    for (l, &on) in net.load.iter().zip(&is.load) {
        if !on {
            continue;
        }
        if let Some(row) = ctx.lookups.get(ElementKind::Bus, l.bus) {
            ctx.case.bus[row].pd += l.p_mw * l.scaling;
            ctx.case.bus[row].qd += l.q_mvar * l.scaling;
        }
    }
    for (s, &on) in net.sgen.iter().zip(&is.sgen) {
        if !on {
            continue;
        }
        if let Some(row) = ctx.lookups.get(ElementKind::Bus, s.bus) {
            ctx.case.bus[row].pd -= s.p_mw * s.scaling;
            ctx.case.bus[row].qd -= s.q_mvar * s.scaling;
        }
    }
    for (s, &on) in net.storage.iter().zip(&is.storage) {
        if !on {
            continue;
        }
        if let Some(row) = ctx.lookups.get(ElementKind::Bus, s.bus) {
            ctx.case.bus[row].pd += s.p_mw * s.scaling;
            ctx.case.bus[row].qd += s.q_mvar * s.scaling;
        }
    }
}

/// Sums shunt and ward injections onto the bus rows. Shunt and ward
/// impedance parts land in the shunt admittance columns (consumption
/// convention: positive `q_mvar` lowers `bs`); the ward PQ part adds to
/// the demand columns and so must run after [`calc_pq_elements`].
pub fn calc_shunts(net: &Network, ctx: &mut ConversionContext, is: &IsElements) {
    for b in ctx.case.bus.iter_mut() {
        b.gs = 0.0;
        b.bs = 0.0;
    }

    for sh in net.shunt.iter() {
        if !sh.in_service {
            continue;
        }
        let Some(row) = in_service_row(ctx, sh.bus, is) else {
            continue;
        };
        let steps = sh.step as f64;
        ctx.case.bus[row].gs += sh.p_mw * steps;
        ctx.case.bus[row].bs -= sh.q_mvar * steps;
    }

    for w in net.ward.iter() {
        if !w.in_service {
            continue;
        }
        let Some(row) = in_service_row(ctx, w.bus, is) else {
            continue;
        };
        ctx.case.bus[row].pd += w.ps_mw;
        ctx.case.bus[row].qd += w.qs_mvar;
        ctx.case.bus[row].gs += w.pz_mw;
        ctx.case.bus[row].bs -= w.qz_mvar;
    }
}

/// Adds generator short-circuit impedances as bus shunt admittance
/// (short-circuit mode replaces the PQ sums with these contributions).
pub fn add_gen_impedances(net: &Network, ctx: &mut ConversionContext, is: &IsElements) {
    let base_mva = ctx.case.base_mva;
    for (g, &on) in net.gen.iter().zip(&is.gen) {
        if !on {
            continue;
        }
        let Some(row) = ctx.lookups.get(ElementKind::Bus, g.bus) else {
            continue;
        };
        let sn = g.sn_mva.unwrap_or(base_mva);
        let z = Complex64::new(g.rdss_pu, g.xdss_pu) * (base_mva / sn);
        let y = z.inv();
        ctx.case.bus[row].gs += y.re * base_mva;
        ctx.case.bus[row].bs += y.im * base_mva;
    }
}

/// Adds motor short-circuit impedances, derived from the locked rotor
/// current ratio, as bus shunt admittance.
pub fn add_motor_impedances(net: &Network, ctx: &mut ConversionContext, is: &IsElements) {
    let base_mva = ctx.case.base_mva;
    for m in net.motor.iter() {
        if !m.in_service || m.sn_mva <= 0.0 || m.lrc_pu <= 0.0 {
            continue;
        }
        let Some(row) = in_service_row(ctx, m.bus, is) else {
            continue;
        };
        let z_abs = base_mva / m.sn_mva / m.lrc_pu;
        let x = z_abs / (1.0 + m.rx * m.rx).sqrt();
        let y = Complex64::new(x * m.rx, x).inv();
        ctx.case.bus[row].gs += y.re * base_mva;
        ctx.case.bus[row].bs += y.im * base_mva;
    }
}

fn in_service_row(ctx: &ConversionContext, bus: usize, is: &IsElements) -> Option<usize> {
    if !is.bus_by_id.get(bus).copied().unwrap_or(false) {
        return None;
    }
    ctx.lookups.get(ElementKind::Bus, bus)
}
