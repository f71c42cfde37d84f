use anyhow::{format_err, Result};
use log::debug;
use std::collections::HashMap;

use crate::case::{BusType, Case, CaseGen};
use crate::context::ConversionContext;
use crate::lookup::ElementKind;
use crate::network::Network;
use crate::options::ConvertOptions;
use crate::select::IsElements;

/// Builds the case generator table and marks the host bus of every entry
/// as reference (external grid) or voltage controlled (generator).
///
/// Rows are appended in the fixed category order external grid,
/// generator, controllable static generator, controllable load,
/// controllable storage; the reducer's per-category range computation
/// depends on this order. Must run before the PQ sums so that bus-type
/// classification is final when injections are summed.
///
/// The selection only admits elements whose host bus has a row, so a
/// missed lookup here is an index inconsistency and fails the
/// conversion rather than landing on an arbitrary row.
pub fn build_gen(
    net: &Network,
    opts: &ConvertOptions,
    ctx: &mut ConversionContext,
    is: &IsElements,
) -> Result<()> {
    let base_mva = ctx.case.base_mva;

    for (i, (eg, &on)) in net.ext_grid.iter().zip(&is.ext_grid).enumerate() {
        if !on {
            continue;
        }
        let row = host_row(ctx, eg.bus, "ext_grid", i)?;
        ctx.case.bus[row].bus_type = BusType::Ref;
        ctx.case.bus[row].vm = eg.vm_pu;
        if opts.calculate_voltage_angles {
            ctx.case.bus[row].va = eg.va_degree;
        }
        ctx.case.gen.push(CaseGen {
            bus: row,
            pg: 0.0,
            qg: 0.0,
            qmax: eg.max_q_mvar,
            qmin: eg.min_q_mvar,
            vg: eg.vm_pu,
            mbase: base_mva,
            status: true,
            pmax: eg.max_p_mw,
            pmin: eg.min_p_mw,
        });
    }

    for (i, (g, &on)) in net.gen.iter().zip(&is.gen).enumerate() {
        if !on {
            continue;
        }
        let row = host_row(ctx, g.bus, "gen", i)?;
        if ctx.case.bus[row].bus_type != BusType::Ref {
            ctx.case.bus[row].bus_type = BusType::Pv;
        }
        ctx.case.bus[row].vm = g.vm_pu;
        ctx.case.gen.push(CaseGen {
            bus: row,
            pg: g.p_mw * g.scaling,
            qg: 0.0,
            qmax: g.max_q_mvar,
            qmin: g.min_q_mvar,
            vg: g.vm_pu,
            mbase: g.sn_mva.unwrap_or(base_mva),
            status: true,
            pmax: g.max_p_mw,
            pmin: g.min_p_mw,
        });
    }

    // dispatchable PQ elements keep their host bus type
    for (i, (s, &on)) in net.sgen.iter().zip(&is.sgen_ctrl).enumerate() {
        if !on {
            continue;
        }
        let row = host_row(ctx, s.bus, "sgen", i)?;
        ctx.case.gen.push(CaseGen {
            bus: row,
            pg: s.p_mw * s.scaling,
            qg: s.q_mvar * s.scaling,
            qmax: s.max_q_mvar,
            qmin: s.min_q_mvar,
            vg: 0.0,
            mbase: base_mva,
            status: true,
            pmax: s.max_p_mw,
            pmin: s.min_p_mw,
        });
    }
    for (i, (l, &on)) in net.load.iter().zip(&is.load_ctrl).enumerate() {
        if !on {
            continue;
        }
        let row = host_row(ctx, l.bus, "load", i)?;
        ctx.case.gen.push(CaseGen {
            bus: row,
            pg: -l.p_mw * l.scaling,
            qg: -l.q_mvar * l.scaling,
            qmax: -l.min_q_mvar,
            qmin: -l.max_q_mvar,
            vg: 0.0,
            mbase: base_mva,
            status: true,
            pmax: -l.min_p_mw,
            pmin: -l.max_p_mw,
        });
    }
    for (i, (s, &on)) in net.storage.iter().zip(&is.storage_ctrl).enumerate() {
        if !on {
            continue;
        }
        let row = host_row(ctx, s.bus, "storage", i)?;
        ctx.case.gen.push(CaseGen {
            bus: row,
            pg: -s.p_mw * s.scaling,
            qg: -s.q_mvar * s.scaling,
            qmax: -s.min_q_mvar,
            qmin: -s.max_q_mvar,
            vg: 0.0,
            mbase: base_mva,
            status: true,
            pmax: -s.min_p_mw,
            pmin: -s.max_p_mw,
        });
    }

    debug!("built {} gen rows", ctx.case.gen.len());
    Ok(())
}

fn host_row(ctx: &ConversionContext, bus: usize, table: &str, i: usize) -> Result<usize> {
    ctx.lookups
        .get(ElementKind::Bus, bus)
        .ok_or_else(|| format_err!("in-service {} {} references unknown bus {}", table, i, bus))
}

/// Re-applies generator setpoints onto a cached, already sorted case
/// generator table. Rows are located through the saved sort order, so
/// the category-cumulative position of each in-service element is stable
/// as long as topology is unchanged.
pub fn update_gen(
    net: &Network,
    opts: &ConvertOptions,
    ctx: &mut ConversionContext,
    is: &IsElements,
) -> Result<()> {
    let order = ctx.case.internal.gen_order.clone();
    if order.len() != ctx.case.gen.len() {
        return Err(format_err!(
            "cached gen order covers {} rows, case has {}",
            order.len(),
            ctx.case.gen.len()
        ));
    }
    let expected = is.n_ext_grid()
        + is.n_gen()
        + is.n_sgen_ctrl()
        + is.n_load_ctrl()
        + is.n_storage_ctrl();
    if expected != order.len() {
        return Err(format_err!(
            "in-service selection changed since conversion: {} elements for {} gen rows",
            expected,
            order.len()
        ));
    }

    let mut pos = 0;

    for (eg, &on) in net.ext_grid.iter().zip(&is.ext_grid) {
        if !on {
            continue;
        }
        let row = order[pos];
        pos += 1;
        ctx.case.gen[row].vg = eg.vm_pu;
        let bus = ctx.case.gen[row].bus;
        ctx.case.bus[bus].vm = eg.vm_pu;
        if opts.calculate_voltage_angles {
            ctx.case.bus[bus].va = eg.va_degree;
        }
    }
    for (ng, &on) in net.gen.iter().zip(&is.gen) {
        if !on {
            continue;
        }
        let row = order[pos];
        pos += 1;
        ctx.case.gen[row].pg = ng.p_mw * ng.scaling;
        ctx.case.gen[row].vg = ng.vm_pu;
        let bus = ctx.case.gen[row].bus;
        ctx.case.bus[bus].vm = ng.vm_pu;
    }
    for (s, &on) in net.sgen.iter().zip(&is.sgen_ctrl) {
        if !on {
            continue;
        }
        let row = order[pos];
        pos += 1;
        ctx.case.gen[row].pg = s.p_mw * s.scaling;
        ctx.case.gen[row].qg = s.q_mvar * s.scaling;
    }
    for (l, &on) in net.load.iter().zip(&is.load_ctrl) {
        if !on {
            continue;
        }
        let row = order[pos];
        pos += 1;
        ctx.case.gen[row].pg = -l.p_mw * l.scaling;
        ctx.case.gen[row].qg = -l.q_mvar * l.scaling;
    }
    for (s, &on) in net.storage.iter().zip(&is.storage_ctrl) {
        if !on {
            continue;
        }
        let row = order[pos];
        pos += 1;
        ctx.case.gen[row].pg = -s.p_mw * s.scaling;
        ctx.case.gen[row].qg = -s.q_mvar * s.scaling;
    }

    debug_assert_eq!(pos, order.len());
    Ok(())
}

/// Verifies that voltage-controlling generators sharing a bus agree on
/// the voltage magnitude setpoint. A mismatch is a configuration error,
/// not something to average away.
pub fn check_voltage_setpoints(case: &Case) -> Result<()> {
    let mut setpoint: HashMap<usize, f64> = HashMap::new();
    for g in case.gen.iter() {
        if !g.status || g.is_load() || g.vg == 0.0 {
            continue;
        }
        match case.bus[g.bus].bus_type {
            BusType::Ref | BusType::Pv => {}
            _ => continue,
        }
        if let Some(&vg) = setpoint.get(&g.bus) {
            if (vg - g.vg).abs() > 1e-10 {
                return Err(format_err!(
                    "generators at bus {} have conflicting voltage setpoints: {} != {}",
                    case.bus[g.bus].id,
                    vg,
                    g.vg
                ));
            }
        } else {
            setpoint.insert(g.bus, g.vg);
        }
    }
    Ok(())
}

/// Verifies that external grids sharing a bus agree on the voltage angle
/// setpoint. Only meaningful when angles are honored.
pub fn check_voltage_angles(net: &Network, is: &IsElements) -> Result<()> {
    let mut setpoint: HashMap<usize, f64> = HashMap::new();
    for (eg, &on) in net.ext_grid.iter().zip(&is.ext_grid) {
        if !on {
            continue;
        }
        if let Some(&va) = setpoint.get(&eg.bus) {
            if (va - eg.va_degree).abs() > 1e-10 {
                return Err(format_err!(
                    "external grids at bus {} have conflicting voltage angles: {} != {}",
                    eg.bus,
                    va,
                    eg.va_degree
                ));
            }
        } else {
            setpoint.insert(eg.bus, eg.va_degree);
        }
    }
    Ok(())
}
