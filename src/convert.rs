use anyhow::Result;
use log::{debug, warn};
use std::collections::HashSet;

use crate::build_branch::build_branch;
use crate::build_bus::{
    add_gen_impedances, add_motor_impedances, build_bus, calc_pq_elements, calc_shunts,
};
use crate::build_gen::{build_gen, check_voltage_angles, check_voltage_setpoints};
use crate::case::{BusType, Case};
use crate::connectivity::{check_connectivity, set_isolated_buses_out_of_service};
use crate::context::ConversionContext;
use crate::network::Network;
use crate::objective::make_objective;
use crate::options::{ConvertOptions, Mode};
use crate::reduce::to_internal;
use crate::select::{select_is_elements, IsElements};
use crate::switches::{branches_with_oos_buses, switch_branches};

/// Allocates an empty case for a network: empty typed tables and the
/// base power copied from the network's rated power.
pub fn init_case(net: &Network) -> Case {
    Case {
        base_mva: net.sn_mva,
        ..Default::default()
    }
}

/// Converts a network into an external case plus the reduced internal
/// case the solver runs on, with lookup tables mapping every user-facing
/// element onto its case row.
///
/// The stages run in a fixed dependency order: in-service selection,
/// bus table and bus lookup, generator table (bus typing must precede
/// the injection sums), branch table (lines before transformers),
/// mode-dependent injections, switch handling, connectivity resolution,
/// setpoint validation, reduction. Out-of-service cascades are resolved
/// here and never escape as errors; configuration conflicts do.
pub fn convert(net: &Network, opts: &ConvertOptions) -> Result<ConversionContext> {
    let mut ctx = ConversionContext::new();
    ctx.case = init_case(net);

    let mut is = select_is_elements(net, opts, &HashSet::new());

    build_bus(net, opts, &mut ctx, &is);
    build_gen(net, opts, &mut ctx, &is)?;
    build_branch(net, opts, &mut ctx)?;

    apply_injections(net, opts, &mut ctx, &is);

    switch_branches(net, &mut ctx);
    branches_with_oos_buses(&mut ctx);

    if opts.check_connectivity {
        let isolated_rows = check_connectivity(&ctx.case);
        if !isolated_rows.is_empty() {
            warn!("setting {} unsupplied buses out of service", isolated_rows.len());
            for &row in &isolated_rows {
                ctx.case.bus[row].bus_type = BusType::Isolated;
            }

            // re-select so elements on newly dead buses drop out of the
            // sums; the generator table is already materialized, so its
            // category masks stay as built and the reducer resolves dead
            // hosts through the service masks instead
            let isolated_ids: HashSet<usize> = net
                .bus
                .iter()
                .enumerate()
                .filter(|(row, _)| isolated_rows.contains(row))
                .map(|(_, b)| b.index)
                .collect();
            let re = select_is_elements(net, opts, &isolated_ids);
            is = IsElements {
                ext_grid: is.ext_grid,
                gen: is.gen,
                sgen_ctrl: is.sgen_ctrl,
                load_ctrl: is.load_ctrl,
                storage_ctrl: is.storage_ctrl,
                ..re
            };
            apply_injections(net, opts, &mut ctx, &is);
        }
    }

    set_isolated_buses_out_of_service(&mut ctx.case);

    if opts.check_setpoints() {
        check_voltage_setpoints(&ctx.case)?;
    }
    if opts.calculate_voltage_angles {
        check_voltage_angles(net, &is)?;
    }

    ctx.is_elements = Some(is);
    to_internal(&mut ctx)?;

    if opts.mode == Mode::Opf {
        make_objective(net, &mut ctx)?;
    }

    debug!(
        "converted network with {} buses into internal case with {} buses",
        net.bus.len(),
        ctx.internal.as_ref().map_or(0, |c| c.bus.len()),
    );
    Ok(ctx)
}

/// Mode-dependent injection stage: short-circuit cases get generator and
/// motor impedance contributions, everything else gets the PQ sums
/// followed by the shunt/ward sums.
pub(crate) fn apply_injections(
    net: &Network,
    opts: &ConvertOptions,
    ctx: &mut ConversionContext,
    is: &IsElements,
) {
    match opts.mode {
        Mode::Sc => {
            for b in ctx.case.bus.iter_mut() {
                b.gs = 0.0;
                b.bs = 0.0;
            }
            add_gen_impedances(net, ctx, is);
            add_motor_impedances(net, ctx, is);
        }
        Mode::Pf | Mode::Opf => {
            calc_pq_elements(net, ctx, is);
            calc_shunts(net, ctx, is);
        }
    }
}
