use anyhow::{format_err, Result};
use log::debug;

use crate::build_branch::refresh_branch_params;
use crate::build_bus::{add_gen_impedances, add_motor_impedances, calc_pq_elements, calc_shunts};
use crate::build_gen::{check_voltage_setpoints, update_gen};
use crate::context::ConversionContext;
use crate::network::Network;
use crate::options::{ConvertOptions, Mode};

/// Re-applies changed electrical quantities onto a previously converted
/// context without re-deriving topology.
///
/// The contract is the caller's: bus/branch membership and switch states
/// must be unchanged since [`convert`](crate::convert) produced this
/// context. Injections and generator setpoints are recomputed on the
/// cached external case, branch parameters are refreshed unless the
/// recycle flag says the admittances are still valid, and the internal
/// case is re-derived from the previously computed service masks. The
/// masks are deliberately not recomputed; a topology change the caller
/// failed to signal yields stale output, not an error.
pub fn update_case(net: &Network, opts: &ConvertOptions, ctx: &mut ConversionContext) -> Result<()> {
    if ctx.internal.is_none() {
        return Err(format_err!("no cached case to update; run a full conversion first"));
    }
    let is = ctx
        .is_elements
        .clone()
        .ok_or_else(|| format_err!("cached in-service selection missing"))?;

    // fresh values, cached masks
    match opts.mode {
        Mode::Sc => {
            for b in ctx.case.bus.iter_mut() {
                b.gs = 0.0;
                b.bs = 0.0;
            }
            add_gen_impedances(net, ctx, &is);
            add_motor_impedances(net, ctx, &is);
        }
        Mode::Pf | Mode::Opf => {
            calc_pq_elements(net, ctx, &is);
            calc_shunts(net, ctx, &is);
        }
    }
    update_gen(net, opts, ctx, &is)?;

    if opts.check_setpoints() {
        check_voltage_setpoints(&ctx.case)?;
    }

    if !opts.recycle.admittance {
        refresh_branch_params(net, ctx);
        ctx.case.internal.invalidate_admittance();
    }

    // re-derive the internal subsets from the cached partition and masks
    let case = &ctx.case;
    // the external case is partitioned in-service-first after reduction
    let n_is = case.n_in_service();
    let bus = case.bus[..n_is].to_vec();
    let gen = case
        .gen
        .iter()
        .zip(&case.internal.gen_is)
        .filter(|(_, &on)| on)
        .map(|(g, _)| g.clone())
        .collect();
    let branch = case
        .branch
        .iter()
        .zip(&case.internal.branch_is)
        .filter(|(_, &on)| on)
        .map(|(br, _)| br.clone())
        .collect();
    if let Some(internal) = ctx.internal.as_mut() {
        internal.bus = bus;
        internal.gen = gen;
        internal.branch = branch;
    }

    debug!("incremental update applied to cached case");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::convert;
    use crate::network::{Bus, ExtGrid, Line, Load};
    use crate::options::{ConvertOptionsBuilder, Recycle};

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
            ..Default::default()
        });
        net.ext_grid.push(ExtGrid {
            bus: 1,
            ..Default::default()
        });
        net.load.push(Load {
            bus: 5,
            p_mw: 15.0,
            q_mvar: 5.0,
            ..Default::default()
        });
        net.line.push(Line {
            from_bus: 1,
            to_bus: 5,
            length_km: 5.0,
            r_ohm_per_km: 0.1,
            x_ohm_per_km: 0.4,
            ..Default::default()
        });
        net
    }

    #[test]
    fn changed_load_updates_injections_only() -> Result<()> {
        let mut net = two_bus_net();
        let opts = ConvertOptions::default();
        let mut ctx = convert(&net, &opts)?;
        let before = ctx.internal.clone().unwrap();

        net.load[0].p_mw = 25.0;
        update_case(&net, &opts, &mut ctx)?;
        let after = ctx.internal.as_ref().unwrap();

        assert_eq!(after.bus.len(), before.bus.len());
        assert_eq!(after.gen.len(), before.gen.len());
        assert_eq!(after.branch.len(), before.branch.len());
        assert_eq!(after.gen, before.gen);
        assert_eq!(after.branch, before.branch);
        assert_eq!(after.bus[1].pd, 25.0);
        assert_eq!(before.bus[1].pd, 15.0);
        Ok(())
    }

    #[test]
    fn changed_setpoint_updates_gen_row() -> Result<()> {
        let mut net = two_bus_net();
        let opts = ConvertOptions::default();
        let mut ctx = convert(&net, &opts)?;

        net.ext_grid[0].vm_pu = 1.04;
        update_case(&net, &opts, &mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        assert_eq!(internal.gen[0].vg, 1.04);
        assert_eq!(internal.bus[0].vm, 1.04);
        Ok(())
    }

    #[test]
    fn recycle_flag_keeps_branch_params() -> Result<()> {
        let mut net = two_bus_net();
        let opts = ConvertOptionsBuilder::default()
            .recycle(Recycle { admittance: true })
            .build()
            .unwrap();
        let mut ctx = convert(&net, &opts)?;
        let r_before = ctx.internal.as_ref().unwrap().branch[0].r;

        net.line[0].r_ohm_per_km = 0.2;
        update_case(&net, &opts, &mut ctx)?;
        assert_eq!(ctx.internal.as_ref().unwrap().branch[0].r, r_before);

        let opts = ConvertOptions::default();
        update_case(&net, &opts, &mut ctx)?;
        assert!(ctx.internal.as_ref().unwrap().branch[0].r > r_before);
        Ok(())
    }

    #[test]
    fn update_without_conversion_is_an_error() {
        let net = two_bus_net();
        let opts = ConvertOptions::default();
        let mut ctx = ConversionContext::new();
        assert!(update_case(&net, &opts, &mut ctx).is_err());
    }
}
