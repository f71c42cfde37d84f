use anyhow::{format_err, Result};
use log::debug;
use std::f64::consts::PI;

use crate::case::CaseBranch;
use crate::context::ConversionContext;
use crate::lookup::ElementKind;
use crate::network::{Line, Network, TapSide, Trafo};
use crate::options::ConvertOptions;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Builds the case branch table: line rows first, then two-winding
/// transformer rows. Transformer parameter derivation assumes the line
/// block is complete, so the order is fixed.
///
/// A branch referencing a bus id no bus table row carries is an index
/// inconsistency and fails the conversion; out-of-service endpoints are
/// not an error, they resolve through the lookup like any other bus.
pub fn build_branch(
    net: &Network,
    _opts: &ConvertOptions,
    ctx: &mut ConversionContext,
) -> Result<()> {
    for (i, line) in net.line.iter().enumerate() {
        let from = ctx
            .lookups
            .get(ElementKind::Bus, line.from_bus)
            .ok_or_else(|| format_err!("line {} references unknown bus {}", i, line.from_bus))?;
        let to = ctx
            .lookups
            .get(ElementKind::Bus, line.to_bus)
            .ok_or_else(|| format_err!("line {} references unknown bus {}", i, line.to_bus))?;
        let vn_kv = ctx.case.bus[from].base_kv;
        let (r, x, b, rate_a) = line_params(line, vn_kv, ctx.case.base_mva, net.f_hz);
        ctx.case.branch.push(CaseBranch {
            from_bus: from,
            to_bus: to,
            r,
            x,
            b,
            rate_a,
            tap: 1.0,
            shift: 0.0,
            status: line.in_service,
        });
    }

    for (i, trafo) in net.trafo.iter().enumerate() {
        let hv = ctx
            .lookups
            .get(ElementKind::Bus, trafo.hv_bus)
            .ok_or_else(|| format_err!("trafo {} references unknown bus {}", i, trafo.hv_bus))?;
        let lv = ctx
            .lookups
            .get(ElementKind::Bus, trafo.lv_bus)
            .ok_or_else(|| format_err!("trafo {} references unknown bus {}", i, trafo.lv_bus))?;
        let hv_vn = ctx.case.bus[hv].base_kv;
        let lv_vn = ctx.case.bus[lv].base_kv;
        let (r, x, b, tap, rate_a) = trafo_params(trafo, hv_vn, lv_vn, ctx.case.base_mva);
        ctx.case.branch.push(CaseBranch {
            from_bus: hv,
            to_bus: lv,
            r,
            x,
            b,
            rate_a,
            tap,
            shift: trafo.shift_degree,
            status: trafo.in_service,
        });
    }

    debug!("built {} branch rows", ctx.case.branch.len());
    Ok(())
}

/// Recomputes the electrical columns of the line and transformer rows of
/// a cached case in place, preserving endpoints and status. Endpoint ids
/// may already be internal, so bus voltages are read through the rows the
/// branch references. Auxiliary rows appended after the element blocks
/// are left untouched.
pub fn refresh_branch_params(net: &Network, ctx: &mut ConversionContext) {
    for (i, line) in net.line.iter().enumerate() {
        let row = &ctx.case.branch[i];
        let vn_kv = ctx.case.bus[row.from_bus].base_kv;
        let (r, x, b, rate_a) = line_params(line, vn_kv, ctx.case.base_mva, net.f_hz);
        let row = &mut ctx.case.branch[i];
        row.r = r;
        row.x = x;
        row.b = b;
        row.rate_a = rate_a;
    }
    let n_lines = net.line.len();
    for (i, trafo) in net.trafo.iter().enumerate() {
        let row = &ctx.case.branch[n_lines + i];
        let hv_vn = ctx.case.bus[row.from_bus].base_kv;
        let lv_vn = ctx.case.bus[row.to_bus].base_kv;
        let (r, x, b, tap, rate_a) = trafo_params(trafo, hv_vn, lv_vn, ctx.case.base_mva);
        let row = &mut ctx.case.branch[n_lines + i];
        row.r = r;
        row.x = x;
        row.b = b;
        row.tap = tap;
        row.rate_a = rate_a;
    }
}

/// Per-unit series and charging parameters of a line on the system base.
fn line_params(line: &Line, vn_kv: f64, base_mva: f64, f_hz: f64) -> (f64, f64, f64, f64) {
    let z_base = vn_kv * vn_kv / base_mva;
    let parallel = line.parallel.max(1) as f64;

    let r = line.r_ohm_per_km * line.length_km / z_base / parallel;
    let x = line.x_ohm_per_km * line.length_km / z_base / parallel;
    let b = 2.0 * PI * f_hz * line.c_nf_per_km * 1e-9 * line.length_km * z_base * parallel;
    let rate_a = SQRT_3 * vn_kv * line.max_i_ka * line.df * parallel;

    (r, x, b, rate_a)
}

/// Per-unit parameters of a two-winding transformer: series impedance
/// from the short-circuit voltage, magnetizing admittance from open-loop
/// losses, tap ratio from the tap changer position. All referenced to
/// the system base.
fn trafo_params(
    trafo: &Trafo,
    hv_vn_kv: f64,
    lv_vn_kv: f64,
    base_mva: f64,
) -> (f64, f64, f64, f64, f64) {
    let parallel = trafo.parallel.max(1) as f64;
    let sn = trafo.sn_mva;

    // series impedance, referenced to the rated lv voltage
    let zk = trafo.vk_percent / 100.0 * base_mva / sn;
    let rk = trafo.vkr_percent / 100.0 * base_mva / sn;
    let xk = (zk * zk - rk * rk).max(0.0).sqrt();
    let voltage_corr = if lv_vn_kv > 0.0 {
        let q = trafo.vn_lv_kv / lv_vn_kv;
        q * q
    } else {
        1.0
    };
    let r = rk * voltage_corr / parallel;
    let x = xk * voltage_corr / parallel;

    // magnetizing admittance, inductive
    let ym = trafo.i0_percent / 100.0 * sn / base_mva;
    let gm = trafo.pfe_kw / 1000.0 / base_mva;
    let b = -(ym * ym - gm * gm).max(0.0).sqrt() * parallel;

    // off nominal ratio including the tap changer
    let tap_corr = 1.0 + (trafo.tap_pos - trafo.tap_neutral) * trafo.tap_step_percent / 100.0;
    let (vn_hv, vn_lv) = match trafo.tap_side {
        TapSide::Hv => (trafo.vn_hv_kv * tap_corr, trafo.vn_lv_kv),
        TapSide::Lv => (trafo.vn_hv_kv, trafo.vn_lv_kv * tap_corr),
    };
    let tap = if hv_vn_kv > 0.0 && lv_vn_kv > 0.0 {
        (vn_hv / hv_vn_kv) / (vn_lv / lv_vn_kv)
    } else {
        1.0
    };

    let rate_a = sn * parallel;

    (r, x, b, tap, rate_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_bus::build_bus;
    use crate::network::Bus;
    use crate::select::select_is_elements;
    use std::collections::HashSet;

    fn line_net() -> Network {
        let mut net = Network::new(100.0);
        net.bus.push(Bus {
            index: 0,
            vn_kv: 110.0,
            ..Default::default()
        });
        net.bus.push(Bus {
            index: 1,
            vn_kv: 110.0,
            ..Default::default()
        });
        net.line.push(Line {
            from_bus: 0,
            to_bus: 1,
            length_km: 10.0,
            r_ohm_per_km: 0.1,
            x_ohm_per_km: 0.4,
            c_nf_per_km: 10.0,
            max_i_ka: 0.5,
            ..Default::default()
        });
        net
    }

    #[test]
    fn line_per_unit_params() -> Result<()> {
        let net = line_net();
        let opts = ConvertOptions::default();
        let is = select_is_elements(&net, &opts, &HashSet::new());
        let mut ctx = ConversionContext::new();
        ctx.case.base_mva = net.sn_mva;
        build_bus(&net, &opts, &mut ctx, &is);
        build_branch(&net, &opts, &mut ctx)?;

        let z_base = 110.0 * 110.0 / 100.0;
        let br = &ctx.case.branch[0];
        assert!((br.r - 1.0 / z_base).abs() < 1e-12);
        assert!((br.x - 4.0 / z_base).abs() < 1e-12);
        assert!(br.b > 0.0);
        assert!(br.status);
        assert_eq!(br.tap, 1.0);
        Ok(())
    }

    #[test]
    fn line_referencing_unknown_bus_is_an_error() {
        let mut net = line_net();
        net.line[0].from_bus = 99;
        let opts = ConvertOptions::default();
        let is = select_is_elements(&net, &opts, &HashSet::new());
        let mut ctx = ConversionContext::new();
        ctx.case.base_mva = net.sn_mva;
        build_bus(&net, &opts, &mut ctx, &is);

        // the dangling endpoint must not silently become some live row
        assert!(build_branch(&net, &opts, &mut ctx).is_err());
        assert!(ctx.case.branch.is_empty());
    }

    #[test]
    fn trafo_tap_ratio() {
        let trafo = Trafo {
            hv_bus: 0,
            lv_bus: 1,
            sn_mva: 25.0,
            vn_hv_kv: 110.0,
            vn_lv_kv: 20.0,
            vk_percent: 12.0,
            vkr_percent: 0.4,
            tap_pos: 2.0,
            tap_neutral: 0.0,
            tap_step_percent: 1.5,
            ..Default::default()
        };
        let (r, x, _b, tap, rate) = trafo_params(&trafo, 110.0, 20.0, 100.0);
        assert!(r > 0.0 && x > r);
        assert!((tap - 1.03).abs() < 1e-12);
        assert_eq!(rate, 25.0);
    }
}
