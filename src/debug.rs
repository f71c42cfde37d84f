use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};

use crate::case::Case;

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(6);

fn fmt(f: f64) -> String {
    dtoa(f, FLOAT_CONFIG)
}

fn format_complex(z: &Complex64) -> String {
    format!(
        "{}{}j{}",
        fmt(z.re),
        if z.im.signum() < 0.0 { "-" } else { "+" },
        fmt(z.im.abs())
    )
}

pub fn format_bus_table(case: &Case) -> String {
    let mut out = String::from("bus  type      pd       qd       vm     base_kv\n");
    for b in case.bus.iter() {
        out.push_str(&format!(
            "{:<4} {:<9} {:<8} {:<8} {:<6} {}\n",
            b.id,
            format!("{:?}", b.bus_type),
            fmt(b.pd),
            fmt(b.qd),
            fmt(b.vm),
            fmt(b.base_kv)
        ));
    }
    out
}

pub fn format_gen_table(case: &Case) -> String {
    let mut out = String::from("bus  pg       qg       vg     status\n");
    for g in case.gen.iter() {
        out.push_str(&format!(
            "{:<4} {:<8} {:<8} {:<6} {}\n",
            g.bus,
            fmt(g.pg),
            fmt(g.qg),
            fmt(g.vg),
            g.status as u8
        ));
    }
    out
}

pub fn format_branch_table(case: &Case) -> String {
    let mut out = String::from("from to   y_s             tap    shift  status\n");
    for br in case.branch.iter() {
        out.push_str(&format!(
            "{:<4} {:<4} {:<15} {:<6} {:<6} {}\n",
            br.from_bus,
            br.to_bus,
            format_complex(&br.y_s()),
            fmt(br.tap),
            fmt(br.shift),
            br.status as u8
        ));
    }
    out
}
