//! Positional column layout of the solver-facing array form.
//!
//! Internally the case tables are named-field records; this module is the
//! single place where they are flattened into the positional rows that
//! make up the wire format between this crate and the solver. Column
//! offsets here are an ABI: appending columns is allowed, repositioning
//! existing ones is not.

use crate::case::{BusType, Case, CaseBranch, CaseBus, CaseGen};

// bus types
pub const PQ: f64 = 1.0;
pub const PV: f64 = 2.0;
pub const REF: f64 = 3.0;
pub const NONE: f64 = 4.0;

// bus columns
pub const BUS_I: usize = 0; // bus id
pub const BUS_TYPE: usize = 1;
pub const PD: usize = 2; // real power demand (MW)
pub const QD: usize = 3; // reactive power demand (MVAr)
pub const GS: usize = 4; // shunt conductance (MW at V = 1.0 p.u.)
pub const BS: usize = 5; // shunt susceptance (MVAr at V = 1.0 p.u.)
pub const BUS_AREA: usize = 6;
pub const VM: usize = 7; // voltage magnitude (p.u.)
pub const VA: usize = 8; // voltage angle (degrees)
pub const BASE_KV: usize = 9; // base voltage (kV)
pub const ZONE: usize = 10; // loss zone
pub const VMAX: usize = 11; // maximum voltage magnitude (p.u.)
pub const VMIN: usize = 12; // minimum voltage magnitude (p.u.)

pub const BUS_COLS: usize = 13;

// gen columns
pub const GEN_BUS: usize = 0; // host bus id
pub const PG: usize = 1; // real power output (MW)
pub const QG: usize = 2; // reactive power output (MVAr)
pub const QMAX: usize = 3; // maximum reactive power output (MVAr)
pub const QMIN: usize = 4; // minimum reactive power output (MVAr)
pub const VG: usize = 5; // voltage magnitude setpoint (p.u.)
pub const MBASE: usize = 6; // machine MVA base
pub const GEN_STATUS: usize = 7; // 1 in service, 0 out of service
pub const PMAX: usize = 8; // maximum real power output (MW)
pub const PMIN: usize = 9; // minimum real power output (MW)

pub const GEN_COLS: usize = 10;

// branch columns
pub const F_BUS: usize = 0; // from bus id
pub const T_BUS: usize = 1; // to bus id
pub const BR_R: usize = 2; // resistance (p.u.)
pub const BR_X: usize = 3; // reactance (p.u.)
pub const BR_B: usize = 4; // total line charging susceptance (p.u.)
pub const RATE_A: usize = 5; // MVA rating
pub const TAP: usize = 6; // off nominal tap ratio
pub const SHIFT: usize = 7; // phase shift angle (degrees)
pub const BR_STATUS: usize = 8; // 1 in service, 0 out of service

pub const BRANCH_COLS: usize = 9;

impl BusType {
    pub fn code(&self) -> f64 {
        match self {
            BusType::Pq => PQ,
            BusType::Pv => PV,
            BusType::Ref => REF,
            BusType::Isolated => NONE,
        }
    }
}

impl CaseBus {
    pub fn to_row(&self) -> [f64; BUS_COLS] {
        let mut row = [0.0; BUS_COLS];
        row[BUS_I] = self.id as f64;
        row[BUS_TYPE] = self.bus_type.code();
        row[PD] = self.pd;
        row[QD] = self.qd;
        row[GS] = self.gs;
        row[BS] = self.bs;
        row[BUS_AREA] = self.area as f64;
        row[VM] = self.vm;
        row[VA] = self.va;
        row[BASE_KV] = self.base_kv;
        row[ZONE] = self.zone as f64;
        row[VMAX] = self.vmax;
        row[VMIN] = self.vmin;
        row
    }
}

impl CaseGen {
    pub fn to_row(&self) -> [f64; GEN_COLS] {
        let mut row = [0.0; GEN_COLS];
        row[GEN_BUS] = self.bus as f64;
        row[PG] = self.pg;
        row[QG] = self.qg;
        row[QMAX] = self.qmax;
        row[QMIN] = self.qmin;
        row[VG] = self.vg;
        row[MBASE] = self.mbase;
        row[GEN_STATUS] = if self.status { 1.0 } else { 0.0 };
        row[PMAX] = self.pmax;
        row[PMIN] = self.pmin;
        row
    }
}

impl CaseBranch {
    pub fn to_row(&self) -> [f64; BRANCH_COLS] {
        let mut row = [0.0; BRANCH_COLS];
        row[F_BUS] = self.from_bus as f64;
        row[T_BUS] = self.to_bus as f64;
        row[BR_R] = self.r;
        row[BR_X] = self.x;
        row[BR_B] = self.b;
        row[RATE_A] = self.rate_a;
        row[TAP] = self.tap;
        row[SHIFT] = self.shift;
        row[BR_STATUS] = if self.status { 1.0 } else { 0.0 };
        row
    }
}

/// Positional array form of a case, the layout the solver consumes.
pub struct CaseArrays {
    pub base_mva: f64,
    pub bus: Vec<[f64; BUS_COLS]>,
    pub gen: Vec<[f64; GEN_COLS]>,
    pub branch: Vec<[f64; BRANCH_COLS]>,
}

impl Case {
    pub fn to_arrays(&self) -> CaseArrays {
        CaseArrays {
            base_mva: self.base_mva,
            bus: self.bus.iter().map(|b| b.to_row()).collect(),
            gen: self.gen.iter().map(|g| g.to_row()).collect(),
            branch: self.branch.iter().map(|br| br.to_row()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::BusType;

    #[test]
    fn bus_row_layout() {
        let bus = CaseBus {
            id: 3,
            bus_type: BusType::Ref,
            pd: 10.0,
            qd: 4.0,
            gs: 0.0,
            bs: 0.5,
            area: 1,
            vm: 1.02,
            va: 0.0,
            base_kv: 110.0,
            zone: 1,
            vmax: 1.1,
            vmin: 0.9,
        };
        let row = bus.to_row();
        assert_eq!(row[BUS_I], 3.0);
        assert_eq!(row[BUS_TYPE], REF);
        assert_eq!(row[PD], 10.0);
        assert_eq!(row[BS], 0.5);
        assert_eq!(row[BASE_KV], 110.0);
        assert_eq!(row[VMIN], 0.9);
    }

    #[test]
    fn branch_status_flag() {
        let branch = CaseBranch {
            from_bus: 0,
            to_bus: 1,
            r: 0.01,
            x: 0.1,
            b: 0.0,
            rate_a: 0.0,
            tap: 1.0,
            shift: 0.0,
            status: false,
        };
        assert_eq!(branch.to_row()[BR_STATUS], 0.0);
    }
}
