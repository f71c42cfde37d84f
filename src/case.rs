use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sparsetools::csr::CSR;
use std::fmt;
use std::sync::Arc;

/// Case is the numeric mirror of a network that the power flow solver
/// consumes: bus, generator and branch tables plus the per-unit base.
///
/// A case exists in one of two forms. The *external* case carries one bus
/// row per modeled bus (auxiliary buses included) regardless of service
/// status. The *internal* case produced by [`to_internal`](crate::to_internal)
/// contains only in-service rows, with bus ids remapped so that bus `i`
/// is row `i` of the bus table. Row position equals internal bus index is
/// the contract the solver relies on.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Case {
    /// System MVA base used for converting power into per-unit quantities.
    pub base_mva: f64,

    pub bus: Vec<CaseBus>,
    pub gen: Vec<CaseGen>,
    pub branch: Vec<CaseBranch>,

    /// Generator cost table, populated in OPF mode only.
    pub gencost: Vec<GenCost>,

    /// Inter-area exchange table. Optional legacy structure; rewritten
    /// during reduction when present.
    pub areas: Option<Vec<CaseArea>>,

    /// HVDC branch table. Passed through reduction unchanged.
    pub dcline: Option<Vec<DcLine>>,

    /// Cached solver-facing structures (admittance matrices, service
    /// masks). Never serialized.
    #[serde(skip)]
    pub internal: Internal,
}

impl Case {
    /// Number of in-service bus rows. In a partitioned external case and
    /// in any internal case these occupy the leading rows.
    pub fn n_in_service(&self) -> usize {
        self.bus.iter().filter(|b| b.is_in_service()).count()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    /// Fixed active and reactive power.
    #[default]
    Pq,
    /// Fixed voltage magnitude and active power.
    Pv,
    /// Reference voltage angle. Slack active and reactive power.
    Ref,
    /// Out of service.
    Isolated,
}

/// A row of the case bus table. Static load and shunt injections are
/// summed into the bus row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBus {
    /// Bus id. Equals the row position at build time and in any internal
    /// case; diverges only in the tail of a partitioned external case.
    pub id: usize,

    pub bus_type: BusType,

    /// Real power demand (MW).
    pub pd: f64,

    /// Reactive power demand (MVAr).
    pub qd: f64,

    /// Shunt conductance (MW at V = 1.0 p.u.).
    pub gs: f64,

    /// Shunt susceptance (MVAr at V = 1.0 p.u.).
    pub bs: f64,

    /// Area number.
    pub area: usize,

    /// Voltage magnitude (p.u.).
    pub vm: f64,

    /// Voltage angle (degrees).
    pub va: f64,

    /// Base voltage (kV).
    pub base_kv: f64,

    /// Loss zone.
    pub zone: usize,

    /// Maximum voltage magnitude (p.u.).
    pub vmax: f64,

    /// Minimum voltage magnitude (p.u.).
    pub vmin: f64,
}

impl CaseBus {
    pub fn is_in_service(&self) -> bool {
        self.bus_type != BusType::Isolated
    }

    /// Per-unit shunt admittance of the bus, for the admittance builder
    /// downstream.
    pub fn y_sh(&self, base_mva: f64) -> Complex64 {
        Complex64::new(self.gs, self.bs) / Complex64::new(base_mva, 0.0)
    }
}

/// A row of the case generator table: any generation-like injector
/// (external grid, generator, dispatchable static generator/load/storage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseGen {
    /// Host bus id.
    pub bus: usize,

    /// Real power output (MW).
    pub pg: f64,

    /// Reactive power output (MVAr).
    pub qg: f64,

    /// Maximum reactive power output (MVAr).
    pub qmax: f64,

    /// Minimum reactive power output (MVAr).
    pub qmin: f64,

    /// Voltage magnitude setpoint (p.u.).
    pub vg: f64,

    /// Total MVA base of this machine, defaults to base_mva.
    pub mbase: f64,

    pub status: bool,

    /// Maximum real power output (MW).
    pub pmax: f64,

    /// Minimum real power output (MW).
    pub pmin: f64,
}

impl CaseGen {
    /// Checks for dispatchable loads.
    pub(crate) fn is_load(&self) -> bool {
        self.pmin < 0.0 && self.pmax == 0.0
    }
}

/// A row of the case branch table: a line, a two-winding transformer or
/// an auxiliary branch created during switch handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBranch {
    /// From bus id.
    pub from_bus: usize,

    /// To bus id.
    pub to_bus: usize,

    /// Resistance (p.u.).
    pub r: f64,

    /// Reactance (p.u.).
    pub x: f64,

    /// Total line charging susceptance (p.u.).
    pub b: f64,

    /// MVA rating (long term).
    pub rate_a: f64,

    /// Off nominal tap ratio.
    pub tap: f64,

    /// Phase shift angle (degrees).
    pub shift: f64,

    pub status: bool,
}

impl CaseBranch {
    /// Per-unit series admittance; zero when the branch is out of service.
    pub fn y_s(&self) -> Complex64 {
        if !self.status {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::new(1.0, 0.0) / Complex64::new(self.r, self.x)
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostModel {
    /// Piecewise linear cost defined by breakpoints.
    PwLinear,
    #[default]
    Polynomial,
}

/// GenCost defines a generator cost function. Row `i` prices row `i` of
/// the generator table it accompanies.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenCost {
    pub model: CostModel,

    /// Startup cost in currency units.
    pub startup: f64,

    /// Shutdown cost in currency units.
    pub shutdown: f64,

    /// Polynomial coefficients, highest order first, or piecewise linear
    /// breakpoint coordinates p0, f0, p1, f1, ...
    pub cost: Vec<f64>,
}

/// Legacy inter-area exchange row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseArea {
    /// Bus id of the area price reference bus.
    pub price_ref_bus: usize,
}

/// HVDC interconnection row. Carried through reduction untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcLine {
    pub from_bus: usize,
    pub to_bus: usize,
    pub pf: f64,
    pub status: bool,
}

/// Solver-facing cache attached to a case: admittance matrices from the
/// last factorization and the service masks computed during reduction.
#[derive(Default, Clone)]
pub struct Internal {
    pub y_bus: Option<Arc<CSR<usize, Complex64>>>,
    pub y_f: Option<Arc<CSR<usize, Complex64>>>,
    pub y_t: Option<Arc<CSR<usize, Complex64>>>,

    /// Per-row service mask of the (sorted) external generator table.
    pub gen_is: Vec<bool>,

    /// Per-row service mask of the external branch table.
    pub branch_is: Vec<bool>,

    /// Positions of the external generator rows in the bus-sorted order:
    /// `gen_order[k]` is where pre-sort row `k` landed.
    pub gen_order: Vec<usize>,

    /// Internal generator rows acting as voltage reference.
    pub ref_gens: Vec<usize>,
}

impl Internal {
    /// Stores admittance matrices computed by the solver so repeated
    /// solves of a topologically unchanged case can reuse them.
    pub fn store_admittance(
        &mut self,
        y_bus: CSR<usize, Complex64>,
        y_f: CSR<usize, Complex64>,
        y_t: CSR<usize, Complex64>,
    ) {
        self.y_bus = Some(Arc::new(y_bus));
        self.y_f = Some(Arc::new(y_f));
        self.y_t = Some(Arc::new(y_t));
    }

    pub fn invalidate_admittance(&mut self) {
        self.y_bus = None;
        self.y_f = None;
        self.y_t = None;
    }
}

impl fmt::Debug for Internal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Internal")
            .field("y_bus", &self.y_bus.is_some())
            .field("y_f", &self.y_f.is_some())
            .field("y_t", &self.y_t.is_some())
            .field("gen_is", &self.gen_is)
            .field("branch_is", &self.branch_is)
            .field("gen_order", &self.gen_order)
            .field("ref_gens", &self.ref_gens)
            .finish()
    }
}
