use serde::{Deserialize, Serialize};

/// Network is the user-facing description of an electrical grid: element
/// tables referencing buses by id, with per-element service status.
///
/// Bus ids are arbitrary non-negative integers and need not be
/// consecutive; every other element addresses its host bus(es) by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    /// Network name.
    pub name: Option<String>,

    /// Rated apparent power (MVA) used as the per-unit base.
    pub sn_mva: f64,

    /// System frequency (Hz).
    pub f_hz: f64,

    pub bus: Vec<Bus>,
    pub ext_grid: Vec<ExtGrid>,
    pub gen: Vec<Gen>,
    pub sgen: Vec<Sgen>,
    pub load: Vec<Load>,
    pub storage: Vec<Storage>,
    pub shunt: Vec<Shunt>,
    pub ward: Vec<Ward>,
    pub motor: Vec<Motor>,
    pub line: Vec<Line>,
    pub trafo: Vec<Trafo>,
    pub switch: Vec<Switch>,
    pub poly_cost: Vec<PolyCost>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            name: None,
            sn_mva: 1.0,
            f_hz: 50.0,
            bus: Vec::new(),
            ext_grid: Vec::new(),
            gen: Vec::new(),
            sgen: Vec::new(),
            load: Vec::new(),
            storage: Vec::new(),
            shunt: Vec::new(),
            ward: Vec::new(),
            motor: Vec::new(),
            line: Vec::new(),
            trafo: Vec::new(),
            switch: Vec::new(),
            poly_cost: Vec::new(),
        }
    }
}

impl Network {
    pub fn new(sn_mva: f64) -> Self {
        Self {
            sn_mva,
            ..Default::default()
        }
    }

    /// Largest bus id plus one, the addressing range of the bus lookup.
    pub fn bus_id_range(&self) -> usize {
        self.bus.iter().map(|b| b.index + 1).max().unwrap_or(0)
    }
}

/// A node of the network. Static loads and shunts attach to buses by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bus {
    /// Bus id, unique but not necessarily consecutive.
    pub index: usize,

    pub name: Option<String>,

    /// Nominal voltage (kV).
    pub vn_kv: f64,

    pub zone: usize,

    pub in_service: bool,

    /// Maximum voltage magnitude (p.u.).
    pub max_vm_pu: f64,

    /// Minimum voltage magnitude (p.u.).
    pub min_vm_pu: f64,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            index: 0,
            name: None,
            vn_kv: 0.0,
            zone: 1,
            in_service: true,
            max_vm_pu: 2.0,
            min_vm_pu: 0.0,
        }
    }
}

/// External grid connection. Provides the voltage reference (slack).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtGrid {
    pub bus: usize,
    pub name: Option<String>,

    /// Voltage magnitude setpoint (p.u.).
    pub vm_pu: f64,

    /// Voltage angle setpoint (degrees).
    pub va_degree: f64,

    pub max_p_mw: f64,
    pub min_p_mw: f64,
    pub max_q_mvar: f64,
    pub min_q_mvar: f64,

    pub in_service: bool,
}

impl Default for ExtGrid {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            vm_pu: 1.0,
            va_degree: 0.0,
            max_p_mw: f64::INFINITY,
            min_p_mw: f64::NEG_INFINITY,
            max_q_mvar: f64::INFINITY,
            min_q_mvar: f64::NEG_INFINITY,
            in_service: true,
        }
    }
}

/// Voltage-controlled generator (PV node).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Gen {
    pub bus: usize,
    pub name: Option<String>,

    /// Active power output (MW).
    pub p_mw: f64,

    /// Voltage magnitude setpoint (p.u.).
    pub vm_pu: f64,

    /// Rated apparent power (MVA).
    pub sn_mva: Option<f64>,

    pub scaling: f64,

    pub max_p_mw: f64,
    pub min_p_mw: f64,
    pub max_q_mvar: f64,
    pub min_q_mvar: f64,

    /// Subtransient reactance (p.u.), short-circuit contribution.
    pub xdss_pu: f64,

    /// Subtransient resistance to reactance ratio, short-circuit
    /// contribution.
    pub rdss_pu: f64,

    pub in_service: bool,
}

impl Default for Gen {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            p_mw: 0.0,
            vm_pu: 1.0,
            sn_mva: None,
            scaling: 1.0,
            max_p_mw: f64::INFINITY,
            min_p_mw: f64::NEG_INFINITY,
            max_q_mvar: f64::INFINITY,
            min_q_mvar: f64::NEG_INFINITY,
            xdss_pu: 0.2,
            rdss_pu: 0.005,
            in_service: true,
        }
    }
}

/// Static generator. A fixed PQ injection unless `controllable`, in which
/// case it becomes a dispatchable generator entry in OPF mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sgen {
    pub bus: usize,
    pub name: Option<String>,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub scaling: f64,
    pub max_p_mw: f64,
    pub min_p_mw: f64,
    pub max_q_mvar: f64,
    pub min_q_mvar: f64,
    pub controllable: bool,
    pub in_service: bool,
}

impl Default for Sgen {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            p_mw: 0.0,
            q_mvar: 0.0,
            scaling: 1.0,
            max_p_mw: f64::INFINITY,
            min_p_mw: 0.0,
            max_q_mvar: f64::INFINITY,
            min_q_mvar: f64::NEG_INFINITY,
            controllable: false,
            in_service: true,
        }
    }
}

/// Consumer. A fixed PQ demand unless `controllable` in OPF mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Load {
    pub bus: usize,
    pub name: Option<String>,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub scaling: f64,
    pub max_p_mw: f64,
    pub min_p_mw: f64,
    pub max_q_mvar: f64,
    pub min_q_mvar: f64,
    pub controllable: bool,
    pub in_service: bool,
}

impl Default for Load {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            p_mw: 0.0,
            q_mvar: 0.0,
            scaling: 1.0,
            max_p_mw: f64::INFINITY,
            min_p_mw: 0.0,
            max_q_mvar: f64::INFINITY,
            min_q_mvar: f64::NEG_INFINITY,
            controllable: false,
            in_service: true,
        }
    }
}

/// Storage unit. Positive `p_mw` is charging (consumption).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub bus: usize,
    pub name: Option<String>,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub scaling: f64,
    pub max_p_mw: f64,
    pub min_p_mw: f64,
    pub max_q_mvar: f64,
    pub min_q_mvar: f64,
    pub controllable: bool,
    pub in_service: bool,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            p_mw: 0.0,
            q_mvar: 0.0,
            scaling: 1.0,
            max_p_mw: f64::INFINITY,
            min_p_mw: f64::NEG_INFINITY,
            max_q_mvar: f64::INFINITY,
            min_q_mvar: f64::NEG_INFINITY,
            controllable: false,
            in_service: true,
        }
    }
}

/// Shunt element. `p_mw`/`q_mvar` are the consumption at nominal voltage,
/// multiplied by the active `step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Shunt {
    pub bus: usize,
    pub name: Option<String>,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub step: usize,
    pub in_service: bool,
}

impl Default for Shunt {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            p_mw: 0.0,
            q_mvar: 0.0,
            step: 1,
            in_service: true,
        }
    }
}

/// Ward equivalent: a constant PQ part plus a constant impedance part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ward {
    pub bus: usize,
    pub name: Option<String>,

    /// Constant active power demand (MW).
    pub ps_mw: f64,

    /// Constant reactive power demand (MVAr).
    pub qs_mvar: f64,

    /// Constant impedance active power at 1.0 p.u. voltage (MW).
    pub pz_mw: f64,

    /// Constant impedance reactive power at 1.0 p.u. voltage (MVAr).
    pub qz_mvar: f64,

    pub in_service: bool,
}

impl Default for Ward {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            ps_mw: 0.0,
            qs_mvar: 0.0,
            pz_mw: 0.0,
            qz_mvar: 0.0,
            in_service: true,
        }
    }
}

/// Asynchronous machine, only relevant as a short-circuit impedance
/// contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Motor {
    pub bus: usize,
    pub name: Option<String>,

    /// Rated apparent power (MVA).
    pub sn_mva: f64,

    /// Locked rotor current relative to rated current.
    pub lrc_pu: f64,

    /// Resistance to reactance ratio of the motor impedance.
    pub rx: f64,

    pub in_service: bool,
}

impl Default for Motor {
    fn default() -> Self {
        Self {
            bus: 0,
            name: None,
            sn_mva: 0.0,
            lrc_pu: 7.0,
            rx: 0.42,
            in_service: true,
        }
    }
}

/// Line/cable with ohmic parameters per km.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    pub from_bus: usize,
    pub to_bus: usize,
    pub name: Option<String>,

    pub length_km: f64,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub c_nf_per_km: f64,
    pub g_us_per_km: f64,

    /// Maximum thermal current (kA).
    pub max_i_ka: f64,

    /// Derating factor for `max_i_ka`.
    pub df: f64,

    /// Number of parallel systems.
    pub parallel: usize,

    pub in_service: bool,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            from_bus: 0,
            to_bus: 0,
            name: None,
            length_km: 1.0,
            r_ohm_per_km: 0.0,
            x_ohm_per_km: 0.0,
            c_nf_per_km: 0.0,
            g_us_per_km: 0.0,
            max_i_ka: 0.0,
            df: 1.0,
            parallel: 1,
            in_service: true,
        }
    }
}

/// Two-winding transformer with short-circuit voltage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Trafo {
    pub hv_bus: usize,
    pub lv_bus: usize,
    pub name: Option<String>,

    /// Rated apparent power (MVA).
    pub sn_mva: f64,

    /// Rated voltage, high voltage side (kV).
    pub vn_hv_kv: f64,

    /// Rated voltage, low voltage side (kV).
    pub vn_lv_kv: f64,

    /// Short-circuit voltage (percent).
    pub vk_percent: f64,

    /// Real component of the short-circuit voltage (percent).
    pub vkr_percent: f64,

    /// Iron losses (kW).
    pub pfe_kw: f64,

    /// Open-loop losses (percent of rated current).
    pub i0_percent: f64,

    /// Phase shift angle (degrees).
    pub shift_degree: f64,

    pub tap_side: TapSide,
    pub tap_pos: f64,
    pub tap_neutral: f64,
    pub tap_step_percent: f64,

    /// Number of parallel transformers.
    pub parallel: usize,

    pub in_service: bool,
}

impl Default for Trafo {
    fn default() -> Self {
        Self {
            hv_bus: 0,
            lv_bus: 0,
            name: None,
            sn_mva: 0.0,
            vn_hv_kv: 0.0,
            vn_lv_kv: 0.0,
            vk_percent: 0.0,
            vkr_percent: 0.0,
            pfe_kw: 0.0,
            i0_percent: 0.0,
            shift_degree: 0.0,
            tap_side: TapSide::Hv,
            tap_pos: 0.0,
            tap_neutral: 0.0,
            tap_step_percent: 0.0,
            parallel: 1,
            in_service: true,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapSide {
    #[default]
    Hv,
    Lv,
}

/// Switch between a bus and a branch element (or another bus).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Switch {
    pub bus: usize,

    /// Index into the element table selected by `et`.
    pub element: usize,

    pub et: SwitchElement,
    pub closed: bool,
}

impl Default for Switch {
    fn default() -> Self {
        Self {
            bus: 0,
            element: 0,
            et: SwitchElement::Line,
            closed: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchElement {
    #[serde(rename = "b")]
    Bus,
    #[serde(rename = "l")]
    Line,
    #[serde(rename = "t")]
    Trafo,
}

/// Polynomial cost function attached to a dispatchable element,
/// used by the OPF objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolyCost {
    /// Index into the element table selected by `et`.
    pub element: usize,

    pub et: CostElement,

    /// Constant cost term (currency/h).
    pub cp0: f64,

    /// Linear cost term (currency/MWh).
    pub cp1: f64,

    /// Quadratic cost term (currency/MW^2 h).
    pub cp2: f64,
}

impl Default for PolyCost {
    fn default() -> Self {
        Self {
            element: 0,
            et: CostElement::Gen,
            cp0: 0.0,
            cp1: 0.0,
            cp2: 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostElement {
    ExtGrid,
    Gen,
    Sgen,
    Load,
    Storage,
}
