use derive_builder::Builder;

/// Analysis mode the case is being prepared for.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Power flow.
    #[default]
    Pf,
    /// Optimal power flow. Dispatchable elements enter the generator
    /// table and the cost table is populated.
    Opf,
    /// Short circuit. Generator and motor impedances are added to the
    /// bus shunt admittance instead of PQ load sums.
    Sc,
}

/// Conversion options.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct ConvertOptions {
    pub mode: Mode,

    /// Detect buses without an in-service path to a reference bus and
    /// set them out of service.
    pub check_connectivity: bool,

    /// Honor external grid voltage angle setpoints and verify their
    /// consistency per bus.
    pub calculate_voltage_angles: bool,

    /// Initial voltage magnitude (p.u.) for buses without a setpoint.
    pub init_vm_pu: f64,

    pub recycle: Recycle,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Pf,
            check_connectivity: true,
            calculate_voltage_angles: false,
            init_vm_pu: 1.0,
            recycle: Recycle::default(),
        }
    }
}

impl ConvertOptions {
    /// Whether conflicting generator voltage setpoints on a shared bus
    /// are checked. Impedance-mode cases carry no voltage setpoints worth
    /// reconciling, so the check is limited to power flow modes.
    pub fn check_setpoints(&self) -> bool {
        self.mode != Mode::Sc
    }
}

/// Controls which cached quantities an incremental update may reuse.
#[derive(Debug, Default, Copy, Clone)]
pub struct Recycle {
    /// Branch admittance parameters (and the cached admittance matrices)
    /// are still valid; skip the transformer/line refresh.
    pub admittance: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let opts = ConvertOptionsBuilder::default().build().unwrap();
        assert_eq!(opts.mode, Mode::Pf);
        assert!(opts.check_connectivity);
        assert!(opts.check_setpoints());
    }

    #[test]
    fn setpoint_check_disabled_for_short_circuit() {
        let opts = ConvertOptionsBuilder::default()
            .mode(Mode::Sc)
            .build()
            .unwrap();
        assert!(!opts.check_setpoints());
    }
}
