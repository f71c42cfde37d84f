use crate::case::Case;
use crate::lookup::Lookups;
use crate::select::IsElements;

/// ConversionContext holds everything one conversion produces: the
/// external case, the reduced internal case and the lookup tables that
/// map user-facing element ids onto case rows.
///
/// The context is owned by the caller and passed explicitly between the
/// case builder, the topology reducer and the incremental updater.
/// Contexts of independent networks share no state, so converting many
/// networks in parallel needs no synchronization; concurrent access to
/// one context must be serialized by the caller.
#[derive(Debug, Default, Clone)]
pub struct ConversionContext {
    /// Full-fidelity external case mirroring every modeled element.
    pub case: Case,

    /// Solver-ready internal case, present after reduction.
    pub internal: Option<Case>,

    pub lookups: Lookups,

    /// In-service element sets resolved during the last conversion,
    /// reused by the incremental updater.
    pub is_elements: Option<IsElements>,
}

impl ConversionContext {
    pub fn new() -> Self {
        Self::default()
    }
}
