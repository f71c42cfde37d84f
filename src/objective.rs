use anyhow::{format_err, Result};

use crate::case::{CostModel, GenCost};
use crate::context::ConversionContext;
use crate::lookup::ElementKind;
use crate::network::{CostElement, Network};

/// Appends the OPF cost table to the internal case: one row per internal
/// generator, aligned with the sorted generator table through the
/// category lookups. Elements without a cost entry get a zero
/// polynomial. Bus, branch and generator rows are never touched here.
pub fn make_objective(net: &Network, ctx: &mut ConversionContext) -> Result<()> {
    let n_gen = ctx
        .internal
        .as_ref()
        .ok_or_else(|| format_err!("objective requires a reduced case"))?
        .gen
        .len();

    let mut gencost = vec![
        GenCost {
            model: CostModel::Polynomial,
            startup: 0.0,
            shutdown: 0.0,
            cost: vec![0.0, 0.0, 0.0],
        };
        n_gen
    ];

    for pc in net.poly_cost.iter() {
        let kind = match pc.et {
            CostElement::ExtGrid => ElementKind::ExtGrid,
            CostElement::Gen => ElementKind::Gen,
            CostElement::Sgen => ElementKind::Sgen,
            CostElement::Load => ElementKind::Load,
            CostElement::Storage => ElementKind::Storage,
        };
        // out-of-service elements map to the sentinel and price nothing
        if let Some(row) = ctx.lookups.get(kind, pc.element) {
            gencost[row] = GenCost {
                model: CostModel::Polynomial,
                startup: 0.0,
                shutdown: 0.0,
                cost: vec![pc.cp2, pc.cp1, pc.cp0],
            };
        }
    }

    if let Some(internal) = ctx.internal.as_mut() {
        internal.gencost = gencost;
    }
    Ok(())
}
