use anyhow::{format_err, Result};
use log::debug;

use crate::case::Case;
use crate::context::ConversionContext;
use crate::lookup::ElementKind;

/// Reduces the external case into the solver-ready internal case and
/// patches every lookup table to match.
///
/// The external case is re-partitioned in place: in-service buses move
/// to the front in their original relative order, out-of-service buses
/// are appended after, and ids are re-assigned consecutively across that
/// order. The internal case then takes exactly the leading in-service
/// rows, the generator rows whose status and host bus are both live
/// (sorted ascending by host bus) and the branch rows with two live
/// endpoints. Internal bus index `i` is row `i` of the internal bus
/// table; that identity is the contract the solver relies on.
///
/// Empty generator or branch sets are legal here; degenerate cases are
/// the solver's concern.
pub fn to_internal(ctx: &mut ConversionContext) -> Result<()> {
    let is = ctx
        .is_elements
        .as_ref()
        .ok_or_else(|| format_err!("in-service selection missing; build the case first"))?
        .clone();
    let case = &mut ctx.case;
    let nb = case.bus.len();

    // partition buses, in-service first, both halves in original order
    let (mut kept, oos): (Vec<_>, Vec<_>) =
        case.bus.drain(..).partition(|b| b.is_in_service());
    let n_is = kept.len();
    kept.extend(oos);
    case.bus = kept;

    // old id -> new consecutive index, for every bus
    let mut e2i = vec![0; nb];
    for (pos, b) in case.bus.iter().enumerate() {
        e2i[b.id] = pos;
    }
    for (pos, b) in case.bus.iter_mut().enumerate() {
        b.id = pos;
    }

    // rewrite bus references, a single pass per table
    for g in case.gen.iter_mut() {
        g.bus = e2i[g.bus];
    }
    for br in case.branch.iter_mut() {
        br.from_bus = e2i[br.from_bus];
        br.to_bus = e2i[br.to_bus];
    }
    if let Some(areas) = case.areas.as_mut() {
        if areas.is_empty() {
            case.areas = None;
        } else {
            for a in areas.iter_mut() {
                a.price_ref_bus = e2i[a.price_ref_bus];
            }
        }
    }

    ctx.lookups.update(ElementKind::Bus, &e2i, n_is)?;

    // sort gens by host bus; stable, so gens sharing a bus keep their
    // relative order for the per-bus slack handling downstream
    let ng = case.gen.len();
    let mut by_bus: Vec<usize> = (0..ng).collect();
    by_bus.sort_by_key(|&k| case.gen[k].bus);
    let mut gen_order = vec![0; ng];
    for (new_pos, &old_pos) in by_bus.iter().enumerate() {
        gen_order[old_pos] = new_pos;
    }
    let mut sorted = Vec::with_capacity(ng);
    for &old_pos in &by_bus {
        sorted.push(case.gen[old_pos].clone());
    }
    case.gen = sorted;

    // service masks over the sorted tables
    let gen_is: Vec<bool> = case
        .gen
        .iter()
        .map(|g| g.status && g.bus < n_is)
        .collect();
    let branch_is: Vec<bool> = case
        .branch
        .iter()
        .map(|br| br.status && br.from_bus < n_is && br.to_bus < n_is)
        .collect();

    // internal row of each kept sorted generator
    let mut int_row = vec![None; ng];
    let mut kept_gens = 0;
    for (k, &on) in gen_is.iter().enumerate() {
        if on {
            int_row[k] = Some(kept_gens);
            kept_gens += 1;
        }
    }

    // per-category lookups from cumulative in-service counts, in the
    // fixed generator table order
    let masks: [&[bool]; 5] = [
        &is.ext_grid,
        &is.gen,
        &is.sgen_ctrl,
        &is.load_ctrl,
        &is.storage_ctrl,
    ];
    let mut start = 0;
    for (kind, mask) in ElementKind::GEN_KINDS.into_iter().zip(masks) {
        let mut table = vec![None; mask.len()];
        for (i, &on) in mask.iter().enumerate() {
            if on {
                table[i] = int_row[gen_order[start]];
                start += 1;
            }
        }
        ctx.lookups.write(kind, table);
    }
    if start != ng {
        return Err(format_err!(
            "generator table holds {} rows but categories account for {}",
            ng,
            start
        ));
    }

    // assemble the internal case
    let mut internal = Case {
        base_mva: case.base_mva,
        bus: case.bus[..n_is].to_vec(),
        gen: case
            .gen
            .iter()
            .zip(&gen_is)
            .filter(|(_, &on)| on)
            .map(|(g, _)| g.clone())
            .collect(),
        branch: case
            .branch
            .iter()
            .zip(&branch_is)
            .filter(|(_, &on)| on)
            .map(|(br, _)| br.clone())
            .collect(),
        gencost: Vec::new(),
        areas: case.areas.as_ref().map(|areas| {
            areas
                .iter()
                .filter(|a| a.price_ref_bus < n_is)
                .cloned()
                .collect()
        }),
        dcline: case.dcline.clone(),
        internal: Default::default(),
    };

    // canonical reference set: the ext_grid lookup, sentinels excluded
    let mut ref_gens: Vec<usize> = ctx
        .lookups
        .table(ElementKind::ExtGrid)
        .iter()
        .flatten()
        .copied()
        .collect();
    ref_gens.sort_unstable();
    ref_gens.dedup();

    internal.internal.gen_is = gen_is.clone();
    internal.internal.branch_is = branch_is.clone();
    internal.internal.ref_gens = ref_gens.clone();

    case.internal.gen_is = gen_is;
    case.internal.branch_is = branch_is;
    case.internal.gen_order = gen_order;
    case.internal.ref_gens = ref_gens;

    debug!(
        "reduced to {} buses, {} gens, {} branches",
        internal.bus.len(),
        internal.gen.len(),
        internal.branch.len()
    );
    ctx.internal = Some(internal);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{BusType, CaseArea, CaseBranch, CaseBus, CaseGen, DcLine};
    use crate::select::IsElements;

    fn bus(id: usize, bus_type: BusType) -> CaseBus {
        CaseBus {
            id,
            bus_type,
            pd: 0.0,
            qd: 0.0,
            gs: 0.0,
            bs: 0.0,
            area: 1,
            vm: 1.0,
            va: 0.0,
            base_kv: 110.0,
            zone: 1,
            vmax: 1.1,
            vmin: 0.9,
        }
    }

    fn gen(host: usize, pg: f64) -> CaseGen {
        CaseGen {
            bus: host,
            pg,
            qg: 0.0,
            qmax: 100.0,
            qmin: -100.0,
            vg: 1.0,
            mbase: 100.0,
            status: true,
            pmax: 200.0,
            pmin: 0.0,
        }
    }

    fn branch(from: usize, to: usize, status: bool) -> CaseBranch {
        CaseBranch {
            from_bus: from,
            to_bus: to,
            r: 0.01,
            x: 0.1,
            b: 0.0,
            rate_a: 0.0,
            tap: 1.0,
            shift: 0.0,
            status,
        }
    }

    /// Case with an out-of-service bus in the middle, one ext_grid and
    /// two gens (one on the dead bus), lines along the chain.
    fn chain_ctx() -> ConversionContext {
        let mut ctx = ConversionContext::new();
        ctx.case.base_mva = 100.0;
        ctx.case.bus = vec![
            bus(0, BusType::Ref),
            bus(1, BusType::Isolated),
            bus(2, BusType::Pv),
            bus(3, BusType::Pq),
        ];
        // gens out of bus order on purpose
        ctx.case.gen = vec![gen(0, 0.0), gen(2, 30.0), gen(1, 10.0)];
        ctx.case.branch = vec![branch(0, 1, true), branch(1, 2, true), branch(2, 3, true)];
        ctx.lookups
            .write(ElementKind::Bus, vec![Some(0), Some(1), Some(2), Some(3)]);
        ctx.is_elements = Some(IsElements {
            bus: vec![true, false, true, true],
            bus_by_id: vec![true, false, true, true],
            ext_grid: vec![true],
            gen: vec![true, true],
            ..Default::default()
        });
        ctx
    }

    #[test]
    fn internal_bus_index_equals_row_position() -> Result<()> {
        let mut ctx = chain_ctx();
        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        assert_eq!(internal.bus.len(), 3);
        for (i, b) in internal.bus.iter().enumerate() {
            assert_eq!(b.id, i);
            assert!(b.is_in_service());
        }
        // the dead bus lands at the end of the external table
        assert_eq!(ctx.case.bus[3].bus_type, BusType::Isolated);
        Ok(())
    }

    #[test]
    fn gens_sorted_by_host_and_masked() -> Result<()> {
        let mut ctx = chain_ctx();
        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        // gen on the dead bus (old bus 1) is dropped
        assert_eq!(internal.gen.len(), 2);
        let hosts: Vec<usize> = internal.gen.iter().map(|g| g.bus).collect();
        let mut sorted = hosts.clone();
        sorted.sort_unstable();
        assert_eq!(hosts, sorted);
        Ok(())
    }

    #[test]
    fn no_dangling_branch_endpoints() -> Result<()> {
        let mut ctx = chain_ctx();
        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        // both lines touching the dead bus are gone
        assert_eq!(internal.branch.len(), 1);
        for br in internal.branch.iter() {
            assert!(br.from_bus < internal.bus.len());
            assert!(br.to_bus < internal.bus.len());
        }
        Ok(())
    }

    #[test]
    fn bus_lookup_round_trip() -> Result<()> {
        let mut ctx = chain_ctx();
        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        // live buses resolve to their internal row, the dead one to the
        // sentinel, and sentinel ids never appear inside the case
        assert_eq!(ctx.lookups.get(ElementKind::Bus, 0), Some(0));
        assert_eq!(ctx.lookups.get(ElementKind::Bus, 1), None);
        assert_eq!(ctx.lookups.get(ElementKind::Bus, 2), Some(1));
        assert_eq!(ctx.lookups.get(ElementKind::Bus, 3), Some(2));
        for br in internal.branch.iter() {
            assert_ne!(internal.bus[br.from_bus].bus_type, BusType::Isolated);
        }
        Ok(())
    }

    #[test]
    fn ref_gens_follow_ext_grid_lookup() -> Result<()> {
        let mut ctx = chain_ctx();
        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        assert_eq!(ctx.lookups.get(ElementKind::ExtGrid, 0), Some(0));
        assert_eq!(internal.internal.ref_gens, vec![0]);
        assert_eq!(internal.bus[internal.gen[0].bus].bus_type, BusType::Ref);
        Ok(())
    }

    #[test]
    fn gen_lookup_skips_dead_host() -> Result<()> {
        let mut ctx = chain_ctx();
        to_internal(&mut ctx)?;

        // category gen #1 sits on the dead bus: sentinel
        assert_eq!(ctx.lookups.get(ElementKind::Gen, 0), Some(1));
        assert_eq!(ctx.lookups.get(ElementKind::Gen, 1), None);
        Ok(())
    }

    #[test]
    fn areas_rewritten_and_dcline_passed_through() -> Result<()> {
        let mut ctx = chain_ctx();
        ctx.case.areas = Some(vec![
            CaseArea { price_ref_bus: 0 },
            CaseArea { price_ref_bus: 1 }, // anchored on the dead bus
        ]);
        ctx.case.dcline = Some(vec![DcLine {
            from_bus: 0,
            to_bus: 2,
            pf: 5.0,
            status: true,
        }]);

        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        // external areas follow the renumbering; the dead-bus anchor
        // lands in the out-of-service tail
        let external = ctx.case.areas.as_ref().unwrap();
        assert_eq!(external[0].price_ref_bus, 0);
        assert_eq!(external[1].price_ref_bus, 3);

        // the internal case keeps only areas anchored on live buses
        let kept = internal.areas.as_ref().unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].price_ref_bus, 0);

        assert_eq!(internal.dcline, ctx.case.dcline);
        Ok(())
    }

    #[test]
    fn reduction_of_clean_case_is_identity_up_to_gen_sort() -> Result<()> {
        let mut ctx = ConversionContext::new();
        ctx.case.base_mva = 100.0;
        ctx.case.bus = vec![bus(0, BusType::Ref), bus(1, BusType::Pq)];
        ctx.case.gen = vec![gen(0, 0.0)];
        ctx.case.branch = vec![branch(0, 1, true)];
        ctx.lookups.write(ElementKind::Bus, vec![Some(0), Some(1)]);
        ctx.is_elements = Some(IsElements {
            bus: vec![true, true],
            bus_by_id: vec![true, true],
            ext_grid: vec![true],
            ..Default::default()
        });

        let bus_before = ctx.case.bus.clone();
        let gen_before = ctx.case.gen.clone();
        let branch_before = ctx.case.branch.clone();

        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();

        assert_eq!(internal.bus, bus_before);
        assert_eq!(internal.gen, gen_before);
        assert_eq!(internal.branch, branch_before);
        assert_eq!(ctx.lookups.get(ElementKind::Bus, 0), Some(0));
        assert_eq!(ctx.lookups.get(ElementKind::Bus, 1), Some(1));
        Ok(())
    }

    #[test]
    fn stable_sort_preserves_order_on_shared_bus() -> Result<()> {
        let mut ctx = ConversionContext::new();
        ctx.case.base_mva = 100.0;
        ctx.case.bus = vec![bus(0, BusType::Ref), bus(1, BusType::Pv)];
        ctx.case.gen = vec![gen(0, 0.0), gen(1, 11.0), gen(1, 22.0)];
        ctx.case.branch = vec![branch(0, 1, true)];
        ctx.lookups.write(ElementKind::Bus, vec![Some(0), Some(1)]);
        ctx.is_elements = Some(IsElements {
            bus: vec![true, true],
            bus_by_id: vec![true, true],
            ext_grid: vec![true],
            gen: vec![true, true],
            ..Default::default()
        });

        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();
        assert_eq!(internal.gen[1].pg, 11.0);
        assert_eq!(internal.gen[2].pg, 22.0);
        Ok(())
    }

    #[test]
    fn empty_gen_and_branch_sets_are_legal() -> Result<()> {
        let mut ctx = ConversionContext::new();
        ctx.case.base_mva = 100.0;
        ctx.case.bus = vec![bus(0, BusType::Pq)];
        ctx.lookups.write(ElementKind::Bus, vec![Some(0)]);
        ctx.is_elements = Some(IsElements {
            bus: vec![true],
            bus_by_id: vec![true],
            ..Default::default()
        });

        to_internal(&mut ctx)?;
        let internal = ctx.internal.as_ref().unwrap();
        assert_eq!(internal.bus.len(), 1);
        assert!(internal.gen.is_empty());
        assert!(internal.branch.is_empty());
        assert!(internal.internal.ref_gens.is_empty());
        Ok(())
    }
}
