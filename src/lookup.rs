use anyhow::{format_err, Result};

/// Element categories that own a lookup table. The order of the
/// generator-like categories is the order their rows occupy in the case
/// generator table before sorting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Bus,
    ExtGrid,
    Gen,
    Sgen,
    Load,
    Storage,
}

impl ElementKind {
    /// Generator-like categories in their fixed case table order.
    pub const GEN_KINDS: [ElementKind; 5] = [
        ElementKind::ExtGrid,
        ElementKind::Gen,
        ElementKind::Sgen,
        ElementKind::Load,
        ElementKind::Storage,
    ];

    fn slot(&self) -> usize {
        match self {
            ElementKind::Bus => 0,
            ElementKind::ExtGrid => 1,
            ElementKind::Gen => 2,
            ElementKind::Sgen => 3,
            ElementKind::Load => 4,
            ElementKind::Storage => 5,
        }
    }
}

/// Per-category maps from user-facing element id to the numeric index of
/// the corresponding case row. A `None` slot means the element is
/// removed, out of service or not yet placed.
///
/// Lookups are created fresh on each full conversion and patched in place
/// as reduction reassigns indices; they are never shared between
/// independent conversions.
#[derive(Debug, Default, Clone)]
pub struct Lookups {
    tables: [Vec<Option<usize>>; 6],
}

impl Lookups {
    /// Replaces the stored lookup table for a category.
    pub fn write(&mut self, kind: ElementKind, table: Vec<Option<usize>>) {
        self.tables[kind.slot()] = table;
    }

    pub fn get(&self, kind: ElementKind, id: usize) -> Option<usize> {
        self.tables[kind.slot()].get(id).copied().flatten()
    }

    pub fn table(&self, kind: ElementKind) -> &[Option<usize>] {
        &self.tables[kind.slot()]
    }

    /// Applies an old-to-new index remap to every assigned entry of a
    /// category, leaving `None` entries untouched. Remapped values at or
    /// beyond `bound` mark rows that left the in-service range and become
    /// `None`. An assigned entry outside the remap's domain is an
    /// invariant violation, not a user error, and fails loudly.
    pub fn update(&mut self, kind: ElementKind, old_to_new: &[usize], bound: usize) -> Result<()> {
        for entry in self.tables[kind.slot()].iter_mut() {
            if let Some(old) = *entry {
                let new = *old_to_new.get(old).ok_or_else(|| {
                    format_err!(
                        "{:?} lookup entry {} outside remap domain of {}",
                        kind,
                        old,
                        old_to_new.len()
                    )
                })?;
                *entry = if new < bound { Some(new) } else { None };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_remaps_assigned_entries_only() -> Result<()> {
        let mut lookups = Lookups::default();
        lookups.write(ElementKind::Bus, vec![Some(0), None, Some(2), Some(1)]);

        // rows 0..3 reverse order, row position 2 leaves the kept range
        lookups.update(ElementKind::Bus, &[2, 1, 0], 2)?;

        assert_eq!(lookups.get(ElementKind::Bus, 0), None); // 0 -> 2 >= bound
        assert_eq!(lookups.get(ElementKind::Bus, 1), None); // untouched
        assert_eq!(lookups.get(ElementKind::Bus, 2), Some(0));
        assert_eq!(lookups.get(ElementKind::Bus, 3), Some(1));
        Ok(())
    }

    #[test]
    fn update_rejects_entry_outside_remap_domain() {
        let mut lookups = Lookups::default();
        lookups.write(ElementKind::Gen, vec![Some(5)]);

        let err = lookups.update(ElementKind::Gen, &[0, 1], 2);
        assert!(err.is_err());
    }

    #[test]
    fn missing_table_reads_as_unassigned() {
        let lookups = Lookups::default();
        assert_eq!(lookups.get(ElementKind::Storage, 7), None);
    }
}
