//! Derived columns

use crate::record::{ContainsA, DerivedColumns, InstrumentTable};
use tracing::debug;

/// Number of lowercase `a` characters in `full_name` (case-sensitive)
pub fn count_lowercase_a(full_name: Option<&str>) -> usize {
    full_name.map_or(0, |name| name.matches('a').count())
}

/// Derive the columns for a single `FullNm` value
pub fn derive(full_name: Option<&str>) -> DerivedColumns {
    let a_count = count_lowercase_a(full_name);
    DerivedColumns {
        a_count,
        contains_a: if a_count > 0 {
            ContainsA::Yes
        } else {
            ContainsA::No
        },
    }
}

/// Add `a_count` and `contains_a` to every record, in place.
///
/// Values depend only on `FullNm`, so calling this again recomputes the same
/// columns.
pub fn create_derived_columns(table: &mut InstrumentTable) {
    for record in table.records_mut() {
        record.derived = Some(derive(record.full_nm.as_deref()));
    }
    table.mark_derived();

    debug!(records = table.len(), "Derived columns computed");
}
