use crate::correlator::CorrelatorStats;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

/// A table with the shared preset and bold header cells.
pub fn create_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|header| Cell::new(header).add_attribute(Attribute::Bold)),
        );
    table
}

/// Engine counters as a two-column table.
pub fn format_stats_table(stats: &CorrelatorStats, pending: usize) -> String {
    let rows = [
        ("Lines read", stats.lines_read),
        ("Lines without identifier", stats.lines_dropped),
        ("Records emitted", stats.records_emitted),
        ("Records suppressed", stats.records_suppressed),
        ("Orphans discarded", stats.orphans_discarded),
        ("Records evicted", stats.records_evicted),
        ("Kept records cleaned", stats.stale_records_cleaned),
        ("Diagnostics emitted", stats.diagnostics_emitted),
        ("Still buffered", pending),
    ];

    let mut table = create_styled_table(&["Counter", "Value"]);
    for (name, value) in rows {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}
