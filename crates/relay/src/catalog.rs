//! Renders inventory rows as the Markdown table embedded in the opening prompt.

use motoasesor_core::InventoryRow;

/// Sentence used instead of a table when nothing is in stock or the store
/// could not be read.
pub const NO_INVENTORY: &str = "Actualmente no tenemos motocicletas en el inventario.";

const HEADER: &str = "| ID | Marca | Modelo | Cilindrada | Precio | Tipo | Stock |\n";
const SEPARATOR: &str = "|----|-------|--------|------------|--------|------|-------|\n";

/// Format `rows` in the given order. Every line, the last included, ends
/// with `\n`. Cell text is not escaped, so a `|` inside a value breaks the
/// column layout.
pub fn format_catalog(rows: &[InventoryRow]) -> String {
    if rows.is_empty() {
        return NO_INVENTORY.to_string();
    }

    let mut table = String::with_capacity(HEADER.len() + SEPARATOR.len() + rows.len() * 64);
    table.push_str(HEADER);
    table.push_str(SEPARATOR);
    for row in rows {
        table.push_str(&format!(
            "| {} | {} | {} | {}cc | ${:.2} | {} | {} |\n",
            row.id, row.brand, row.model, row.displacement_cc, row.price, row.category, row.stock
        ));
    }
    table
}
