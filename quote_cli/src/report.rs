//! Terminal tables for sections, lines, the top sheet and the registry.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use quote_core::catalog::Catalog;
use quote_core::presentation::{section_meta, AmountDisplay};
use quote_core::registry::ListingEntry;
use quote_core::session::QuoteSession;
use quote_core::store::Position;
use quote_core::summary::{RowKind, Summary};
use quote_core::ExtraFields;
use quote_core::{ProjectMetadata, Settings};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

/// Positive amounts in bold, empty ones as a dim marker.
fn amount_cell(display: AmountDisplay) -> Cell {
    if display.is_emphasized() {
        Cell::new(display).add_attribute(Attribute::Bold)
    } else {
        dim_cell(display)
    }
}

/// Sections and their item counts, or the items of one section.
pub fn catalog_table(catalog: &Catalog, section: Option<usize>) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);

    let meta = section_meta(catalog);
    match section.and_then(|index| catalog.section(index).map(|s| (index, s))) {
        Some((index, found)) => {
            table.set_header(vec![
                header_cell("Position"),
                header_cell("Subsection"),
                header_cell("Item"),
                header_cell("Unit"),
            ]);
            for (sub_index, sub) in found.subsections.iter().enumerate() {
                for (item_index, item) in sub.items.iter().enumerate() {
                    table.add_row(vec![
                        Cell::new(Position::new(index, sub_index, item_index)),
                        Cell::new(&sub.name),
                        Cell::new(&item.name),
                        dim_cell(&item.unit),
                    ]);
                }
            }
        }
        None => {
            table.set_header(vec![
                header_cell("#"),
                header_cell("Code"),
                header_cell("Section"),
                header_cell("Items"),
            ]);
            for m in &meta {
                if let Some(banner) = m.group {
                    table.add_row(vec![
                        dim_cell(""),
                        Cell::new(banner.code).add_attribute(Attribute::Bold),
                        Cell::new(banner.label).add_attribute(Attribute::Bold),
                        dim_cell(""),
                    ]);
                }
                let items: usize = catalog
                    .section(m.index)
                    .map_or(0, |s| s.subsections.iter().map(|sub| sub.items.len()).sum());
                table.add_row(vec![
                    Cell::new(m.index),
                    Cell::new(&m.display_code),
                    Cell::new(indented(&m.label, m.is_sub)),
                    Cell::new(items),
                ]);
            }
            align_column(&mut table, 3, CellAlignment::Right);
        }
    }
    table
}

/// One row per section with its total and navigation badge.
pub fn sections_table(session: &QuoteSession) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("#"),
        header_cell("Code"),
        header_cell("Section"),
        header_cell("Total"),
        header_cell("Badge"),
    ]);

    for m in session.section_meta() {
        if let Some(banner) = m.group {
            table.add_row(vec![
                dim_cell(""),
                Cell::new(banner.code).add_attribute(Attribute::Bold),
                Cell::new(banner.label).add_attribute(Attribute::Bold),
                dim_cell(""),
                dim_cell(""),
            ]);
        }
        let total = session.totals().section(m.index);
        table.add_row(vec![
            Cell::new(m.index),
            Cell::new(&m.display_code),
            Cell::new(indented(&m.label, m.is_sub)),
            amount_cell(AmountDisplay::money(total)),
            amount_cell(AmountDisplay::badge(total)),
        ]);
    }
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    table
}

/// Every line of one section with its values and total.
pub fn lines_table(session: &QuoteSession, section: usize) -> Option<Table> {
    let found = session.catalog().section(section)?;
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("Position"),
        header_cell("Item"),
        header_cell("Unit"),
        header_cell("Qty"),
        header_cell("Nb"),
        header_cell("Rate"),
        header_cell("Markup %"),
        header_cell("Total"),
        header_cell("Note"),
    ]);

    for (sub_index, sub) in found.subsections.iter().enumerate() {
        let subtotal = session.totals().subsection(section, sub_index);
        table.add_row(vec![
            dim_cell(""),
            Cell::new(&sub.name).add_attribute(Attribute::Bold),
            dim_cell(""),
            dim_cell(""),
            dim_cell(""),
            dim_cell(""),
            dim_cell(""),
            amount_cell(AmountDisplay::money(subtotal)),
            dim_cell(""),
        ]);
        for (item_index, item) in sub.items.iter().enumerate() {
            let pos = Position::new(section, sub_index, item_index);
            let Some(line) = session.line(pos) else {
                continue;
            };
            let row = vec![
                Cell::new(pos),
                Cell::new(indented(&item.name, true)),
                Cell::new(&line.unit),
                Cell::new(line.qty),
                Cell::new(line.nb),
                Cell::new(line.rate),
                Cell::new(line.effective_markup()),
                amount_cell(AmountDisplay::money(session.line_total(pos))),
                Cell::new(&line.note),
            ];
            table.add_row(if line.has_value() {
                row
            } else {
                row.into_iter().map(|cell| cell.fg(Color::DarkGrey)).collect::<Vec<_>>()
            });
        }
    }
    for column in 3..=7 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    Some(table)
}

/// Top sheet rows followed by the L / M / Q / R figures.
pub fn top_sheet_table(summary: &Summary, currency: &str) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("Code"),
        header_cell("Category"),
        header_cell("Cost"),
        header_cell(&format!("Markup {}%", summary.params.margin_percent)),
        header_cell("Total"),
    ]);

    for row in &summary.rows {
        let cells = vec![
            Cell::new(&row.id),
            Cell::new(indented(&row.label, row.kind == RowKind::Sub)),
            amount_cell(AmountDisplay::money(row.cost)),
            amount_cell(AmountDisplay::money(row.markup)),
            amount_cell(AmountDisplay::money(row.total)),
        ];
        table.add_row(match row.kind {
            RowKind::Subtotal => cells
                .into_iter()
                .map(|cell| cell.fg(Color::Cyan).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
            RowKind::Sub => cells.into_iter().map(|cell| cell.fg(Color::DarkGrey)).collect(),
            RowKind::Main => cells,
        });
    }

    let grand = &summary.grand;
    let vat_label = format!("VAT {}%", summary.params.vat_percent);
    let figures = [
        ("L", "Gross total", grand.gross_total),
        ("", "Cutdown", -summary.params.cutdown),
        ("M", "Net after cutdown", grand.net_after_cutdown),
        ("Q", vat_label.as_str(), grand.vat_amount),
        ("R", "Grand total", grand.grand_total),
    ];
    for (code, label, value) in figures {
        table.add_row(vec![
            Cell::new(code).add_attribute(Attribute::Bold),
            Cell::new(label).add_attribute(Attribute::Bold),
            dim_cell(""),
            dim_cell(""),
            signed_amount_cell(value, currency),
        ]);
    }
    for column in 2..=4 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    table
}

/// Grand figures may legitimately go negative (cutdown above gross).
fn signed_amount_cell(value: f64, currency: &str) -> Cell {
    if value < 0.0 {
        Cell::new(format!("{currency} {}", quote_core::presentation::format_money(value)))
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    } else {
        amount_cell(AmountDisplay::currency(value, currency))
    }
}

/// Saved quotes, in listing order.
pub fn registry_table(entries: &[ListingEntry]) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Title"),
        header_cell("Saved"),
        header_cell("Ref"),
    ]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.id),
            Cell::new(&entry.title),
            Cell::new(entry.saved_at.format("%Y-%m-%d %H:%M")),
            if entry.reference.trim().is_empty() {
                dim_cell("-")
            } else {
                Cell::new(&entry.reference)
            },
        ]);
    }
    table
}

/// Field / value listing of the project header.
pub fn project_table(project: &ProjectMetadata, settings: &Settings) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![header_cell("Field"), header_cell("Value")]);

    let date = project
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let rows = [
        ("title", project.title.clone()),
        ("advertiser", project.advertiser.clone()),
        ("agency", project.agency.clone()),
        ("client", project.client.clone()),
        ("product", project.product.clone()),
        ("director", project.director.clone()),
        ("ep", project.executive_producer.clone()),
        ("ref", project.reference.clone()),
        ("currency", project.currency.clone()),
        ("date", date),
        ("validity", project.validity.to_string()),
        ("type", project.production_type.clone()),
        ("margin", project.margin_percent(settings).to_string()),
        ("discount", project.discount.to_string()),
        ("notes", project.notes.clone()),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    table
}

/// Every known top sheet field plus any extra keys present.
pub fn extra_table(extra: &ExtraFields) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![header_cell("Key"), header_cell("Value")]);

    for key in quote_core::project::EXTRA_FIELDS {
        table.add_row(vec![Cell::new(key), Cell::new(extra.get(key).unwrap_or(""))]);
    }
    for (key, value) in extra.iter() {
        if !quote_core::project::EXTRA_FIELDS.contains(&key) {
            table.add_row(vec![dim_cell(key), Cell::new(value)]);
        }
    }
    table
}

/// Header lines printed above the top sheet.
pub fn quote_header(session: &QuoteSession) -> Vec<String> {
    let project = session.project();
    let mut lines = vec![
        project.display_title().to_string(),
        session.extra().company_display(project).to_string(),
    ];
    if let Some(reference) = project.reference_id() {
        lines.push(format!("Ref: {reference}"));
    }
    if let Some(date) = project.date {
        let mut issued = format!("Issued: {}", date.format("%Y-%m-%d"));
        if let Some(until) = project.valid_until() {
            issued.push_str(&format!("  (valid until {})", until.format("%Y-%m-%d")));
        }
        lines.push(issued);
    }
    lines
}

fn indented(label: &str, is_sub: bool) -> String {
    if is_sub {
        format!("  {label}")
    } else {
        label.to_string()
    }
}
