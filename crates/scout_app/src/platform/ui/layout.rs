use scout_core::ResultRow;

const INDEX_WIDTH: usize = 4;
const DATE_WIDTH: usize = 10;
const SEPARATOR: &str = " | ";
const MIN_TEXT_WIDTH: usize = 8;

/// Title, company and location widths for a table `width` characters wide.
fn text_widths(width: usize) -> [usize; 3] {
    let fixed = INDEX_WIDTH + DATE_WIDTH + SEPARATOR.len() * 4;
    let free = width.saturating_sub(fixed);
    let title = (free * 4 / 10).max(MIN_TEXT_WIDTH);
    let company = (free * 3 / 10).max(MIN_TEXT_WIDTH);
    let location = free.saturating_sub(title + company).max(MIN_TEXT_WIDTH);
    [title, company, location]
}

/// One line per collected row, printed as rows stream in.
pub fn format_row(index: usize, row: &ResultRow) -> String {
    let location = if row.location.is_empty() {
        String::new()
    } else {
        format!(" ({})", row.location)
    };
    format!("{:>3}. {} @ {}{}", index, row.title, row.company, location)
}

/// Fixed-width table of the final rows.
pub fn format_table(rows: &[ResultRow], width: usize) -> String {
    let [title, company, location] = text_widths(width);
    let mut lines = Vec::with_capacity(rows.len() + 2);

    let header = join_cells(&[
        fit("#", INDEX_WIDTH),
        fit("Title", title),
        fit("Company", company),
        fit("Location", location),
        fit("Date", DATE_WIDTH),
    ]);
    lines.push("-".repeat(header.chars().count()));
    lines.insert(0, header);

    for (i, row) in rows.iter().enumerate() {
        lines.push(join_cells(&[
            fit(&(i + 1).to_string(), INDEX_WIDTH),
            fit(&row.title, title),
            fit(&row.company, company),
            fit(&row.location, location),
            fit(&row.date, DATE_WIDTH),
        ]));
    }
    lines.join("\n")
}

fn join_cells(cells: &[String]) -> String {
    cells.join(SEPARATOR).trim_end().to_string()
}

/// Pads or truncates `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let text = text.trim();
    let len = text.chars().count();
    if len <= width {
        return format!("{text:<width$}");
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
