// src/process/extract.rs

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, trace};

use super::raw_table::{Field, IndicatorTable, YEAR_FIELD};
use super::utils::clean_text;
use crate::error::IngestError;

/// Row holding the reporting periods, counted over every `<tr>` in the page.
pub const PERIOD_ROW_INDEX: usize = 2;
/// Section headers before the first indicator table (the page title).
const LEADING_HEADERS: usize = 1;
/// Section headers after the last indicator table (footnotes).
const TRAILING_HEADERS: usize = 3;

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("td selector"));
static SECTION_HEADER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr.custom-row").expect("section header selector"));

/// Parse a country profile page into its indicator tables, in page order.
#[instrument(level = "debug", skip(html), fields(len = html.len()))]
pub fn extract(html: &str) -> Result<Vec<IndicatorTable>, IngestError> {
    let doc = Html::parse_document(html);
    let rows = raw_rows(&doc);
    let names = table_names(&doc)?;
    debug!(rows = rows.len(), tables = names.len(), "scanned profile");
    segment(&rows, &names)
}

/// Every `<tr>` as its cleaned `<td>` texts, in document order.
pub fn raw_rows(doc: &Html) -> Vec<Vec<String>> {
    doc.select(&ROW)
        .map(|tr| tr.select(&CELL).map(|td| element_text(&td)).collect())
        .collect()
}

/// Section header texts with the title and trailing notes removed.
pub fn table_names(doc: &Html) -> Result<Vec<String>, IngestError> {
    let headers: Vec<String> = doc.select(&SECTION_HEADER).map(|tr| element_text(&tr)).collect();
    if headers.len() <= LEADING_HEADERS + TRAILING_HEADERS {
        return Err(IngestError::structure(format!(
            "expected more than {} section headers, found {}",
            LEADING_HEADERS + TRAILING_HEADERS,
            headers.len()
        )));
    }
    Ok(headers[LEADING_HEADERS..headers.len() - TRAILING_HEADERS].to_vec())
}

/// Split the flat row sequence into one table per name.
///
/// A row whose first cell is a table name opens that table; a row whose
/// first cell is blank closes whatever is open. Every name must open exactly
/// once, in order, and be closed before the page ends.
pub fn segment(
    rows: &[Vec<String>],
    names: &[String],
) -> Result<Vec<IndicatorTable>, IngestError> {
    let periods: Vec<String> = rows
        .get(PERIOD_ROW_INDEX)
        .filter(|r| r.len() > 1)
        .map(|r| r[1..].to_vec())
        .ok_or_else(|| {
            IngestError::structure(format!("no reporting periods in row {}", PERIOD_ROW_INDEX))
        })?;

    let mut tables: Vec<IndicatorTable> = Vec::with_capacity(names.len());
    let mut open = false;

    for row in rows {
        let Some(first) = row.first() else {
            continue;
        };

        if let Some(idx) = names.iter().position(|n| n == first) {
            if idx != tables.len() {
                return Err(IngestError::structure(format!(
                    "section {:?} found at position {}, expected {:?}",
                    first,
                    tables.len(),
                    names.get(tables.len())
                )));
            }
            trace!(table = %first, "section start");
            tables.push(IndicatorTable {
                name: first.clone(),
                fields: Vec::new(),
            });
            open = true;
            continue;
        }

        if first.is_empty() {
            open = false;
            continue;
        }

        if open {
            if let Some(table) = tables.last_mut() {
                table.fields.push(Field {
                    name: first.clone(),
                    values: row[1..].to_vec(),
                });
            }
        }
    }

    if open {
        let last = tables.last().map(|t| t.name.as_str()).unwrap_or_default();
        return Err(IngestError::structure(format!(
            "section {:?} is never closed",
            last
        )));
    }
    if tables.len() != names.len() {
        return Err(IngestError::structure(format!(
            "found {} of {} sections; first missing is {:?}",
            tables.len(),
            names.len(),
            names[tables.len()]
        )));
    }

    for table in &mut tables {
        for field in &table.fields {
            if field.values.len() != periods.len() {
                return Err(IngestError::structure(format!(
                    "field {:?} in {:?} has {} values for {} periods",
                    field.name,
                    table.name,
                    field.values.len(),
                    periods.len()
                )));
            }
        }
        table.fields.push(Field {
            name: YEAR_FIELD.to_string(),
            values: periods.clone(),
        });
    }

    Ok(tables)
}

fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal profile page in the shape the site serves.
    fn profile_html(population: [&str; 2], gdp: [&str; 2]) -> String {
        format!(
            r#"<html><body><table>
            <tr class="custom-row"><td>Afghanistan</td></tr>
            <tr><td>World Development Indicators</td></tr>
            <tr><td> </td><td>2019</td><td>2020</td></tr>
            <tr class="custom-row"><td>Social Indicators</td></tr>
            <tr><td>Population, total</td><td>{}</td><td>{}</td></tr>
            <tr><td>Life expectancy at birth, total (years)</td><td>64</td><td>..</td></tr>
            <tr><td> </td></tr>
            <tr class="custom-row"><td>Economic Indicators</td></tr>
            <tr><td>GDP (current US$)</td><td>{}</td><td>{}</td></tr>
            <tr><td> </td></tr>
            <tr class="custom-row"><td>Source</td></tr>
            <tr><td>World Bank</td></tr>
            <tr class="custom-row"><td>Notes</td></tr>
            <tr class="custom-row"><td>Last updated</td></tr>
            </table></body></html>"#,
            population[0], population[1], gdp[0], gdp[1]
        )
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn extracts_sections_with_year_axis() {
        let html = profile_html(["38,041,754", "38,928,346"], ["18,904,490,262", ".."]);
        let tables = extract(&html).unwrap();

        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Social Indicators", "Economic Indicators"]);

        let social = &tables[0];
        let fields: Vec<_> = social.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            fields,
            ["Population, total", "Life expectancy at birth, total (years)", "Year"]
        );
        assert_eq!(social.fields[0].values, ["38,041,754", "38,928,346"]);
        assert_eq!(social.year().unwrap().values, ["2019", "2020"]);
        assert_eq!(tables[1].year().unwrap().values, ["2019", "2020"]);
    }

    #[test]
    fn too_few_headers() {
        let html = r#"<table><tr class="custom-row"><td>Title</td></tr>
            <tr class="custom-row"><td>Notes</td></tr></table>"#;
        assert!(matches!(extract(html), Err(IngestError::Structure(_))));
    }

    #[test]
    fn missing_section_is_reported_not_dropped() {
        let rows = vec![
            row(&["Title"]),
            row(&["x"]),
            row(&[" ", "2019"]),
            row(&["A"]),
            row(&["f", "1"]),
            row(&[""]),
        ];
        let names = row(&["A", "B"]);
        let err = segment(&rows, &names).unwrap_err();
        assert!(err.to_string().contains("\"B\""), "{}", err);
    }

    #[test]
    fn unclosed_section_is_rejected() {
        let rows = vec![
            row(&["Title"]),
            row(&["x"]),
            row(&["", "2019"]),
            row(&["A"]),
            row(&["f", "1"]),
        ];
        assert!(segment(&rows, &row(&["A"])).is_err());
    }

    #[test]
    fn ragged_field_is_rejected() {
        let rows = vec![
            row(&["Title"]),
            row(&["x"]),
            row(&["", "2019", "2020"]),
            row(&["A"]),
            row(&["f", "1"]),
            row(&[""]),
        ];
        let err = segment(&rows, &row(&["A"])).unwrap_err();
        assert!(err.to_string().contains("1 values for 2 periods"), "{}", err);
    }

    #[test]
    fn rows_after_blank_boundary_are_ignored() {
        let rows = vec![
            row(&["Title"]),
            row(&["x"]),
            row(&["", "2019"]),
            row(&["A"]),
            row(&["f", "1"]),
            row(&[""]),
            row(&["stray note"]),
            row(&[]),
        ];
        let tables = segment(&rows, &row(&["A"])).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].fields.len(), 2);
    }
}
