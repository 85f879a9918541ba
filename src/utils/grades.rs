use std::sync::OnceLock;
use scraper::{ElementRef, Html, Selector};
use crate::error::{Error, Result};
use crate::models::{Grade, GradeSet};

const ROW_SELECTOR: &str = "tr.lastGradeRow";
const CELLS_PER_ROW: usize = 5;

fn row_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse(ROW_SELECTOR).expect("valid row selector"))
}

fn cell_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("td").expect("valid cell selector"))
}

// Walks the "last grades" rows of the document once, in page order.
pub fn extract_grades(document: &Html) -> impl Iterator<Item = Result<Grade>> + '_ {
    document
        .select(row_selector())
        .enumerate()
        .map(|(row, tr)| parse_row(row, tr))
}

// Parses a grades page body into the full listing, failing on the first malformed row.
pub fn parse_grades(html: &str) -> Result<GradeSet> {
    let document = Html::parse_document(html);
    extract_grades(&document).collect()
}

// Cells are read by position: badge, course, type, lecturer, assessment.
fn parse_row(row: usize, tr: ElementRef) -> Result<Grade> {
    let cells: Vec<String> = tr.select(cell_selector()).map(cell_text).collect();
    if cells.len() < CELLS_PER_ROW {
        return Err(Error::MalformedRow {
            row,
            reason: format!("expected {} cells, found {}", CELLS_PER_ROW, cells.len()),
        });
    }

    // The assessment cell may carry extra lines (date, comment) after the score.
    let assessment = cells[4].lines().next().unwrap_or_default().trim();
    let grade = Grade::new(&cells[1], &cells[2], &cells[3], assessment);

    if grade.identity.is_empty() {
        return Err(Error::MalformedRow {
            row,
            reason: "course and assessment type are both empty".to_string(),
        });
    }
    Ok(grade)
}

fn cell_text(td: ElementRef) -> String {
    td.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: &str) -> String {
        format!("<html><body><table class=\"grades\"><tbody>{}</tbody></table></body></html>", rows)
    }

    const ROW_A: &str = r#"<tr class="lastGradeRow">
        <td><span class="badge">new</span></td>
        <td> Micro Economics </td>
        <td>Mid term</td>
        <td>J. Smith</td>
        <td>8
            2024-01-15</td>
    </tr>"#;

    const ROW_B: &str = r#"<tr class="lastGradeRow">
        <td></td><td>Statistics</td><td>Final exam</td><td>A. Jones</td><td>10</td>
    </tr>"#;

    #[test]
    fn extracts_rows_in_page_order() {
        let grades: Vec<Grade> = parse_grades(&page(&format!("{}{}", ROW_A, ROW_B)))
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].course, "Micro Economics");
        assert_eq!(grades[0].assessment_type, "Mid term");
        assert_eq!(grades[0].lecturer, "J. Smith");
        assert_eq!(grades[0].assessment, "8");
        assert_eq!(grades[0].identity, "MicroEconomicsMidterm");
        assert_eq!(grades[1].identity, "StatisticsFinalexam");
        assert_eq!(grades[1].assessment, "10");
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = page(&format!("{}{}", ROW_B, ROW_A));
        let first: Vec<Grade> = parse_grades(&html).unwrap().into_iter().collect();
        let second: Vec<Grade> = parse_grades(&html).unwrap().into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn page_without_rows_is_empty() {
        let html = page(r#"<tr class="header"><td>Nothing yet</td></tr>"#);
        assert!(parse_grades(&html).unwrap().is_empty());
        assert!(parse_grades("").unwrap().is_empty());
    }

    #[test]
    fn short_row_is_an_error() {
        let html = page(&format!(
            "{}<tr class=\"lastGradeRow\"><td></td><td>Law</td><td>Exam</td></tr>",
            ROW_A
        ));
        match parse_grades(&html) {
            Err(Error::MalformedRow { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected a malformed row, got {:?}", other),
        }
    }

    #[test]
    fn row_without_identity_is_an_error() {
        let html = page(r#"<tr class="lastGradeRow"><td></td><td> </td><td></td><td>X</td><td>9</td></tr>"#);
        assert!(matches!(parse_grades(&html), Err(Error::MalformedRow { row: 0, .. })));
    }

    #[test]
    fn extraction_is_lazy_over_rows() {
        let html = page(&format!(
            "{}<tr class=\"lastGradeRow\"><td></td></tr>",
            ROW_A
        ));
        let document = Html::parse_document(&html);
        let mut rows = extract_grades(&document);
        assert!(rows.next().unwrap().is_ok());
        assert!(rows.next().unwrap().is_err());
        assert!(rows.next().is_none());
    }
}
