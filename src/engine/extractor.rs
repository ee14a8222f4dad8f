//! Selector extraction
//!
//! Applies field selector expressions to one row element. A selector
//! expression is `css` or `css@attribute`:
//! - without an attribute the element's visible text is extracted, trimmed
//!   and whitespace-collapsed
//! - with an attribute its trimmed value is extracted, null when absent or empty
//! - an empty CSS part targets the row element itself
//!
//! A field that matches nothing is null and only logged. Selector errors and
//! type conversion errors are reported as [`FieldFailure`]s; they never stop
//! the sibling fields from being extracted.

use crate::config::{EntitySpec, FieldSpec, PaginateMode};
use crate::data::{merge_rows, FieldValue, Row};
use crate::url::resolve_url;
use crate::{ExtractorError, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A parsed selector expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorExpr {
    /// CSS part, empty for the row element itself
    pub css: String,
    /// Attribute to read instead of the text
    pub attribute: Option<String>,
}

impl SelectorExpr {
    /// Splits an expression on its first unescaped `@`
    ///
    /// `\@` stands for a literal `@` inside the CSS part.
    ///
    /// ```
    /// use web_extractor::engine::SelectorExpr;
    ///
    /// let expr = SelectorExpr::parse("a.more@href");
    /// assert_eq!(expr.css, "a.more");
    /// assert_eq!(expr.attribute.as_deref(), Some("href"));
    ///
    /// let text = SelectorExpr::parse("span.price");
    /// assert_eq!(text.attribute, None);
    /// ```
    pub fn parse(expr: &str) -> Self {
        let mut css = String::with_capacity(expr.len());
        let mut chars = expr.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('@') => css.push('@'),
                    Some(other) => {
                        css.push('\\');
                        css.push(other);
                    }
                    None => css.push('\\'),
                },
                '@' => {
                    let attribute = chars.as_str().trim();
                    return Self {
                        css: css.trim().to_string(),
                        attribute: (!attribute.is_empty()).then(|| attribute.to_string()),
                    };
                }
                other => css.push(other),
            }
        }

        Self {
            css: css.trim().to_string(),
            attribute: None,
        }
    }

    fn compile(&self) -> Result<Option<Selector>> {
        if self.css.is_empty() {
            return Ok(None);
        }
        Selector::parse(&self.css)
            .map(Some)
            .map_err(|e| ExtractorError::Selector {
                selector: self.css.clone(),
                message: format!("{:?}", e),
            })
    }

    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        match &self.attribute {
            Some(name) => element
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            None => Some(element_text(element)),
        }
    }
}

/// Visible text of an element, trimmed and whitespace-collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A field whose extraction raised an error
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    pub field: String,
    pub selector: String,
    pub message: String,
}

/// Extracts one field from a row element
///
/// # Returns
///
/// * `Ok(FieldValue::Null)` - Nothing matched (logged, not an error)
/// * `Ok(value)` - The extracted, converted value
/// * `Err(ExtractorError)` - The selector is malformed or the value does not convert
pub fn extract_field(row: ElementRef<'_>, field: &str, spec: &FieldSpec) -> Result<FieldValue> {
    let expr = SelectorExpr::parse(spec.selector());
    let kind = spec.kind();

    let targets: Vec<ElementRef<'_>> = match expr.compile()? {
        None => vec![row],
        Some(selector) if kind.collects_all() => row.select(&selector).collect(),
        Some(selector) => row.select(&selector).take(1).collect(),
    };

    if targets.is_empty() {
        tracing::warn!("Field '{}' not found with selector '{}'", field, spec.selector());
        return Ok(FieldValue::Null);
    }

    if kind.collects_all() {
        let values: Vec<String> = targets
            .into_iter()
            .filter_map(|el| expr.read(el))
            .filter(|v| !v.is_empty())
            .collect();
        return Ok(if values.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::List(values)
        });
    }

    match targets.into_iter().next().and_then(|el| expr.read(el)) {
        Some(raw) => Ok(kind.convert(&raw)?),
        None => Ok(FieldValue::Null),
    }
}

/// Extracts every configured field of a row and merges them over `inherited`
pub fn extract_row(
    row: ElementRef<'_>,
    entity: &EntitySpec,
    inherited: &Row,
) -> (Row, Vec<FieldFailure>) {
    let mut extracted = Row::new();
    let mut failures = Vec::new();

    for (field, spec) in &entity.fields {
        let value = match extract_field(row, field, spec) {
            Ok(value) => value,
            Err(e) => {
                failures.push(FieldFailure {
                    field: field.clone(),
                    selector: spec.selector().to_string(),
                    message: e.to_string(),
                });
                FieldValue::Null
            }
        };
        extracted.insert(field.clone(), value);
    }

    (merge_rows(inherited, extracted), failures)
}

/// Everything extracted from one loaded page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub rows: Vec<Row>,
    pub failures: Vec<FieldFailure>,
    pub next_url: Option<String>,
}

/// Extracts the rows of a page and, in next-button mode, the next page URL
pub fn extract_page(
    html: &str,
    entity: &EntitySpec,
    inherited: &Row,
    base_url: &Url,
) -> Result<PageExtraction> {
    let document = Html::parse_document(html);
    let row_selector =
        Selector::parse(&entity.row_selector).map_err(|e| ExtractorError::Selector {
            selector: entity.row_selector.clone(),
            message: format!("{:?}", e),
        })?;

    let mut extraction = PageExtraction::default();
    for element in document.select(&row_selector) {
        let (row, failures) = extract_row(element, entity, inherited);
        extraction.rows.push(row);
        extraction.failures.extend(failures);
    }

    if extraction.rows.is_empty() {
        return Ok(extraction);
    }

    extraction.next_url = match &entity.paginate {
        Some(paginate) if paginate.mode == PaginateMode::NextButton => paginate
            .next_selector
            .as_deref()
            .map(|selector| next_page_href(&document, selector, base_url))
            .transpose()?
            .flatten(),
        _ => None,
    };

    Ok(extraction)
}

fn next_page_href(document: &Html, selector: &str, base_url: &Url) -> Result<Option<String>> {
    let parsed = Selector::parse(selector).map_err(|e| ExtractorError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })?;

    Ok(document
        .select(&parsed)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve_url(base_url, href)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginateConfig;
    use crate::data::{row_from, FieldType};

    fn first_row<'a>(document: &'a Html, selector: &str) -> ElementRef<'a> {
        let selector = Selector::parse(selector).unwrap();
        document.select(&selector).next().unwrap()
    }

    fn base() -> Url {
        Url::parse("https://shop.example.com/").unwrap()
    }

    #[test]
    fn test_parse_expressions() {
        assert_eq!(
            SelectorExpr::parse("img.cover @ src"),
            SelectorExpr {
                css: "img.cover".to_string(),
                attribute: Some("src".to_string())
            }
        );
        assert_eq!(SelectorExpr::parse("@href").css, "");
        assert_eq!(SelectorExpr::parse("a@").attribute, None);
        assert_eq!(
            SelectorExpr::parse(r"a[title='x\@y']@href"),
            SelectorExpr {
                css: "a[title='x@y']".to_string(),
                attribute: Some("href".to_string())
            }
        );
    }

    #[test]
    fn test_text_is_trimmed_and_collapsed() {
        let html = Html::parse_fragment(
            "<div class=\"item\"><span class=\"price\"> $12.00 </span>\
             <h2>  Blue \n  Widget </h2></div>",
        );
        let row = first_row(&html, ".item");

        assert_eq!(
            extract_field(row, "price", &"span.price".into()).unwrap(),
            FieldValue::text("$12.00")
        );
        assert_eq!(
            extract_field(row, "title", &"h2".into()).unwrap(),
            FieldValue::text("Blue Widget")
        );
    }

    #[test]
    fn test_attribute_extraction() {
        let html = Html::parse_fragment(
            "<div class=\"item\"><a href=\" /x \">more</a><img src=\"\"></div>",
        );
        let row = first_row(&html, ".item");

        assert_eq!(
            extract_field(row, "link", &"a@href".into()).unwrap(),
            FieldValue::text("/x")
        );
        assert_eq!(
            extract_field(row, "img", &"img@src".into()).unwrap(),
            FieldValue::Null
        );
        assert_eq!(
            extract_field(row, "missing", &"a@data-id".into()).unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_missing_field_is_null_without_error() {
        let html = Html::parse_fragment("<div class=\"item\"><p>x</p></div>");
        let row = first_row(&html, ".item");
        assert_eq!(
            extract_field(row, "price", &".price".into()).unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_row_element_itself() {
        let html = Html::parse_fragment("<a class=\"card\" href=\"/p/1\">Card</a>");
        let row = first_row(&html, "a.card");
        assert_eq!(
            extract_field(row, "link", &"@href".into()).unwrap(),
            FieldValue::text("/p/1")
        );
    }

    #[test]
    fn test_typed_fields() {
        let html = Html::parse_fragment(
            "<div class=\"item\"><span class=\"stars\">4.5 stars</span>\
             <span class=\"tag\">red</span><span class=\"tag\"> </span><span class=\"tag\">sale</span>\
             <span class=\"count\">none</span></div>",
        );
        let row = first_row(&html, ".item");

        assert_eq!(
            extract_field(row, "rating", &FieldSpec::typed(".stars", FieldType::Float)).unwrap(),
            FieldValue::Float(4.5)
        );
        assert_eq!(
            extract_field(row, "tags", &FieldSpec::typed(".tag", FieldType::StringList)).unwrap(),
            FieldValue::List(vec!["red".to_string(), "sale".to_string()])
        );
        assert!(matches!(
            extract_field(row, "count", &FieldSpec::typed(".count", FieldType::Integer)),
            Err(ExtractorError::Conversion(_))
        ));
    }

    #[test]
    fn test_failing_field_does_not_abort_row() {
        let entity = EntitySpec::with_url("List", "/", ".item")
            .field("bad", "div[")
            .field("title", "h2");
        let html = Html::parse_fragment("<div class=\"item\"><h2>Widget</h2></div>");
        let row = first_row(&html, ".item");

        let (extracted, failures) = extract_row(row, &entity, &Row::new());

        assert_eq!(extracted["title"], FieldValue::text("Widget"));
        assert_eq!(extracted["bad"], FieldValue::Null);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "bad");
        assert_eq!(failures[0].selector, "div[");
    }

    #[test]
    fn test_extracted_fields_win_over_inherited() {
        let entity = EntitySpec::with_url("Detail", "/", ".detail").field("title", "h1");
        let html = Html::parse_fragment("<div class=\"detail\"><h1>Detail</h1></div>");
        let row = first_row(&html, ".detail");
        let inherited = row_from([("title", "List"), ("sku", "A1")]);

        let (extracted, _) = extract_row(row, &entity, &inherited);

        assert_eq!(extracted["title"], FieldValue::text("Detail"));
        assert_eq!(extracted["sku"], FieldValue::text("A1"));
    }

    #[test]
    fn test_extract_page_with_next_button() {
        let entity = EntitySpec::with_url("List", "/", ".item")
            .field("name", "span")
            .paginate(PaginateConfig::next_button("a.next"));
        let html = "<ul><li class=\"item\"><span>a</span></li><li class=\"item\"><span>b</span></li></ul>\
                    <a class=\"next\" href=\"/list?p=2\">Next</a>";

        let page = extract_page(html, &entity, &Row::new(), &base()).unwrap();

        assert_eq!(page.rows.len(), 2);
        assert_eq!(
            page.next_url.as_deref(),
            Some("https://shop.example.com/list?p=2")
        );
    }

    #[test]
    fn test_next_url_only_in_next_button_mode() {
        let entity = EntitySpec::with_url("List", "/", ".item")
            .field("name", "span")
            .paginate(PaginateConfig::page_index(1));
        let html = "<li class=\"item\"><span>a</span></li><a class=\"next\" href=\"/p2\">Next</a>";

        let page = extract_page(html, &entity, &Row::new(), &base()).unwrap();
        assert_eq!(page.next_url, None);
    }

    #[test]
    fn test_zero_rows_has_no_next_page() {
        let entity = EntitySpec::with_url("List", "/", ".item")
            .paginate(PaginateConfig::next_button("a.next"));
        let html = "<p>empty</p><a class=\"next\" href=\"/p2\">Next</a>";

        let page = extract_page(html, &entity, &Row::new(), &base()).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.next_url, None);
    }
}
