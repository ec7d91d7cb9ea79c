use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::types::{Ingredient, ProductRecord, RawPage};

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The page carries neither a product name nor nutrition facts, which is
    /// what the database serves for unknown identifiers.
    #[error("no product found on page for {identifier}")]
    ProductNotFound { identifier: String },
}

lazy_static! {
    static ref NAME: Selector = Selector::parse(r#"h1[property="food:name"]"#).unwrap();
    static ref BARCODE: Selector = Selector::parse("span#barcode").unwrap();
    static ref GRADE_TITLE: Selector = Selector::parse(r#"h4[class*="grade_"]"#).unwrap();
    static ref GREEN_SCORE_TOTAL: Selector =
        Selector::parse("div#panel_environment_score_total_content").unwrap();
    static ref CARBON_TITLE: Selector = Selector::parse("h4.evaluation_bad_title").unwrap();
    static ref SPAN: Selector = Selector::parse("span").unwrap();
    static ref STRONG: Selector = Selector::parse("strong").unwrap();
    static ref PANEL_TEXT: Selector = Selector::parse("div.panel_text").unwrap();
    static ref INGREDIENT_BLOCKS: Selector =
        Selector::parse("#panel_ingredients_list .accordion-navigation h4").unwrap();
    static ref NUTRITION_TABLE: Selector =
        Selector::parse(r#"table[aria-label="Nutrition facts"]"#).unwrap();
    static ref TABLE_ROW: Selector = Selector::parse("tr").unwrap();
    static ref TABLE_CELL: Selector = Selector::parse("td").unwrap();
}

/// Extracts a structured record from one fetched page. Missing markers yield
/// absent fields; only a page with no product at all is an error.
pub fn extract_product(page: &RawPage) -> Result<ProductRecord, ExtractError> {
    let doc = Html::parse_document(&page.body);

    let name = select_text(&doc, &NAME);
    let nutrients_100g = extract_nutrients(&doc, &page.identifier);

    // the unknown-product page has neither marker
    if name.is_none() && nutrients_100g.is_empty() {
        return Err(ExtractError::ProductNotFound {
            identifier: page.identifier.clone(),
        });
    }

    let barcode = select_text(&doc, &BARCODE).unwrap_or_else(|| page.identifier.clone());

    let categories = field_value(&doc, "categories")
        .map(|s| {
            s.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let (nutri_score, green_score) = extract_grades(&doc);
    let (carbon_impact_per_100g, carbon_equiv_distance) = extract_carbon(&doc);

    Ok(ProductRecord {
        barcode,
        name,
        brands: field_value(&doc, "brands"),
        categories,
        countries: field_value(&doc, "countries"),
        nutri_score,
        green_score,
        green_score_final: extract_green_score_final(&doc),
        carbon_impact_per_100g,
        carbon_equiv_distance,
        serving_size: labelled_sibling_text(&doc, "Serving size"),
        quantity: field_value(&doc, "quantity"),
        packaging: field_value(&doc, "packaging"),
        labels: field_value(&doc, "labels"),
        origin: field_value(&doc, "origin"),
        manufacturing_places: field_value(&doc, "manufacturing_places"),
        stores: field_value(&doc, "stores"),
        allergens: labelled_sibling_text(&doc, "Allergens"),
        ingredients_text: extract_ingredients_text(&doc),
        ingredients: extract_ingredients(&doc),
        conservation_conditions: field_value(&doc, "conservation_conditions"),
        customer_service: field_value(&doc, "customer_service"),
        nutrients_100g,
    })
}

fn select_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector).next().and_then(element_text)
}

fn element_text(element: ElementRef) -> Option<String> {
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Labelled spans all follow the `field_<name>_value` id convention.
fn field_value(doc: &Html, field: &str) -> Option<String> {
    let selector = Selector::parse(&format!("span#field_{}_value", field)).ok()?;
    select_text(doc, &selector)
}

/// Some values sit in a bare text node right after a `<strong>Label</strong>`.
fn labelled_sibling_text(doc: &Html, label: &str) -> Option<String> {
    for strong in doc.select(&STRONG) {
        let text = strong.text().collect::<String>();
        if !text.contains(label) {
            continue;
        }
        if let Some(sibling) = strong.next_sibling() {
            if let Some(value) = sibling.value().as_text() {
                let value = value.trim().trim_start_matches(':').trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Grade badges share a `grade_<letter>_title` class; the text distinguishes
/// the Nutri-Score from the environmental Green-Score.
fn extract_grades(doc: &Html) -> (Option<String>, Option<String>) {
    let mut nutri = None;
    let mut green = None;
    for h4 in doc.select(&GRADE_TITLE) {
        let Some(text) = element_text(h4) else { continue };
        if text.starts_with("Nutri-Score") && nutri.is_none() {
            nutri = Some(text);
        } else if (text.starts_with("Green-Score") || text.starts_with("Eco-Score"))
            && green.is_none()
        {
            green = Some(text);
        }
    }
    (nutri, green)
}

/// The environmental score panel carries the computed total as free text
/// after a "Final score:" label.
fn extract_green_score_final(doc: &Html) -> Option<String> {
    let panel = doc.select(&GREEN_SCORE_TOTAL).next()?;
    let text = panel.text().collect::<String>();
    let rest = text.split_once("Final score:")?.1;
    let value = rest.lines().next().unwrap_or("").trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// The carbon block is an `evaluation_bad_title` heading followed by a span
/// with the per-100g figure; the same figure doubles as the driving-distance
/// equivalent when the heading says so.
fn extract_carbon(doc: &Html) -> (Option<String>, Option<String>) {
    let Some(title) = doc.select(&CARBON_TITLE).next() else {
        return (None, None);
    };
    let impact = following_span_text(title);
    let equiv = title
        .text()
        .collect::<String>()
        .contains("Equal to driving")
        .then(|| impact.clone())
        .flatten();
    (impact, equiv)
}

/// First span after the element in document order, sibling or nested in one.
fn following_span_text(element: ElementRef) -> Option<String> {
    for sibling in element.next_siblings() {
        let Some(el) = ElementRef::wrap(sibling) else { continue };
        if el.value().name() == "span" {
            if let Some(text) = element_text(el) {
                return Some(text);
            }
        }
        if let Some(span) = el.select(&SPAN).next() {
            if let Some(text) = element_text(span) {
                return Some(text);
            }
        }
    }
    None
}

fn extract_ingredients_text(doc: &Html) -> Option<String> {
    for panel in doc.select(&PANEL_TEXT) {
        let text = panel.text().collect::<String>();
        let text = text.trim();
        for marker in ["English:", "French:"] {
            if let Some(rest) = text.strip_prefix(marker) {
                let rest = rest.trim();
                if !rest.is_empty() {
                    return Some(rest.to_string());
                }
            }
        }
    }
    None
}

fn extract_ingredients(doc: &Html) -> Vec<Ingredient> {
    let mut ingredients = vec![];
    for h4 in doc.select(&INGREDIENT_BLOCKS) {
        let Some(text) = element_text(h4) else { continue };
        let (name, percentage) = match text.split_once(':') {
            Some((name, pct)) => {
                let pct = pct.trim();
                (name, (!pct.is_empty()).then(|| pct.to_string()))
            }
            None => (text.as_str(), None),
        };
        let name = name.trim_matches(|c: char| c == '\u{2013}' || c == '\u{2014}' || c == '-');
        let name = name.trim();
        if !name.is_empty() {
            ingredients.push(Ingredient {
                name: name.to_string(),
                percentage,
            });
        }
    }
    ingredients
}

fn extract_nutrients(doc: &Html, identifier: &str) -> BTreeMap<String, f64> {
    let mut nutrients = BTreeMap::new();
    let Some(table) = doc.select(&NUTRITION_TABLE).next() else {
        return nutrients;
    };

    for row in table.select(&TABLE_ROW) {
        let cells = row.select(&TABLE_CELL).collect::<Vec<_>>();
        if cells.len() < 2 {
            continue;
        }
        let Some(nutrient) = element_text(cells[0]) else { continue };
        let Some(raw_value) = element_text(cells[1]) else { continue };
        match parse_nutrient_value(&raw_value) {
            Some(value) => {
                nutrients.insert(nutrient, value);
            }
            None => {
                // field-level recovery: an unparseable value is dropped, not fatal
                warn!(
                    "could not parse nutrient {:?} value {:?} for {}",
                    nutrient, raw_value, identifier
                );
            }
        }
    }
    nutrients
}

/// Parses a nutrition cell into a number, tolerating locale decimal
/// separators, thousands separators, approximation prefixes and trailing
/// units ("12,5 g", "<0.5g", "1.234,5 mg").
pub fn parse_nutrient_value(raw: &str) -> Option<f64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let token: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let normalized = if token.contains(',') && token.contains('.') {
        // the later separator is the decimal point
        if token.rfind(',') > token.rfind('.') {
            token.replace('.', "").replace(',', ".")
        } else {
            token.replace(',', "")
        }
    } else if token.contains(',') {
        // a lone comma is ambiguous: exactly three digits after it and a
        // non-zero integer part reads as an English thousands separator
        // ("2,252"), anything else as a decimal comma ("25,5", "0,500")
        let parts: Vec<&str> = token.split(',').collect();
        let thousands =
            parts.len() > 2 || (parts[1].len() == 3 && parts[0] != "0" && !parts[0].is_empty());
        if thousands {
            token.replace(',', "")
        } else {
            token.replace(',', ".")
        }
    } else {
        token
    };

    normalized.trim_end_matches('.').parse::<f64>().ok()
}
