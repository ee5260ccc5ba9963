use crate::domain::model::ParsedRecord;
use crate::domain::table::EMPTY;
use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// One named field pulled from markup: the element's text, or `attr` when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
    /// Join every match with `\n` instead of taking the first.
    #[serde(default)]
    pub multiple: bool,
}

impl FieldSpec {
    fn text(name: &str, selector: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            attr: None,
            multiple: false,
        }
    }

    fn attr(name: &str, selector: &str, attr: &str) -> Self {
        Self {
            attr: Some(attr.to_string()),
            ..Self::text(name, selector)
        }
    }

    fn lines(name: &str, selector: &str) -> Self {
        Self {
            multiple: true,
            ..Self::text(name, selector)
        }
    }
}

/// Search result page: one card per result, fields resolved inside each card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSchema {
    pub card: String,
    pub fields: Vec<FieldSpec>,
    /// Field holding each card's detail link.
    pub link_field: String,
}

impl Default for ListingSchema {
    fn default() -> Self {
        let title = r#"h1 > a[target="_top"]"#;
        let company = r#"a[data-automation="jobCardCompanyLink"]"#;
        let location = r#"a[data-automation="jobCardLocationLink"]"#;
        Self {
            card: "article".to_string(),
            fields: vec![
                FieldSpec::attr("positionUrl", title, "href"),
                FieldSpec::text("position", title),
                FieldSpec::attr("jobCompanyLink", company, "href"),
                FieldSpec::text("jobCompany", company),
                FieldSpec::attr("jobLocationLink", location, "href"),
                FieldSpec::text("jobLocation", location),
                FieldSpec::attr("launchTime", "time", "datetime"),
            ],
            link_field: "positionUrl".to_string(),
        }
    }
}

/// Detail page: `anchor` must be present, fields are resolved over the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSchema {
    pub anchor: String,
    pub fields: Vec<FieldSpec>,
}

impl Default for DetailSchema {
    fn default() -> Self {
        Self {
            anchor: "#contentContainer".to_string(),
            fields: vec![
                FieldSpec::lines(
                    "jobHighlights",
                    r#"div[data-automation="job-details-job-highlights"] li"#,
                ),
                FieldSpec::lines("jobDescription", r#"div[data-automation="jobDescription"] p"#),
                FieldSpec::text(
                    "additionalInfo",
                    "#contentContainer > div > div > div:nth-of-type(2) > div > div:nth-of-type(1) \
                     > div > div:nth-of-type(3) > div > div:nth-of-type(2)",
                ),
                FieldSpec::attr("applyLink", r#"a[data-automation="applyNowButton"]"#, "href"),
            ],
        }
    }
}

struct CompiledField {
    name: String,
    selector: Selector,
    attr: Option<String>,
    multiple: bool,
}

fn compile_selector(field: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: selector.to_string(),
        reason: format!("Invalid CSS selector: {}", e),
    })
}

fn compile_fields(prefix: &str, fields: &[FieldSpec]) -> Result<Vec<CompiledField>> {
    fields
        .iter()
        .map(|spec| {
            Ok(CompiledField {
                name: spec.name.clone(),
                selector: compile_selector(&format!("{}.{}", prefix, spec.name), &spec.selector)?,
                attr: spec.attr.clone(),
                multiple: spec.multiple,
            })
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl CompiledField {
    fn value_of(&self, element: ElementRef<'_>) -> String {
        match &self.attr {
            Some(attr) => element.value().attr(attr).unwrap_or(EMPTY).trim().to_string(),
            None => collapse_whitespace(&element.text().collect::<String>()),
        }
    }

    /// Always one string per scope, `""` when nothing matches.
    fn extract(&self, scope: ElementRef<'_>) -> String {
        if self.multiple {
            scope
                .select(&self.selector)
                .map(|element| self.value_of(element))
                .filter(|value| !value.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            scope
                .select(&self.selector)
                .next()
                .map(|element| self.value_of(element))
                .unwrap_or_default()
        }
    }
}

pub struct CompiledListing {
    card: Selector,
    fields: Vec<CompiledField>,
    link_field: String,
}

pub struct CompiledDetail {
    anchor_source: String,
    anchor: Selector,
    fields: Vec<CompiledField>,
}

impl ListingSchema {
    pub fn compile(&self) -> Result<CompiledListing> {
        Ok(CompiledListing {
            card: compile_selector("jobs.listing.card", &self.card)?,
            fields: compile_fields("jobs.listing", &self.fields)?,
            link_field: self.link_field.clone(),
        })
    }
}

impl DetailSchema {
    pub fn compile(&self) -> Result<CompiledDetail> {
        Ok(CompiledDetail {
            anchor_source: self.anchor.clone(),
            anchor: compile_selector("jobs.detail.anchor", &self.anchor)?,
            fields: compile_fields("jobs.detail", &self.fields)?,
        })
    }
}

/// Parallel, index-aligned sequences: entry `i` of every field belongs to card `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    fields: Vec<(String, Vec<String>)>,
    len: usize,
}

impl SearchPage {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Listing fields of card `index` as one record.
    pub fn record_at(&self, index: usize) -> Option<ParsedRecord> {
        if index >= self.len {
            return None;
        }
        let mut record = ParsedRecord::new();
        for (name, values) in &self.fields {
            record.insert(name.clone(), values[index].clone());
        }
        Some(record)
    }
}

impl CompiledListing {
    pub fn link_field(&self) -> &str {
        &self.link_field
    }

    pub fn parse_pages(&self, html: &str) -> Result<SearchPage> {
        let document = Html::parse_document(html);
        let mut fields: Vec<(String, Vec<String>)> = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), Vec::new()))
            .collect();

        let mut len = 0;
        for card in document.select(&self.card) {
            for (field, (_, values)) in self.fields.iter().zip(fields.iter_mut()) {
                values.push(field.extract(card));
            }
            len += 1;
        }

        if len == 0 {
            return Err(EtlError::parse("search results", "card"));
        }

        tracing::debug!("Parsed {} result cards", len);
        Ok(SearchPage { fields, len })
    }
}

impl CompiledDetail {
    pub fn parse_detail(&self, html: &str, key: &str) -> Result<ParsedRecord> {
        let document = Html::parse_document(html);
        if document.select(&self.anchor).next().is_none() {
            return Err(EtlError::parse(key, &self.anchor_source));
        }

        let root = document.root_element();
        let mut record = ParsedRecord::new();
        for field in &self.fields {
            record.insert(field.name.clone(), field.extract(root));
        }
        Ok(record)
    }
}

/// Parses a search result page with `schema`.
pub fn parse_pages(html: &str, schema: &ListingSchema) -> Result<SearchPage> {
    schema.compile()?.parse_pages(html)
}

/// Parses one job detail page with `schema`; `key` identifies the page in errors.
pub fn parse_detail(html: &str, schema: &DetailSchema, key: &str) -> Result<ParsedRecord> {
    schema.compile()?.parse_detail(html, key)
}
