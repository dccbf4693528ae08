//! Holiday landing pages: merge a region's data file into a cloned page layout.

use crate::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Write;
use std::path::Path as FsPath;
use tracing::{info, warn};

const RICH_TEXT_WIDGET: &str = "layoutSections.dnd_area.rows[0].0.rows[0].0";
const FAQ_WIDGET: &str = "layoutSections.dnd_area.rows[1].0.rows[0].0";
const RICH_TEXT_LABEL: &str = "Rich Text";
const FAQ_LABEL_MARKER: &str = "FAQ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holiday {
    pub date: String,
    pub day: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeItem {
    pub li: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypeList {
    #[serde(default)]
    pub ol: Vec<TypeItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// One region's scraped holiday data, as stored under `data/<region>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionData {
    pub state: String,
    pub h1: String,
    pub para: String,
    pub h2: String,
    pub para2: String,
    pub para3: String,
    /// First row is the scraped table header
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub types: TypeList,
    pub faq: Faq,
    #[serde(default)]
    pub pdf: Option<String>,
}

impl RegionData {
    pub fn load(path: &FsPath) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read region file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse region file {}", path.display()))
    }

    /// Lowercased state name used in output file names.
    pub fn slug(&self) -> String {
        self.state.trim().to_lowercase()
    }
}

/// Which widgets a merge managed to update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadReport {
    pub rich_text: bool,
    pub faq: bool,
}

pub fn render_holiday_rows(holidays: &[Holiday]) -> String {
    let mut rows = String::new();
    for holiday in holidays.iter().skip(1) {
        let _ = write!(
            rows,
            "<tr>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n</tr>\n",
            holiday.date, holiday.day, holiday.name, holiday.kind
        );
    }
    rows
}

/// `"Gazetted - Closed nationwide"` becomes a bold label and its description.
pub fn render_types_list(items: &[TypeItem]) -> String {
    let mut list = String::new();
    for item in items {
        let _ = match item.li.split_once(" - ") {
            Some((label, description)) => writeln!(
                list,
                "<li><strong>{} -</strong> {}</li>",
                label, description
            ),
            None => writeln!(list, "<li>{}</li>", item.li),
        };
    }
    list
}

/// Body HTML for the Rich Text widget.
pub fn render_rich_text_html(region: &RegionData) -> String {
    let rows = render_holiday_rows(&region.holidays);
    let types = if region.types.ol.is_empty() {
        String::new()
    } else {
        format!(
            "<!-- Types Sec -->\n<section class=\"types-sec\">\n<div class=\"content-wrapper\">\n<ol>\n{}</ol>\n</div>\n</section>\n",
            render_types_list(&region.types.ol)
        )
    };
    format!(
        r#"<section class="page-heading">
<div class="content-wrapper">
<h1 class="main-heading">{h1}</h1>
</div>
</section>
<!-- Hero Sec -->
<section class="hero-banner">
<div class="content-wrapper">
<p class="hero-para">{para}</p>
</div>
</section>
<!-- Table Sec -->
<section class="holiday-sec">
<div class="content-wrapper">
<table id="holiday-table">
<thead>
<tr>
<th>Date</th>
<th>Day</th>
<th>Holiday</th>
<th>Holiday Type</th>
</tr>
</thead>
<tbody>
{rows}</tbody>
</table>
</div>
</section>
{types}<!-- Impact Sec -->
<section class="impact-sec">
<div class="content-wrapper">
<h2>{h2}</h2>
<p>{para2}</p>
<p>{para3}</p>
</div>
</section>
<!-- CTA Sec -->"#,
        h1 = region.h1,
        para = region.para,
        rows = rows,
        types = types,
        h2 = region.h2,
        para2 = region.para2,
        para3 = region.para3,
    )
}

/// The widget's `params` object, created when absent.
fn widget_params(widget: &mut Value) -> Option<&mut Map<String, Value>> {
    widget
        .as_object_mut()?
        .entry("params")
        .or_insert_with(|| json!({}))
        .as_object_mut()
}

fn widget_at<'a>(page: &'a mut Value, location: &str) -> Option<&'a mut Value> {
    let path: Path = location.parse().ok()?;
    path.get_mut(page)
}

fn label_of(widget: &Value) -> &str {
    widget.get("label").and_then(Value::as_str).unwrap_or_default()
}

fn update_rich_text(page: &mut Value, region: &RegionData) -> bool {
    let Some(widget) = widget_at(page, RICH_TEXT_WIDGET) else {
        return false;
    };
    if label_of(widget) != RICH_TEXT_LABEL {
        return false;
    }
    let html = render_rich_text_html(region);
    match widget_params(widget) {
        Some(params) => {
            params.insert("html".to_string(), Value::String(html));
            true
        }
        None => false,
    }
}

fn update_faq(page: &mut Value, faq: &Faq) -> bool {
    let Some(widget) = widget_at(page, FAQ_WIDGET) else {
        return false;
    };
    if !label_of(widget).contains(FAQ_LABEL_MARKER) {
        return false;
    }
    let Some(group) = widget_params(widget).and_then(|params| {
        params
            .entry("content_group")
            .or_insert_with(|| json!({}))
            .as_object_mut()
    }) else {
        return false;
    };
    group.insert(
        "faq_list".to_string(),
        json!([{
            "question": faq.question,
            "answer": format!("<p>{}</p>", faq.answer),
        }]),
    );
    true
}

/// Merge `region` into a page snapshot in place.
///
/// A widget that is missing or carries an unexpected label is left untouched
/// and reported as not updated.
pub fn apply_region(page: &mut Value, region: &RegionData) -> PayloadReport {
    let report = PayloadReport {
        rich_text: update_rich_text(page, region),
        faq: update_faq(page, &region.faq),
    };

    if report.rich_text {
        info!("✓ Mapped {} data into the Rich Text widget", region.state);
    } else {
        warn!("✗ Could not find the Rich Text widget in the page");
    }
    if report.faq {
        info!("✓ Updated the FAQ widget");
    } else {
        warn!("⚠ Could not find the FAQ widget in the page");
    }

    report
}

/// Clone name for a region file stem: `west-bengal` -> `[Holiday] - West Bengal`.
pub fn clone_name(region: &str) -> String {
    let title = region
        .split(['-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("[Holiday] - {}", title)
}
