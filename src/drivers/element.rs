use super::DriverError;
use scraper::{ElementRef, Html, Selector};

/// A detached snapshot of one DOM element, kept as its outer HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    html: String,
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Runs `selector` over a whole document.
pub fn select_document(document: &str, selector: &str) -> Result<Vec<PageElement>, DriverError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(document);
    Ok(document
        .select(&selector)
        .map(|el| PageElement { html: el.html() })
        .collect())
}

fn leading_tag(html: &str) -> Option<String> {
    let rest = html.trim_start().strip_prefix('<')?;
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (!name.is_empty()).then(|| name.to_ascii_lowercase())
}

/// Table parts are dropped by the parser outside a table, so they are
/// re-parsed inside one.
fn in_parse_context(tag: &str, html: &str) -> String {
    match tag {
        "tr" => format!("<table><tbody>{html}</tbody></table>"),
        "td" | "th" => format!("<table><tbody><tr>{html}</tr></tbody></table>"),
        "thead" | "tbody" | "tfoot" | "caption" | "colgroup" => format!("<table>{html}</table>"),
        "col" => format!("<table><colgroup>{html}</colgroup></table>"),
        _ => html.to_string(),
    }
}

impl PageElement {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    fn with_root<R>(&self, f: impl FnOnce(ElementRef<'_>) -> R) -> Option<R> {
        let tag = leading_tag(&self.html);
        let fragment = match tag.as_deref() {
            Some(tag) => Html::parse_fragment(&in_parse_context(tag, &self.html)),
            None => Html::parse_fragment(&self.html),
        };
        let root = tag
            .and_then(|tag| {
                fragment
                    .root_element()
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .find(|el| el.value().name() == tag)
            })
            .or_else(|| {
                fragment
                    .root_element()
                    .children()
                    .find_map(ElementRef::wrap)
            })?;
        Some(f(root))
    }

    /// Visible text with runs of whitespace collapsed.
    pub fn text(&self) -> String {
        self.with_root(|root| {
            root.text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_root(|root| root.value().attr(name).map(str::to_string))
            .flatten()
    }

    /// Descendants matching `selector`; the element itself is never included.
    pub fn query(&self, selector: &str) -> Result<Vec<PageElement>, DriverError> {
        let selector = parse_selector(selector)?;
        Ok(self
            .with_root(|root| {
                root.select(&selector)
                    .map(|el| PageElement { html: el.html() })
                    .collect()
            })
            .unwrap_or_default())
    }
}
