use crate::core::paginator::PageCursor;
use crate::core::HarvestResult;
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

/// How `{query}` and `{location}` are written into a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderEncoding {
    /// `application/x-www-form-urlencoded`, spaces as `+`.
    Form,
    /// Spaces replaced by `-`, the location lowercased, reserved characters
    /// percent-encoded.
    Slug,
}

/// Results-page URL template. Placeholders: `{query}`, `{location}`,
/// `{page}` (1-based when `first_page` is 1) and `{offset}` (results skipped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingTemplate {
    pub with_location: String,
    pub without_location: String,
    #[serde(default)]
    pub first_page: usize,
    pub encoding: PlaceholderEncoding,
}

impl ListingTemplate {
    pub fn render(
        &self,
        query: &str,
        location: Option<&str>,
        cursor: &PageCursor,
        page_size: usize,
    ) -> HarvestResult<Url> {
        let template = match location {
            Some(_) => &self.with_location,
            None => &self.without_location,
        };
        let rendered = template
            .replace("{query}", &self.encode(query, false))
            .replace("{location}", &self.encode(location.unwrap_or_default(), true))
            .replace("{page}", &(self.first_page + cursor.index).to_string())
            .replace("{offset}", &cursor.offset(page_size).to_string());

        Ok(Url::parse(&rendered)?)
    }

    fn encode(&self, value: &str, is_location: bool) -> String {
        let value = value.trim();
        match self.encoding {
            PlaceholderEncoding::Form => form_urlencoded::byte_serialize(value.as_bytes()).collect(),
            PlaceholderEncoding::Slug => {
                let slug = value.replace(' ', "-");
                let slug = if is_location { slug.to_lowercase() } else { slug };
                // Anything but letters, digits and `-._*` is percent-encoded,
                // so `#`, `?`, `/` and `&` stay inside their segment.
                form_urlencoded::byte_serialize(slug.as_bytes()).collect()
            }
        }
    }
}
