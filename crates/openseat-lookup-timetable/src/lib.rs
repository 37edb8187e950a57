// # Timetable Lookup
//
// This crate provides the course timetable web-form lookup for the openseat
// monitor.
//
// ## How it works
//
// The timetable exposes a single search form. Both capabilities POST that
// form for one section id and scan the returned page:
//
// - **resolve_name()**: unfiltered search; the course title is the third
//   cell of the result row whose first cell carries the id
// - **check_available()**: same search with `open_only=on`; the section is
//   available iff it still appears in the filtered results
//
// ## Trust Level: Untrusted
//
// - ✅ One HTTP request per call, 30 second client timeout
// - ✅ Non-200 responses are errors, mapped by status class (401, 403, 404, 429, 5xx)
// - ❌ NO retry logic (the engine polls again next cycle)
// - ❌ NO caching between calls

pub mod html;

use async_trait::async_trait;
use openseat_core::AdapterRegistry;
use openseat_core::config::LookupConfig;
use openseat_core::traits::{AvailabilityLookup, AvailabilityLookupFactory};
use openseat_core::{Error, Result};
use std::time::Duration;

/// Default HTTP timeout for timetable requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Class of the result tables in the timetable page
const RESULT_TABLE_CLASS: &str = "dataentrytable";

/// Timetable web-form lookup
#[derive(Debug)]
pub struct TimetableLookup {
    /// Form endpoint
    base_url: String,

    /// Term code (e.g. "202601")
    term: String,

    /// Campus code (e.g. "0")
    campus: String,

    /// HTTP client for form requests
    client: reqwest::Client,
}

impl TimetableLookup {
    /// Create a new timetable lookup
    ///
    /// # Parameters
    ///
    /// - `base_url`: Form endpoint
    /// - `term`: Term code
    /// - `campus`: Campus code
    pub fn new(
        base_url: impl Into<String>,
        term: impl Into<String>,
        campus: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            term: term.into(),
            campus: campus.into(),
            client,
        })
    }

    /// Form fields for a search on one section
    ///
    /// With `open_only`, the timetable only lists sections with free seats.
    pub fn build_payload(&self, id: &str, open_only: bool) -> Vec<(&'static str, String)> {
        let mut payload = vec![
            ("CAMPUS", self.campus.clone()),
            ("TERMYEAR", self.term.clone()),
            ("CORE_CODE", "AR%".to_string()),
            ("subj_code", "%".to_string()),
            ("SCHDTYPE", "%".to_string()),
            ("CRSE_NUMBER", String::new()),
            ("crn", id.to_string()),
            ("sess_code", "%".to_string()),
            ("BTN_PRESSED", "FIND class sections".to_string()),
            ("inst_name", String::new()),
            ("disp_comments_in", String::new()),
        ];
        if open_only {
            payload.push(("open_only", "on".to_string()));
        }
        payload
    }

    /// POST the search form and return the page body
    async fn fetch_document(&self, payload: &[(&'static str, String)]) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .form(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("Timetable request timed out: {}", e))
                } else {
                    Error::http(format!("Timetable request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            // Map HTTP status codes to specific errors
            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!("Timetable refused the request: {}", status)),
                404 => Error::not_found(format!("Timetable endpoint not found: {}", status)),
                429 => Error::rate_limited(format!("Timetable throttled the request: {}", status)),
                500..=599 => Error::adapter(
                    "timetable",
                    format!("Timetable server error (transient): {}", status),
                ),
                _ => Error::adapter("timetable", format!("unexpected status: {}", status)),
            });
        }

        response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read timetable response: {}", e)))
    }
}

/// Whether the result tables mention `id` anywhere
pub fn section_listed(document: &str, id: &str) -> bool {
    html::class_blocks(document, RESULT_TABLE_CLASS)
        .into_iter()
        .map(html::text_content)
        .collect::<String>()
        .contains(id)
}

/// Course title from the last result row whose first cell carries `id`
pub fn course_name(document: &str, id: &str) -> Option<String> {
    let mut name = None;

    for table in html::class_blocks(document, RESULT_TABLE_CLASS) {
        for row in html::descendants(table, "tr") {
            let cells = html::children(row, "td");
            let Some(first) = cells.first() else {
                continue;
            };
            if html::text_content(first).contains(id) {
                name = cells
                    .get(2)
                    .map(|cell| html::normalize_whitespace(&html::text_content(cell)));
            }
        }
    }

    name.filter(|n| !n.is_empty())
}

#[async_trait]
impl AvailabilityLookup for TimetableLookup {
    async fn resolve_name(&self, id: &str) -> Result<String> {
        tracing::debug!("Resolving course name for {}", id);

        let document = self.fetch_document(&self.build_payload(id, false)).await?;
        course_name(&document, id)
            .ok_or_else(|| Error::not_found(format!("course not found for CRN: {}", id)))
    }

    async fn check_available(&self, id: &str) -> Result<bool> {
        let document = self.fetch_document(&self.build_payload(id, true)).await?;
        Ok(section_listed(&document, id))
    }

    fn lookup_name(&self) -> &'static str {
        "timetable"
    }
}

/// Factory for creating timetable lookups
pub struct TimetableFactory;

impl AvailabilityLookupFactory for TimetableFactory {
    fn create(&self, config: &LookupConfig) -> Result<Box<dyn AvailabilityLookup>> {
        match config {
            LookupConfig::Timetable {
                base_url,
                term,
                campus,
            } => Ok(Box::new(TimetableLookup::new(
                base_url.clone(),
                term.clone(),
                campus.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for timetable lookup")),
        }
    }
}

/// Register the timetable lookup with a registry
///
/// # Example
///
/// ```rust
/// use openseat_core::AdapterRegistry;
///
/// let registry = AdapterRegistry::new();
/// openseat_lookup_timetable::register(&registry);
/// assert!(registry.has_lookup("timetable"));
/// ```
pub fn register(registry: &AdapterRegistry) {
    registry.register_lookup("timetable", Box::new(TimetableFactory));
}
