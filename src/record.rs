//! Defensive field access over upstream records.
//!
//! Candidate and posting records come from an API the crate does not control:
//! any field may be missing, null, a bare string where an object was
//! expected, or the wrong type entirely. Every accessor here takes an
//! explicit fallback and degrades to it instead of panicking, so one dirty
//! record can never abort a scan. The matching engine and the display
//! summaries both read records exclusively through this module.

use serde::Serialize;
use serde_json::Value;

/// Read a string field, falling back when missing or non-string.
pub fn str_field<'a>(record: &'a Value, key: &str, default: &'a str) -> &'a str {
    record.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}

/// Read a list-of-strings field. Missing, null, or non-list values yield an
/// empty vector; non-string entries inside a list are skipped.
pub fn string_list(record: &Value, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// First entry of a list-of-strings field, or the fallback.
pub fn first_string<'a>(record: &'a Value, key: &str, default: &'a str) -> &'a str {
    record
        .get(key)
        .and_then(|v| v.as_array())
        .and_then(|items| items.first())
        .and_then(|item| item.as_str())
        .unwrap_or(default)
}

/// Read a field that may be either `{ "id": ..., "text": ... }` or a bare
/// string. Stage and posting references arrive in both shapes.
pub fn label_field(record: &Value, key: &str, default: &str) -> String {
    match record.get(key) {
        Some(Value::Object(map)) => map
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or(default)
            .to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

/// Identifier of a nested `{ "id": ... }` reference, or empty.
pub fn label_id(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.get("id"))
        .and_then(|id| id.as_str())
        .unwrap_or("")
        .to_string()
}

/// Format a millisecond-epoch timestamp field as `YYYY-MM-DD`.
pub fn millis_to_date(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.as_i64())
        .filter(|ms| *ms > 0)
        .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Format a millisecond-epoch timestamp field as `YYYY-MM-DD HH:MM`.
pub fn millis_to_datetime(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.as_i64())
        .filter(|ms| *ms > 0)
        .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// The location field may be a bare string or `{ "name": ... }`.
pub fn location_text(record: &Value) -> String {
    match record.get("location") {
        Some(Value::Object(map)) => map
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("Unknown")
            .to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "Unknown".to_string(),
    }
}

/// Comma-split, trimmed, lowercased segments of the headline field.
///
/// The headline informally encodes employment history as a comma-separated
/// company list; this is the unit the company matchers operate on.
pub fn headline_segments(record: &Value) -> Vec<String> {
    str_field(record, "headline", "")
        .split(',')
        .map(|segment| segment.trim().to_lowercase())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Lowercased tag list.
pub fn tags_lower(record: &Value) -> Vec<String> {
    string_list(record, "tags")
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect()
}

/// One lowercase haystack of name, emails, tags, and headline.
///
/// This is the field the skills matcher searches: skills show up anywhere in
/// a candidate's profile text, so the categories are concatenated rather
/// than matched individually.
pub fn searchable_text(record: &Value) -> String {
    let name = str_field(record, "name", "");
    let emails = string_list(record, "emails").join(" ");
    let tags = string_list(record, "tags").join(" ");
    let headline = str_field(record, "headline", "");
    format!("{} {} {} {}", name, emails, tags, headline).to_lowercase()
}

/// Compact candidate view returned by every search tool.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub stage: String,
    pub posting: String,
    pub location: String,
    /// Headline text — informal employment history.
    pub organizations: String,
    pub created: String,
    /// Which requested company matched this record, when the search was
    /// company-driven.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_company: Option<String>,
    /// `"internal"` or `"related"` for referral searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<String>,
}

impl CandidateSummary {
    pub fn from_value(record: &Value) -> Self {
        if !record.is_object() {
            // An entirely malformed record still yields a displayable row.
            return Self {
                id: String::new(),
                name: "Error: Invalid data".to_string(),
                email: "N/A".to_string(),
                stage: "Unknown".to_string(),
                posting: "Unknown".to_string(),
                location: "Unknown".to_string(),
                organizations: String::new(),
                created: "Unknown".to_string(),
                matched_company: None,
                relevance: None,
            };
        }

        Self {
            id: str_field(record, "id", "").to_string(),
            name: str_field(record, "name", "Unknown").to_string(),
            email: first_string(record, "emails", "N/A").to_string(),
            stage: label_field(record, "stage", "Unknown"),
            posting: label_field(record, "posting", "Unknown"),
            location: location_text(record),
            organizations: str_field(record, "headline", "").to_string(),
            created: millis_to_date(record, "createdAt"),
            matched_company: None,
            relevance: None,
        }
    }
}

/// Compact posting view for the role-listing tools.
#[derive(Debug, Clone, Serialize)]
pub struct PostingSummary {
    pub id: String,
    pub title: String,
    pub state: String,
    pub location: String,
    pub team: String,
    pub url: String,
}

impl PostingSummary {
    pub fn from_value(posting: &Value) -> Self {
        let url = posting
            .get("urls")
            .and_then(|u| u.get("show"))
            .and_then(|u| u.as_str())
            .unwrap_or("")
            .to_string();

        Self {
            id: str_field(posting, "id", "").to_string(),
            title: str_field(posting, "text", "Unknown").to_string(),
            state: str_field(posting, "state", "Unknown").to_string(),
            location: label_field_named(posting, "location", "name"),
            team: label_field_named(posting, "team", "text"),
            url,
        }
    }
}

fn label_field_named(record: &Value, key: &str, inner: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.get(inner))
        .and_then(|t| t.as_str())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_str_field_tolerates_missing_null_and_wrong_type() {
        let record = json!({ "name": "Ada", "headline": 42, "tags": null });
        assert_eq!(str_field(&record, "name", "x"), "Ada");
        assert_eq!(str_field(&record, "headline", "x"), "x");
        assert_eq!(str_field(&record, "tags", "x"), "x");
        assert_eq!(str_field(&record, "absent", "x"), "x");
    }

    #[test]
    fn test_string_list_skips_non_string_entries() {
        let record = json!({ "tags": ["a", 7, null, "b"] });
        assert_eq!(string_list(&record, "tags"), vec!["a", "b"]);
    }

    #[test]
    fn test_string_list_wrong_shape_is_empty() {
        assert!(string_list(&json!({ "tags": "oops" }), "tags").is_empty());
        assert!(string_list(&json!({}), "tags").is_empty());
        assert!(string_list(&json!(null), "tags").is_empty());
    }

    #[test]
    fn test_label_field_object_and_bare_string() {
        let with_object = json!({ "stage": { "id": "s1", "text": "Phone Screen" } });
        let with_string = json!({ "stage": "Onsite" });
        assert_eq!(label_field(&with_object, "stage", "Unknown"), "Phone Screen");
        assert_eq!(label_field(&with_string, "stage", "Unknown"), "Onsite");
        assert_eq!(label_field(&json!({}), "stage", "Unknown"), "Unknown");
        assert_eq!(label_id(&with_object, "stage"), "s1");
        assert_eq!(label_id(&with_string, "stage"), "");
    }

    #[test]
    fn test_location_both_shapes() {
        assert_eq!(location_text(&json!({ "location": "Berlin" })), "Berlin");
        assert_eq!(
            location_text(&json!({ "location": { "name": "Paris" } })),
            "Paris"
        );
        assert_eq!(location_text(&json!({ "location": 9 })), "Unknown");
    }

    #[test]
    fn test_headline_segments_split_and_normalized() {
        let record = json!({ "headline": "Google, Stripe ,  , Acme Corp" });
        assert_eq!(
            headline_segments(&record),
            vec!["google", "stripe", "acme corp"]
        );
        assert!(headline_segments(&json!({ "headline": 1 })).is_empty());
    }

    #[test]
    fn test_millis_to_date() {
        let record = json!({ "createdAt": 1700000000000i64 });
        assert_eq!(millis_to_date(&record, "createdAt"), "2023-11-14");
        assert_eq!(millis_to_date(&json!({}), "createdAt"), "Unknown");
        assert_eq!(
            millis_to_date(&json!({ "createdAt": "soon" }), "createdAt"),
            "Unknown"
        );
    }

    #[test]
    fn test_searchable_text_concatenates_lowercase() {
        let record = json!({
            "name": "Ada Lovelace",
            "emails": ["ada@example.com"],
            "tags": ["Python"],
            "headline": "Analytical Engines Inc"
        });
        let text = searchable_text(&record);
        assert!(text.contains("ada lovelace"));
        assert!(text.contains("ada@example.com"));
        assert!(text.contains("python"));
        assert!(text.contains("analytical engines inc"));
    }

    #[test]
    fn test_summary_from_non_object() {
        let summary = CandidateSummary::from_value(&json!("not a record"));
        assert_eq!(summary.name, "Error: Invalid data");
        assert!(summary.id.is_empty());
    }

    #[test]
    fn test_summary_from_full_record() {
        let record = json!({
            "id": "opp-1",
            "name": "Jon Smith",
            "emails": ["jon@example.com", "alt@example.com"],
            "stage": { "id": "s1", "text": "Phone Screen" },
            "location": "Berlin",
            "headline": "Google, Stripe",
            "createdAt": 1700000000000i64
        });
        let summary = CandidateSummary::from_value(&record);
        assert_eq!(summary.email, "jon@example.com");
        assert_eq!(summary.stage, "Phone Screen");
        assert_eq!(summary.posting, "Unknown");
        assert_eq!(summary.organizations, "Google, Stripe");
    }

    #[test]
    fn test_posting_summary() {
        let posting = json!({
            "id": "post-1",
            "text": "Senior Engineer",
            "state": "published",
            "location": { "name": "Remote" },
            "team": { "text": "Platform" },
            "urls": { "show": "https://jobs.example.com/post-1" }
        });
        let summary = PostingSummary::from_value(&posting);
        assert_eq!(summary.title, "Senior Engineer");
        assert_eq!(summary.location, "Remote");
        assert_eq!(summary.team, "Platform");
        assert_eq!(summary.url, "https://jobs.example.com/post-1");
    }
}
