//! Client-side search and matching engine.
//!
//! Lever's list endpoints have no free-text query support, so every search
//! here is a policy over repeated paginated fetches through
//! [`LeverClient`]: fetch a page, apply local predicates, accumulate, stop
//! when a result cap or a page budget is hit. Each variant carries its own
//! budget (see [`crate::config::SearchConfig`]).
//!
//! Two stop conditions are deliberately kept distinct in the result:
//! hitting the result cap is a success, while exhausting the page budget
//! before the cap is partial coverage and sets [`SearchOutcome::truncated`]
//! plus a warning note. Malformed records never abort a scan — every
//! predicate treats a missing or wrong-typed field as a non-match.

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;

use crate::client::{page_limit, LeverClient, OpportunityFilter};
use crate::config::Config;
use crate::record::{headline_segments, searchable_text, str_field, tags_lower, CandidateSummary};

/// Result envelope shared by all search variants.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub count: usize,
    pub candidates: Vec<CandidateSummary>,
    /// True when the page budget ran out before the result cap was reached.
    /// Distinct from an empty result: partial coverage, not absence.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SearchOutcome {
    fn new(candidates: Vec<CandidateSummary>) -> Self {
        Self {
            count: candidates.len(),
            candidates,
            truncated: false,
            note: None,
        }
    }

    fn truncated_with(mut self, note: impl Into<String>) -> Self {
        self.truncated = true;
        self.note = Some(note.into());
        self
    }
}

// ── Broad name / email search ────────────────────────────────────────────

/// Search candidates by email (server-side) or name substring (client-side
/// scan bounded by `broad_page_budget` pages). No query lists candidates.
pub async fn search_candidates(
    client: &LeverClient,
    config: &Config,
    query: Option<&str>,
    stage_id: Option<&str>,
    limit: usize,
) -> Result<SearchOutcome> {
    let stage = stage_id.map(|s| s.to_string());

    let query = query.map(str::trim).filter(|q| !q.is_empty());
    let Some(query) = query else {
        // No criteria: plain listing.
        let filter = OpportunityFilter::new()
            .stage(stage)
            .limit(page_limit(limit));
        let page = client.opportunities(&filter).await?;
        let summaries = summarize(&page.items, limit);
        return Ok(SearchOutcome::new(summaries));
    };

    if query.contains('@') {
        // Exact email lookup is the one search the upstream can do itself.
        let filter = OpportunityFilter::new()
            .stage(stage)
            .email(query)
            .limit(page_limit(limit));
        let page = client.opportunities(&filter).await?;
        return Ok(SearchOutcome::new(summarize(&page.items, limit)));
    }

    let query_lower = query.to_lowercase();
    let page_budget = config.search.broad_page_budget;
    let page_size = config.lever.page_size_max;

    let mut matched: Vec<Value> = Vec::new();
    let mut offset: Option<String> = None;
    let mut pages_checked = 0;
    let mut more_remaining = false;

    while pages_checked < page_budget && matched.len() < limit {
        let filter = OpportunityFilter::new()
            .stage(stage.clone())
            .limit(page_size)
            .offset(offset.clone());
        let page = client.opportunities(&filter).await?;
        if page.items.is_empty() {
            more_remaining = false;
            break;
        }

        for candidate in &page.items {
            if name_contains(candidate, &query_lower) {
                matched.push(candidate.clone());
                if matched.len() >= limit {
                    break;
                }
            }
        }

        pages_checked += 1;
        more_remaining = page.has_next;
        if !page.has_next {
            break;
        }
        offset = next_cursor(&page.items, page.next);
        if offset.is_none() {
            more_remaining = false;
            break;
        }
    }

    let outcome = SearchOutcome::new(summarize(&matched, limit));
    if more_remaining && outcome.count < limit {
        let scanned = pages_checked * page_size as usize;
        Ok(outcome.truncated_with(format!(
            "Search limited to first {} candidates. Results may be incomplete. \
             Try using email search or tags for better results.",
            scanned
        )))
    } else {
        Ok(outcome)
    }
}

// ── Quick find ───────────────────────────────────────────────────────────

/// Fast lookup of one candidate by name or email.
///
/// Name matching is bidirectional — the query containing the name or the
/// name containing the query both count — to tolerate partial or truncated
/// input on either side.
pub async fn quick_find(
    client: &LeverClient,
    config: &Config,
    name_or_email: &str,
) -> Result<SearchOutcome> {
    if name_or_email.contains('@') {
        let filter = OpportunityFilter::new().email(name_or_email).limit(10);
        let page = client.opportunities(&filter).await?;
        let mut outcome = SearchOutcome::new(summarize(&page.items, 10));
        outcome.note = Some("Matched by exact email filter.".to_string());
        return Ok(outcome);
    }

    let query_lower = name_or_email.to_lowercase();
    let page_budget = config.search.quick_find_page_budget;
    let result_cap = config.search.quick_find_limit;
    let page_size = config.lever.page_size_max;

    let mut matched: Vec<Value> = Vec::new();
    let mut offset: Option<String> = None;
    let mut pages_checked = 0;
    let mut candidates_checked = 0usize;
    let mut more_remaining = false;

    while pages_checked < page_budget {
        let filter = OpportunityFilter::new()
            .limit(page_size)
            .offset(offset.clone());
        let page = client.opportunities(&filter).await?;
        if page.items.is_empty() {
            more_remaining = false;
            break;
        }
        candidates_checked += page.items.len();

        for candidate in &page.items {
            if name_bidirectional(candidate, &query_lower) {
                matched.push(candidate.clone());
                if matched.len() >= result_cap {
                    break;
                }
            }
        }
        if matched.len() >= result_cap {
            more_remaining = false;
            break;
        }

        pages_checked += 1;
        more_remaining = page.has_next;
        if !page.has_next {
            break;
        }
        offset = next_cursor(&page.items, page.next);
        if offset.is_none() {
            more_remaining = false;
            break;
        }
    }

    let hit_cap = matched.len() >= result_cap;
    let mut outcome = SearchOutcome::new(summarize(&matched, result_cap));
    outcome.note = Some(format!(
        "Quick search checked first {} candidates. For comprehensive search, use email if available.",
        candidates_checked
    ));
    // Budget exhaustion without filling the cap is partial coverage;
    // filling the cap is a success even if more pages remained.
    outcome.truncated = more_remaining && !hit_cap;
    Ok(outcome)
}

// ── Posting-scoped search ────────────────────────────────────────────────

/// Find a candidate within one posting's applicant pool.
///
/// The pool is already narrowed server-side, so the record budget is much
/// larger than the broad scans. Matching is loose: the whole query or any
/// whitespace token of it appearing in the name counts.
pub async fn find_in_posting(
    client: &LeverClient,
    config: &Config,
    name: &str,
    posting_id: &str,
    stage_id: Option<&str>,
) -> Result<SearchOutcome> {
    let query_lower = name.to_lowercase();
    let record_budget = config.search.posting_scan_budget;
    let page_size = config.lever.page_size_max;

    let mut matched: Vec<Value> = Vec::new();
    let mut offset: Option<String> = None;
    let mut total_checked = 0usize;
    let mut more_remaining = false;

    while total_checked < record_budget {
        let filter = OpportunityFilter::new()
            .posting(Some(posting_id.to_string()))
            .stage(stage_id.map(|s| s.to_string()))
            .limit(page_size)
            .offset(offset.clone());
        let page = client.opportunities(&filter).await?;
        if page.items.is_empty() {
            more_remaining = false;
            break;
        }
        total_checked += page.items.len();

        for candidate in &page.items {
            if name_token_match(candidate, &query_lower) {
                matched.push(candidate.clone());
            }
        }

        more_remaining = page.has_next;
        if !page.has_next {
            break;
        }
        offset = next_cursor(&page.items, page.next);
        if offset.is_none() {
            more_remaining = false;
            break;
        }
    }

    let mut outcome = SearchOutcome::new(summarize(&matched, usize::MAX));
    outcome.truncated = more_remaining;
    if outcome.count == 0 && total_checked > 0 {
        outcome.note = Some(format!(
            "No matches found for '{}' among {} candidates in this posting",
            name, total_checked
        ));
    } else if more_remaining {
        outcome.note = Some(format!(
            "Scanned {} candidates in this posting; more remain beyond the scan budget.",
            total_checked
        ));
    }
    Ok(outcome)
}

// ── Multi-criteria search ────────────────────────────────────────────────

/// Parsed multi-criteria filter: AND across categories, OR within each.
///
/// An empty category is vacuously true. Terms are the lowercased,
/// comma-split pieces of the raw input.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    pub companies: Vec<String>,
    pub skills: Vec<String>,
    pub locations: Vec<String>,
    pub tags: Vec<String>,
    pub stage_id: Option<String>,
    pub posting_id: Option<String>,
}

impl Criteria {
    pub fn parse(
        companies: Option<&str>,
        skills: Option<&str>,
        locations: Option<&str>,
        tags: Option<&str>,
    ) -> Self {
        Self {
            companies: split_terms(companies),
            skills: split_terms(skills),
            locations: split_terms(locations),
            tags: split_terms(tags),
            stage_id: None,
            posting_id: None,
        }
    }

    /// Whether any category requires client-side filtering. When true most
    /// fetched records will be discarded, so the fetch budget is scaled up.
    pub fn needs_local_filter(&self) -> bool {
        !self.companies.is_empty() || !self.skills.is_empty() || !self.locations.is_empty()
    }

    /// Conjunctive-disjunctive match: every non-empty category must have at
    /// least one matching term. Total over malformed records.
    pub fn matches(&self, record: &Value) -> bool {
        let headline = str_field(record, "headline", "").to_lowercase();
        let location = crate::record::location_text(record).to_lowercase();
        let tags = tags_lower(record);
        let haystack = searchable_text(record);

        let company_ok = self.companies.is_empty()
            || self.companies.iter().any(|c| headline.contains(c.as_str()));
        let skill_ok =
            self.skills.is_empty() || self.skills.iter().any(|s| haystack.contains(s.as_str()));
        let location_ok = self.locations.is_empty()
            || self.locations.iter().any(|l| location.contains(l.as_str()));
        let tag_ok =
            self.tags.is_empty() || self.tags.iter().any(|t| tags.contains(t));

        company_ok && skill_ok && location_ok && tag_ok
    }
}

/// Multi-criteria boolean search over the candidate pool.
pub async fn advanced_search(
    client: &LeverClient,
    config: &Config,
    criteria: &Criteria,
    limit: usize,
) -> Result<SearchOutcome> {
    let page_size = config.lever.page_size_max;
    let fetch_budget = if criteria.needs_local_filter() {
        limit.saturating_mul(config.search.filtered_fetch_multiplier)
    } else {
        limit
    };

    // The upstream accepts a single tag filter; send the first term as a
    // server-side pre-narrow and keep the full OR check client-side.
    let server_tag = criteria.tags.first().cloned();

    let mut kept: Vec<Value> = Vec::new();
    let mut offset: Option<String> = None;
    let mut more_remaining = false;

    while kept.len() < fetch_budget {
        let filter = OpportunityFilter::new()
            .stage(criteria.stage_id.clone())
            .posting(criteria.posting_id.clone())
            .tag(server_tag.clone())
            .limit(page_size)
            .offset(offset.clone());
        let page = client.opportunities(&filter).await?;
        if page.items.is_empty() {
            more_remaining = false;
            break;
        }

        for candidate in &page.items {
            if criteria.matches(candidate) {
                kept.push(candidate.clone());
            }
        }

        more_remaining = page.has_next;
        if !page.has_next {
            break;
        }
        offset = next_cursor(&page.items, page.next);
        if offset.is_none() {
            more_remaining = false;
            break;
        }
    }

    let hit_cap = kept.len() >= limit;
    let outcome = SearchOutcome::new(summarize(&kept, limit));
    if more_remaining && !hit_cap {
        Ok(outcome.truncated_with(
            "Fetch budget exhausted before the result cap; matching candidates \
             may remain in unscanned pages."
                .to_string(),
        ))
    } else {
        Ok(outcome)
    }
}

// ── Company-history search ───────────────────────────────────────────────

/// Find candidates who work or worked at the requested companies.
///
/// Each company runs as an independent sub-search whose sample is verified
/// locally against the comma-split headline segments (bidirectional
/// substring per segment) or the tag list. Results are de-duplicated by
/// record id — a record matching two companies appears once, tagged with
/// the first company that matched it.
pub async fn find_by_company(
    client: &LeverClient,
    config: &Config,
    companies: &str,
    limit: usize,
) -> Result<SearchOutcome> {
    let company_list: Vec<String> = companies
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if company_list.is_empty() {
        bail!("companies must not be empty");
    }

    let sample_size = page_limit(limit).min(config.lever.page_size_max);
    let mut samples: Vec<(String, Vec<Value>)> = Vec::new();
    for company in &company_list {
        // No server-side company filter exists; each sub-search samples the
        // head of the pool and verifies locally.
        let filter = OpportunityFilter::new().limit(sample_size);
        let page = client.opportunities(&filter).await?;
        samples.push((company.clone(), page.items));
    }

    let candidates = select_company_matches(&samples, limit);
    let mut outcome = SearchOutcome {
        count: candidates.len(),
        candidates,
        truncated: false,
        note: None,
    };
    if outcome.count == 0 {
        outcome.note = Some(format!(
            "No candidates matched companies: {}",
            company_list.join(", ")
        ));
    }
    Ok(outcome)
}

/// Local verification, tagging, and de-duplication for company sub-searches.
pub fn select_company_matches(
    samples: &[(String, Vec<Value>)],
    limit: usize,
) -> Vec<CandidateSummary> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<CandidateSummary> = Vec::new();

    for (company, records) in samples {
        let company_lower = company.to_lowercase();
        for record in records {
            if !company_in_record(record, &company_lower) {
                continue;
            }
            let id = str_field(record, "id", "").to_string();
            if !id.is_empty() && !seen.insert(id) {
                continue;
            }
            let mut summary = CandidateSummary::from_value(record);
            summary.matched_company = Some(company.clone());
            out.push(summary);
            if out.len() >= limit {
                return out;
            }
        }
    }
    out
}

/// Does the record's history or tag list mention the company?
///
/// Headline segments match bidirectionally ("Google" matches "Google Cloud"
/// and vice versa); tags match by containment.
fn company_in_record(record: &Value, company_lower: &str) -> bool {
    let in_headline = headline_segments(record)
        .iter()
        .any(|segment| segment.contains(company_lower) || company_lower.contains(segment.as_str()));
    if in_headline {
        return true;
    }
    tags_lower(record)
        .iter()
        .any(|tag| tag.contains(company_lower))
}

// ── Internal-referral heuristic ──────────────────────────────────────────

/// Why a record was kept by the referral search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    /// Tagged or described as a current employee / referral source.
    Internal,
    /// Team or role keywords from the posting appear in their history.
    Related,
}

impl Relevance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relevance::Internal => "internal",
            Relevance::Related => "related",
        }
    }
}

/// Find internal employees who could refer candidates for a posting.
pub async fn find_referrals(
    client: &LeverClient,
    config: &Config,
    posting_id: &str,
    limit: usize,
) -> Result<SearchOutcome> {
    let postings = client.postings("published", 100, None).await?;
    let target = postings
        .items
        .iter()
        .find(|p| str_field(p, "id", "") == posting_id);
    let Some(target) = target else {
        bail!("posting not found: {}", posting_id);
    };

    let title = str_field(target, "text", "").to_string();
    let team = crate::record::label_field(target, "team", "");

    // Sample twice the cap; classification discards most records.
    let sample_size = limit
        .saturating_mul(2)
        .min(config.lever.page_size_max as usize);
    let filter = OpportunityFilter::new().limit(page_limit(sample_size));
    let page = client.opportunities(&filter).await?;

    let title_keywords = role_keywords(&title);
    let team_lower = team.to_lowercase();

    let mut kept: Vec<CandidateSummary> = Vec::new();
    for record in &page.items {
        if let Some(relevance) = classify_referral(record, &title_keywords, &team_lower) {
            let mut summary = CandidateSummary::from_value(record);
            summary.relevance = Some(relevance.as_str().to_string());
            kept.push(summary);
            if kept.len() >= limit {
                break;
            }
        }
    }

    let mut outcome = SearchOutcome::new(kept);
    outcome.note = Some(format!("role: {} / team: {}", title, team));
    Ok(outcome)
}

/// Classify a record for the referral heuristic.
///
/// Internal status takes precedence over role relatedness when both hold.
/// Empty team names and short stop-words never match anything.
pub fn classify_referral(
    record: &Value,
    title_keywords: &[String],
    team_lower: &str,
) -> Option<Relevance> {
    let tags = tags_lower(record);
    let headline = str_field(record, "headline", "").to_lowercase();

    let is_internal = tags.iter().any(|t| t == "employee" || t == "internal")
        || tags.iter().any(|t| t.contains("referral"))
        || headline.contains("current");
    if is_internal {
        return Some(Relevance::Internal);
    }

    let joined_tags = tags.join(" ");
    let team_related = !team_lower.is_empty()
        && (headline.contains(team_lower) || joined_tags.contains(team_lower));
    let title_related = title_keywords
        .iter()
        .any(|keyword| headline.contains(keyword.as_str()));

    if team_related || title_related {
        Some(Relevance::Related)
    } else {
        None
    }
}

/// Keywords worth matching from a posting title — lowercased words longer
/// than three characters, so "of" and "and" never fire.
pub fn role_keywords(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() > 3)
        .map(|word| word.to_string())
        .collect()
}

// ── Shared helpers ───────────────────────────────────────────────────────

/// Split a comma-separated input into lowercase trimmed terms.
pub fn split_terms(input: Option<&str>) -> Vec<String> {
    input
        .map(|raw| {
            raw.split(',')
                .map(|term| term.trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn name_contains(record: &Value, query_lower: &str) -> bool {
    str_field(record, "name", "")
        .to_lowercase()
        .contains(query_lower)
}

/// Bidirectional containment: "Jon" matches "Jonathan Smith", and
/// "Jonathan Alexander Smith" matches "Jon Smith".
fn name_bidirectional(record: &Value, query_lower: &str) -> bool {
    let name = str_field(record, "name", "").to_lowercase();
    if name.is_empty() {
        return false;
    }
    name.contains(query_lower) || query_lower.contains(&name)
}

fn name_token_match(record: &Value, query_lower: &str) -> bool {
    let name = str_field(record, "name", "").to_lowercase();
    if name.is_empty() {
        return false;
    }
    name.contains(query_lower)
        || query_lower
            .split_whitespace()
            .any(|part| name.contains(part))
}

/// Cursor advancement: prefer the envelope's `next`, fall back to the last
/// item's id.
fn next_cursor(items: &[Value], next: Option<String>) -> Option<String> {
    next.or_else(|| {
        items
            .last()
            .and_then(|item| item.get("id"))
            .and_then(|id| id.as_str())
            .map(|id| id.to_string())
    })
}

fn summarize(records: &[Value], limit: usize) -> Vec<CandidateSummary> {
    records
        .iter()
        .take(limit)
        .map(CandidateSummary::from_value)
        .collect()
}
