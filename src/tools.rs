//! Tool registry and the built-in Lever tools.
//!
//! Every tool is exposed three ways with identical behavior: the HTTP API
//! (`POST /tools/{name}`), the MCP JSON-RPC endpoint, and the CLI. A tool
//! receives validated JSON parameters plus a [`ToolContext`] holding the
//! shared rate-limited client, and returns a JSON value.
//!
//! Parameter validation happens once at the dispatch boundary
//! ([`validate_params`]): required fields, type compatibility, enum
//! constraints, and default injection. Tool `execute` bodies can therefore
//! read parameters loosely.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{page_limit, LeverClient, OpportunityFilter};
use crate::config::Config;
use crate::record::{
    label_field, label_id, location_text, millis_to_date, millis_to_datetime, str_field,
    string_list, CandidateSummary, PostingSummary,
};
use crate::search::{self, Criteria};

/// An MCP tool that agents can discover and call.
///
/// Tools are registered at startup and exposed via `GET /tools/list` for
/// discovery, `POST /tools/{name}` and the MCP `call_tool` method for
/// invocation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, used as the route path and the MCP tool identifier.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// OpenAI function-calling JSON Schema for parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with validated parameters.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Shared state handed to every tool invocation.
///
/// The client is built once at startup so its permit pool throttles the
/// whole process, not one request.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<Config>,
    pub client: Arc<LeverClient>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>, client: Arc<LeverClient>) -> Self {
        Self { config, client }
    }
}

/// Serializable tool descriptor for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of all tools served by this process.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with every built-in Lever tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchCandidatesTool));
        registry.register(Box::new(QuickFindCandidateTool));
        registry.register(Box::new(FindCandidateInPostingTool));
        registry.register(Box::new(GetCandidateTool));
        registry.register(Box::new(AddNoteTool));
        registry.register(Box::new(ListOpenRolesTool));
        registry.register(Box::new(FindCandidatesForRoleTool));
        registry.register(Box::new(ArchiveCandidateTool));
        registry.register(Box::new(GetStagesTool));
        registry.register(Box::new(GetArchiveReasonsTool));
        registry.register(Box::new(AdvancedSearchTool));
        registry.register(Box::new(FindByCompanyTool));
        registry.register(Box::new(FindInternalReferralsTool));
        registry.register(Box::new(ListFilesTool));
        registry.register(Box::new(ListApplicationsTool));
        registry.register(Box::new(GetApplicationTool));
        registry.register(Box::new(CreateApplicationTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter Validation
// ═══════════════════════════════════════════════════════════════════════

/// Validate incoming JSON parameters against a tool's schema.
///
/// Checks required fields, type compatibility, and enum constraints.
/// Injects default values for missing optional fields. Returns the
/// validated (and potentially enriched) parameters.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = params
        .as_object()
        .unwrap_or(&serde_json::Map::new())
        .clone();

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<String> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let mut result = params_obj.clone();

    for req_field in &required {
        if !params_obj.contains_key(req_field) {
            bail!("missing required parameter: {}", req_field);
        }
    }

    for (prop_name, prop_schema) in &properties {
        if let Some(value) = params_obj.get(prop_name) {
            if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        prop_name,
                        expected_type,
                        json_type_name(value)
                    );
                }
            }

            if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !enum_values.contains(value) {
                    let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                    bail!(
                        "parameter '{}' must be one of [{}], got {}",
                        prop_name,
                        allowed.join(", "),
                        value
                    );
                }
            }
        } else if let Some(default) = prop_schema.get("default") {
            result.insert(prop_name.clone(), default.clone());
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter helpers
// ═══════════════════════════════════════════════════════════════════════

fn opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    opt_str(params, key).ok_or_else(|| anyhow!("{} must not be empty", key))
}

fn limit_param(params: &Value, default: usize) -> usize {
    params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn outcome_json(outcome: &search::SearchOutcome, extra: &[(&str, Value)]) -> Result<Value> {
    let mut body = serde_json::to_value(outcome)?;
    if let Some(map) = body.as_object_mut() {
        for (key, value) in extra {
            map.insert(key.to_string(), value.clone());
        }
    }
    Ok(body)
}

// ═══════════════════════════════════════════════════════════════════════
// Search tools
// ═══════════════════════════════════════════════════════════════════════

/// Broad candidate search by name, email, or stage.
pub struct SearchCandidatesTool;

#[async_trait]
impl Tool for SearchCandidatesTool {
    fn name(&self) -> &str {
        "lever_search_candidates"
    }

    fn description(&self) -> &str {
        "Search candidates by name or email. Name searches scan a bounded number of pages; email searches are exact."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Name fragment or email address" },
                "stage": { "type": "string", "description": "Stage id to filter by" },
                "limit": { "type": "integer", "description": "Max results", "default": 10 }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = opt_str(&params, "query");
        let stage = opt_str(&params, "stage");
        let limit = limit_param(&params, 10);

        let outcome =
            search::search_candidates(&ctx.client, &ctx.config, query, stage, limit).await?;
        outcome_json(
            &outcome,
            &[("query", json!(query.unwrap_or("")))],
        )
    }
}

/// Fast single-candidate lookup with bidirectional name matching.
pub struct QuickFindCandidateTool;

#[async_trait]
impl Tool for QuickFindCandidateTool {
    fn name(&self) -> &str {
        "lever_quick_find_candidate"
    }

    fn description(&self) -> &str {
        "Quickly find a specific candidate by name or email. Checks only the first few pages; prefer email when known."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name_or_email": { "type": "string", "description": "Candidate name or email" }
            },
            "required": ["name_or_email"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let name_or_email = required_str(&params, "name_or_email")?;
        let outcome = search::quick_find(&ctx.client, &ctx.config, name_or_email).await?;
        outcome_json(&outcome, &[("query", json!(name_or_email))])
    }
}

/// Posting-scoped candidate lookup.
pub struct FindCandidateInPostingTool;

#[async_trait]
impl Tool for FindCandidateInPostingTool {
    fn name(&self) -> &str {
        "lever_find_candidate_in_posting"
    }

    fn description(&self) -> &str {
        "Find a candidate by name within a specific job posting's applicant pool."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Candidate name" },
                "posting_id": { "type": "string", "description": "Posting id to scope the search" },
                "stage": { "type": "string", "description": "Stage id to filter by" }
            },
            "required": ["name", "posting_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let name = required_str(&params, "name")?;
        let posting_id = required_str(&params, "posting_id")?;
        let stage = opt_str(&params, "stage");

        let outcome =
            search::find_in_posting(&ctx.client, &ctx.config, name, posting_id, stage).await?;
        outcome_json(
            &outcome,
            &[
                ("query", json!(name)),
                ("posting_id", json!(posting_id)),
            ],
        )
    }
}

/// Multi-criteria boolean search.
pub struct AdvancedSearchTool;

#[async_trait]
impl Tool for AdvancedSearchTool {
    fn name(&self) -> &str {
        "lever_advanced_search"
    }

    fn description(&self) -> &str {
        "Search candidates by companies, skills, locations, and tags. Categories combine with AND; terms within a category with OR."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "companies": { "type": "string", "description": "Comma-separated company names" },
                "skills": { "type": "string", "description": "Comma-separated skills" },
                "locations": { "type": "string", "description": "Comma-separated locations" },
                "tags": { "type": "string", "description": "Comma-separated tags (exact membership)" },
                "stage": { "type": "string", "description": "Stage id to filter by" },
                "posting_id": { "type": "string", "description": "Posting id to scope the search" },
                "limit": { "type": "integer", "description": "Max results", "default": 20 }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let mut criteria = Criteria::parse(
            opt_str(&params, "companies"),
            opt_str(&params, "skills"),
            opt_str(&params, "locations"),
            opt_str(&params, "tags"),
        );
        criteria.stage_id = opt_str(&params, "stage").map(|s| s.to_string());
        criteria.posting_id = opt_str(&params, "posting_id").map(|s| s.to_string());
        let limit = limit_param(&params, 20);

        let outcome = search::advanced_search(&ctx.client, &ctx.config, &criteria, limit).await?;
        outcome_json(
            &outcome,
            &[(
                "criteria",
                json!({
                    "companies": criteria.companies,
                    "skills": criteria.skills,
                    "locations": criteria.locations,
                    "tags": criteria.tags,
                }),
            )],
        )
    }
}

/// Company-history search.
pub struct FindByCompanyTool;

#[async_trait]
impl Tool for FindByCompanyTool {
    fn name(&self) -> &str {
        "lever_find_by_company"
    }

    fn description(&self) -> &str {
        "Find candidates who work or worked at the given companies."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "companies": { "type": "string", "description": "Comma-separated company names" },
                "limit": { "type": "integer", "description": "Max results", "default": 20 }
            },
            "required": ["companies"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let companies = required_str(&params, "companies")?;
        let limit = limit_param(&params, 20);

        let outcome = search::find_by_company(&ctx.client, &ctx.config, companies, limit).await?;
        outcome_json(&outcome, &[("companies", json!(companies))])
    }
}

/// Internal-referral discovery for a posting.
pub struct FindInternalReferralsTool;

#[async_trait]
impl Tool for FindInternalReferralsTool {
    fn name(&self) -> &str {
        "lever_find_internal_referrals_for_role"
    }

    fn description(&self) -> &str {
        "Find internal employees who could refer candidates for a specific role."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "posting_id": { "type": "string", "description": "Posting id of the target role" },
                "limit": { "type": "integer", "description": "Max results", "default": 20 }
            },
            "required": ["posting_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let posting_id = required_str(&params, "posting_id")?;
        let limit = limit_param(&params, 20);

        let outcome = search::find_referrals(&ctx.client, &ctx.config, posting_id, limit).await?;
        outcome_json(&outcome, &[("posting_id", json!(posting_id))])
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Candidate tools
// ═══════════════════════════════════════════════════════════════════════

/// Full candidate profile by id.
pub struct GetCandidateTool;

#[async_trait]
impl Tool for GetCandidateTool {
    fn name(&self) -> &str {
        "lever_get_candidate"
    }

    fn description(&self) -> &str {
        "Get a candidate's full profile by opportunity id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "opportunity_id": { "type": "string", "description": "Opportunity id" }
            },
            "required": ["opportunity_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let opportunity_id = required_str(&params, "opportunity_id")?;
        let record = ctx.client.opportunity(opportunity_id).await?;
        Ok(candidate_detail(&record))
    }
}

/// Expanded profile view for a single candidate record.
fn candidate_detail(record: &Value) -> Value {
    let phones: Vec<String> = record
        .get("phones")
        .and_then(|p| p.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("value").and_then(|v| v.as_str()))
                .map(|v| v.to_string())
                .collect()
        })
        .unwrap_or_default();

    json!({
        "id": str_field(record, "id", ""),
        "name": str_field(record, "name", "Unknown"),
        "emails": string_list(record, "emails"),
        "phones": phones,
        "stage": label_field(record, "stage", "Unknown"),
        "stage_id": label_id(record, "stage"),
        "posting": label_field(record, "posting", "Unknown"),
        "location": location_text(record),
        "organizations": str_field(record, "headline", ""),
        "tags": string_list(record, "tags"),
        "sources": string_list(record, "sources"),
        "origin": str_field(record, "origin", "Unknown"),
        "created": millis_to_datetime(record, "createdAt"),
        "updated": millis_to_datetime(record, "updatedAt"),
        "links": string_list(record, "links"),
    })
}

/// Append a note to a candidate's profile.
pub struct AddNoteTool;

#[async_trait]
impl Tool for AddNoteTool {
    fn name(&self) -> &str {
        "lever_add_note"
    }

    fn description(&self) -> &str {
        "Add a note to a candidate's profile."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "opportunity_id": { "type": "string", "description": "Opportunity id" },
                "note": { "type": "string", "description": "Note text" },
                "author_email": { "type": "string", "description": "Attribute the note to this user" }
            },
            "required": ["opportunity_id", "note"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let opportunity_id = required_str(&params, "opportunity_id")?;
        let note = required_str(&params, "note")?;
        let author = opt_str(&params, "author_email");

        let response = ctx.client.add_note(opportunity_id, note, author).await?;
        Ok(json!({
            "status": "added",
            "opportunity_id": opportunity_id,
            "note_id": response
                .get("data")
                .and_then(|d| d.get("id"))
                .and_then(|id| id.as_str())
                .unwrap_or(""),
        }))
    }
}

/// Archive a candidate with a reason.
pub struct ArchiveCandidateTool;

#[async_trait]
impl Tool for ArchiveCandidateTool {
    fn name(&self) -> &str {
        "lever_archive_candidate"
    }

    fn description(&self) -> &str {
        "Archive a candidate with an archive reason. Use lever_get_archive_reasons to list valid reason ids."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "opportunity_id": { "type": "string", "description": "Opportunity id" },
                "reason_id": { "type": "string", "description": "Archive reason id" }
            },
            "required": ["opportunity_id", "reason_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let opportunity_id = required_str(&params, "opportunity_id")?;
        let reason_id = required_str(&params, "reason_id")?;

        ctx.client.archive(opportunity_id, reason_id).await?;
        Ok(json!({
            "status": "archived",
            "opportunity_id": opportunity_id,
            "reason_id": reason_id,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Posting and pipeline tools
// ═══════════════════════════════════════════════════════════════════════

/// List published job postings.
pub struct ListOpenRolesTool;

#[async_trait]
impl Tool for ListOpenRolesTool {
    fn name(&self) -> &str {
        "lever_list_open_roles"
    }

    fn description(&self) -> &str {
        "List currently published job postings."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "description": "Max postings", "default": 25 }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let limit = limit_param(&params, 25);
        let page = ctx
            .client
            .postings("published", page_limit(limit), None)
            .await?;
        let roles: Vec<PostingSummary> = page
            .items
            .iter()
            .take(limit)
            .map(PostingSummary::from_value)
            .collect();
        Ok(json!({ "count": roles.len(), "roles": roles }))
    }
}

/// List candidates attached to one posting.
pub struct FindCandidatesForRoleTool;

#[async_trait]
impl Tool for FindCandidatesForRoleTool {
    fn name(&self) -> &str {
        "lever_find_candidates_for_role"
    }

    fn description(&self) -> &str {
        "List candidates who applied to a specific job posting."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "posting_id": { "type": "string", "description": "Posting id" },
                "stage": { "type": "string", "description": "Stage id to filter by" },
                "limit": { "type": "integer", "description": "Max results", "default": 25 }
            },
            "required": ["posting_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let posting_id = required_str(&params, "posting_id")?;
        let stage = opt_str(&params, "stage");
        let limit = limit_param(&params, 25);

        let filter = OpportunityFilter::new()
            .posting(Some(posting_id.to_string()))
            .stage(stage.map(|s| s.to_string()))
            .limit(page_limit(limit));
        let page = ctx.client.opportunities(&filter).await?;
        let candidates: Vec<CandidateSummary> = page
            .items
            .iter()
            .take(limit)
            .map(CandidateSummary::from_value)
            .collect();

        // Pipeline breakdown: how many of the returned candidates sit in
        // each stage.
        let mut by_stage: std::collections::BTreeMap<String, usize> =
            std::collections::BTreeMap::new();
        for candidate in &candidates {
            *by_stage.entry(candidate.stage.clone()).or_insert(0) += 1;
        }

        Ok(json!({
            "count": candidates.len(),
            "posting_id": posting_id,
            "by_stage": by_stage,
            "candidates": candidates,
        }))
    }
}

/// List pipeline stages.
pub struct GetStagesTool;

#[async_trait]
impl Tool for GetStagesTool {
    fn name(&self) -> &str {
        "lever_get_stages"
    }

    fn description(&self) -> &str {
        "List all pipeline stages with their ids."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let page = ctx.client.stages().await?;
        let stages: Vec<Value> = page
            .items
            .iter()
            .map(|s| {
                json!({
                    "id": str_field(s, "id", ""),
                    "text": str_field(s, "text", "Unknown"),
                })
            })
            .collect();
        Ok(json!({ "count": stages.len(), "stages": stages }))
    }
}

/// List archive reasons.
pub struct GetArchiveReasonsTool;

#[async_trait]
impl Tool for GetArchiveReasonsTool {
    fn name(&self) -> &str {
        "lever_get_archive_reasons"
    }

    fn description(&self) -> &str {
        "List all archive reasons with their ids."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let page = ctx.client.archive_reasons().await?;
        let reasons: Vec<Value> = page
            .items
            .iter()
            .map(|r| {
                json!({
                    "id": str_field(r, "id", ""),
                    "text": str_field(r, "text", "Unknown"),
                })
            })
            .collect();
        Ok(json!({ "count": reasons.len(), "reasons": reasons }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// File and application tools
// ═══════════════════════════════════════════════════════════════════════

/// List files and resumes attached to a candidate.
pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "lever_list_files"
    }

    fn description(&self) -> &str {
        "List files and resumes attached to a candidate."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "opportunity_id": { "type": "string", "description": "Opportunity id" }
            },
            "required": ["opportunity_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let opportunity_id = required_str(&params, "opportunity_id")?;

        let describe = |item: &Value, kind: &str| {
            json!({
                "id": str_field(item, "id", ""),
                "name": str_field(item, "name", "unnamed"),
                "kind": kind,
                "ext": str_field(item, "ext", ""),
                "size": item.get("size").and_then(|s| s.as_u64()).unwrap_or(0),
                "uploaded": millis_to_date(item, "uploadedAt"),
            })
        };

        // One side failing must not hide the other; the failure is
        // reported in the note instead.
        let mut listed: Vec<Value> = Vec::new();
        let mut notes: Vec<String> = Vec::new();
        match ctx.client.files(opportunity_id).await {
            Ok(page) => listed.extend(page.items.iter().map(|f| describe(f, "file"))),
            Err(e) => notes.push(format!("files unavailable: {}", e)),
        }
        match ctx.client.resumes(opportunity_id).await {
            Ok(page) => listed.extend(page.items.iter().map(|r| describe(r, "resume"))),
            Err(e) => notes.push(format!("resumes unavailable: {}", e)),
        }

        let mut body = json!({
            "count": listed.len(),
            "opportunity_id": opportunity_id,
            "files": listed,
        });
        if !notes.is_empty() {
            body["note"] = json!(notes.join("; "));
        }
        Ok(body)
    }
}

/// List a candidate's applications.
pub struct ListApplicationsTool;

#[async_trait]
impl Tool for ListApplicationsTool {
    fn name(&self) -> &str {
        "lever_list_applications"
    }

    fn description(&self) -> &str {
        "List all applications on a candidate's profile."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "opportunity_id": { "type": "string", "description": "Opportunity id" }
            },
            "required": ["opportunity_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let opportunity_id = required_str(&params, "opportunity_id")?;
        let page = ctx.client.applications(opportunity_id).await?;
        let applications: Vec<Value> = page
            .items
            .iter()
            .map(|a| {
                json!({
                    "id": str_field(a, "id", ""),
                    "type": str_field(a, "type", "Unknown"),
                    "posting": label_field(a, "posting", "Unknown"),
                    "created": millis_to_date(a, "createdAt"),
                })
            })
            .collect();
        Ok(json!({
            "count": applications.len(),
            "opportunity_id": opportunity_id,
            "applications": applications,
        }))
    }
}

/// Fetch a single application.
pub struct GetApplicationTool;

#[async_trait]
impl Tool for GetApplicationTool {
    fn name(&self) -> &str {
        "lever_get_application"
    }

    fn description(&self) -> &str {
        "Get details of a specific application on a candidate's profile."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "opportunity_id": { "type": "string", "description": "Opportunity id" },
                "application_id": { "type": "string", "description": "Application id" }
            },
            "required": ["opportunity_id", "application_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let opportunity_id = required_str(&params, "opportunity_id")?;
        let application_id = required_str(&params, "application_id")?;
        let application = ctx
            .client
            .application(opportunity_id, application_id)
            .await?;
        Ok(application)
    }
}

/// Apply a candidate to a posting.
pub struct CreateApplicationTool;

#[async_trait]
impl Tool for CreateApplicationTool {
    fn name(&self) -> &str {
        "lever_create_application"
    }

    fn description(&self) -> &str {
        "Create an application for a candidate to a specific posting."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "opportunity_id": { "type": "string", "description": "Opportunity id" },
                "posting_id": { "type": "string", "description": "Posting id to apply to" },
                "user_id": { "type": "string", "description": "Perform the action on behalf of this user" }
            },
            "required": ["opportunity_id", "posting_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let opportunity_id = required_str(&params, "opportunity_id")?;
        let posting_id = required_str(&params, "posting_id")?;
        let user_id = opt_str(&params, "user_id");

        let created = ctx
            .client
            .create_application(opportunity_id, posting_id, user_id)
            .await?;
        Ok(json!({
            "status": "created",
            "opportunity_id": opportunity_id,
            "posting_id": posting_id,
            "application": created,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_all_builtins() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 17);
        assert!(registry.find("lever_search_candidates").is_some());
        assert!(registry.find("lever_create_application").is_some());
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn test_schemas_are_object_schemas() {
        let registry = ToolRegistry::with_builtins();
        for tool in registry.tools() {
            let schema = tool.parameters_schema();
            assert_eq!(
                schema.get("type").and_then(|t| t.as_str()),
                Some("object"),
                "{} schema must be an object schema",
                tool.name()
            );
        }
    }

    #[test]
    fn test_validate_params_required() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        assert!(validate_params(&schema, &json!({})).is_err());
        assert!(validate_params(&schema, &json!({ "name": "a" })).is_ok());
    }

    #[test]
    fn test_validate_params_type_check() {
        let schema = json!({
            "type": "object",
            "properties": { "limit": { "type": "integer" } }
        });
        let err = validate_params(&schema, &json!({ "limit": "ten" })).unwrap_err();
        assert!(err.to_string().contains("must be of type 'integer'"));
    }

    #[test]
    fn test_validate_params_injects_defaults() {
        let schema = json!({
            "type": "object",
            "properties": { "limit": { "type": "integer", "default": 10 } }
        });
        let validated = validate_params(&schema, &json!({})).unwrap();
        assert_eq!(validated["limit"], json!(10));
    }

    #[test]
    fn test_validate_params_enum() {
        let schema = json!({
            "type": "object",
            "properties": { "state": { "type": "string", "enum": ["published", "closed"] } }
        });
        assert!(validate_params(&schema, &json!({ "state": "published" })).is_ok());
        assert!(validate_params(&schema, &json!({ "state": "open" })).is_err());
    }

    #[test]
    fn test_limit_param_ignores_zero_and_junk() {
        assert_eq!(limit_param(&json!({ "limit": 5 }), 10), 5);
        assert_eq!(limit_param(&json!({ "limit": 0 }), 10), 10);
        assert_eq!(limit_param(&json!({ "limit": "five" }), 10), 10);
        assert_eq!(limit_param(&json!({}), 10), 10);
    }

    #[test]
    fn test_candidate_detail_defensive() {
        let detail = candidate_detail(&json!({ "id": "x", "phones": [{ "value": "555" }, {}] }));
        assert_eq!(detail["phones"], json!(["555"]));
        assert_eq!(detail["name"], json!("Unknown"));
        assert_eq!(detail["created"], json!("Unknown"));
    }
}
