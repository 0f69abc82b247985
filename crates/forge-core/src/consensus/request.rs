use crate::error::{ForgeError, Result};
use crate::project::ForgeProject;
use crate::quality::features::lookup;
use crate::types::Stage;
use model_client::ModelRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SYSTEM_PROMPT: &str = "You are a senior software architect. Recommend one architecture for \
the product described by the user. Reply with a single JSON object and nothing else, shaped as:\n\
{\"style\": string, \"components\": [{\"name\": string, \"kind\": string}], \
\"risks\": [{\"category\": string, \"description\": string}], \
\"rationale\": string, \"score\": number between 0 and 1 rating your confidence}\n\
Use one of these risk categories: security, scalability, performance, reliability, cost, \
complexity, compliance, vendor_lock_in, data, other.";

/// What the providers are asked to design for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub functional: Vec<String>,
    #[serde(default)]
    pub non_functional: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl ArchitectureRequirements {
    /// Build the request from a project's idea and requirements documents.
    /// The requirements stage must have content.
    pub fn from_project(project: &ForgeProject) -> Result<Self> {
        let requirements = project
            .stage(Stage::Requirements)
            .map(|s| &s.content)
            .filter(|c| c.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or_else(|| {
                ForgeError::validation(
                    "requirements",
                    format!("project '{}' has no requirements document yet", project.id),
                )
            })?;
        let idea = project.stage(Stage::Idea).map(|s| &s.content);

        let summary = idea
            .and_then(|c| {
                lookup(c, "value_proposition")
                    .or_else(|| lookup(c, "problem.statement"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
            .or_else(|| project.description.clone())
            .unwrap_or_else(|| project.name.clone());

        let mut constraints = lines(lookup(requirements, "constraints"));
        if let Some(idea) = idea {
            constraints.extend(lines(lookup(idea, "feasibility.constraints")));
        }

        Ok(Self {
            project_id: Some(project.id.clone()),
            summary,
            functional: lines(lookup(requirements, "functional")),
            non_functional: lines(lookup(requirements, "non_functional")),
            scope: lines(lookup(requirements, "scope.in")),
            constraints,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.summary.trim().is_empty() && self.functional.is_empty() {
            return Err(ForgeError::validation(
                "requirements",
                "a summary or at least one functional requirement is needed",
            ));
        }
        Ok(())
    }

    pub fn prompt(&self) -> String {
        let mut out = format!("Product: {}\n", self.summary.trim());
        section(&mut out, "Functional requirements", &self.functional);
        section(&mut out, "Non-functional requirements", &self.non_functional);
        section(&mut out, "In scope", &self.scope);
        section(&mut out, "Constraints", &self.constraints);
        out
    }

    pub fn to_request(&self) -> ModelRequest {
        ModelRequest::new(SYSTEM_PROMPT, self.prompt())
            .with_temperature(0.2)
            .expect_json()
    }
}

fn section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

/// Flatten a list of strings or `{id, description, metric}` objects into
/// one line per item.
fn lines(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(obj) => {
                let text = obj
                    .get("description")
                    .or_else(|| obj.get("name"))
                    .and_then(Value::as_str)?;
                let mut line = match obj.get("id").and_then(Value::as_str) {
                    Some(id) => format!("{id}: {text}"),
                    None => text.to_string(),
                };
                if let Some(metric) = obj.get("metric").and_then(Value::as_str) {
                    line.push_str(&format!(" ({metric})"));
                }
                Some(line)
            }
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect()
}
