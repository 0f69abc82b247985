//! Provider replies onto the common [`ArchitectureAnalysis`] schema.
//!
//! Providers disagree on field spelling as much as on architecture, so the
//! parser is lenient about shape and strict about the one field every
//! analysis needs: a style.

use super::types::{ArchitectureAnalysis, Component, Risk};
use model_client::ModelResponse;
use serde_json::{Map, Value};

pub const RISK_CATEGORIES: &[&str] = &[
    "security",
    "scalability",
    "performance",
    "reliability",
    "cost",
    "complexity",
    "compliance",
    "vendor_lock_in",
    "data",
    "other",
];

/// Keyword table for free-text risk classification. Order matters: the
/// first category with a matching keyword wins.
const RISK_KEYWORDS: &[(&str, &[&str])] = &[
    ("vendor_lock_in", &["vendor", "lock-in", "lock_in", "lockin", "lock in", "proprietary"]),
    ("security", &["secur", "auth", "vulnerab", "breach", "injection", "encrypt", "attack"]),
    ("compliance", &["complian", "gdpr", "hipaa", "regulat", "privacy", "legal", "pci"]),
    ("scalability", &["scal", "capacity", "growth", "load"]),
    ("performance", &["perform", "latency", "slow", "throughput", "response time"]),
    ("reliability", &["reliab", "availab", "downtime", "outage", "failover", "resilien", "fault"]),
    ("data", &["data", "consisten", "migration", "integrity", "backup"]),
    ("cost", &["cost", "budget", "expens", "pricing", "spend"]),
    ("complexity", &["complex", "maintain", "operational", "learning curve", "overhead", "skill"]),
];

/// Slice a JSON object out of a reply that may wrap it in prose or a code
/// fence: everything from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Normalize one provider response. The error string explains what was
/// missing and ends up in the failure note.
pub fn normalize(response: &ModelResponse) -> Result<ArchitectureAnalysis, String> {
    let value = extract_json(&response.content).ok_or_else(|| "no JSON object in reply".to_string())?;
    let obj = value
        .as_object()
        .ok_or_else(|| "reply is not a JSON object".to_string())?;

    let style = find_style(obj).ok_or_else(|| "missing architecture style".to_string())?;
    let components = first_array(obj, &["components", "services", "modules"])
        .map(|items| items.iter().filter_map(component).collect())
        .unwrap_or_default();
    let risks: Vec<Risk> = first_array(obj, &["risks", "risk_assessment"])
        .map(|items| items.iter().filter_map(risk).collect())
        .unwrap_or_default();
    let rationale = first_str(obj, &["rationale", "summary", "justification"]).map(str::to_string);

    let mut analysis = ArchitectureAnalysis {
        provider: response.provider.clone(),
        model: response.model.clone(),
        style: canonical_style(style),
        components,
        risks,
        score: 0.0,
        rationale,
        latency_ms: response.latency_ms,
    };
    analysis.score = reported_score(obj).unwrap_or_else(|| derived_score(&analysis));
    Ok(analysis)
}

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

/// Lowercase, with every run of non-alphanumerics collapsed to `_`.
fn key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut gap = false;
    for c in s.trim().chars() {
        if c.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('_');
            }
            gap = false;
            out.extend(c.to_lowercase());
        } else {
            gap = true;
        }
    }
    out
}

pub fn canonical_style(raw: &str) -> String {
    let k = key(raw);
    let flat = k.replace('_', "");
    let canonical = if k.contains("modular") && k.contains("monolith") {
        "modular_monolith"
    } else if flat.contains("microservice") {
        "microservices"
    } else if k.contains("monolith") {
        "monolith"
    } else if k == "faas" || k.contains("serverless") || k.contains("function_as_a_service") {
        "serverless"
    } else if k.contains("event") {
        "event_driven"
    } else if k.contains("hexagonal") || k.contains("ports_and_adapters") || k.contains("clean_architecture") {
        "hexagonal"
    } else if k.contains("layered") || k.contains("n_tier") || k.contains("three_tier") || k.contains("3_tier") {
        "layered"
    } else if k == "soa" || k.contains("service_oriented") {
        "service_oriented"
    } else {
        return k;
    };
    canonical.to_string()
}

pub fn canonical_risk_category(raw: &str) -> &'static str {
    let k = key(raw);
    if let Some(exact) = RISK_CATEGORIES.iter().find(|c| **c == k) {
        return *exact;
    }
    let lower = raw.to_lowercase();
    RISK_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or("other")
}

fn component_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

fn find_style(obj: &Map<String, Value>) -> Option<&str> {
    if let Some(s) = first_str(obj, &["style", "architecture_style", "pattern"]) {
        return Some(s);
    }
    match obj.get("architecture")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        Value::Object(inner) => first_str(inner, &["style", "pattern", "name"]),
        _ => None,
    }
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

fn first_array<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_array))
}

fn component(item: &Value) -> Option<Component> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(Component {
            name: component_name(s),
            kind: None,
        }),
        Value::Object(obj) => {
            let name = first_str(obj, &["name", "component", "title"])?;
            Some(Component {
                name: component_name(name),
                kind: first_str(obj, &["kind", "type", "layer"]).map(key),
            })
        }
        _ => None,
    }
}

fn risk(item: &Value) -> Option<Risk> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(Risk {
            category: canonical_risk_category(s).to_string(),
            description: s.trim().to_string(),
        }),
        Value::Object(obj) => {
            let description = first_str(obj, &["description", "risk", "summary", "name"])
                .unwrap_or_default()
                .trim()
                .to_string();
            let mut category = first_str(obj, &["category", "type"])
                .map(canonical_risk_category)
                .unwrap_or("other");
            if category == "other" && !description.is_empty() {
                category = canonical_risk_category(&description);
            }
            if description.is_empty() && category == "other" {
                return None;
            }
            Some(Risk {
                category: category.to_string(),
                description,
            })
        }
        _ => None,
    }
}

/// A provider's own score, accepted as a 0..=1 fraction or a 0..=100
/// percentage. An integer `1` is a percentage; `1.0` is a fraction.
fn reported_score(obj: &Map<String, Value>) -> Option<f64> {
    let value = ["score", "confidence", "quality_score"]
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| v.is_number()))?;
    let raw = value.as_f64()?;
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let fraction = raw < 1.0 || (raw == 1.0 && value.is_f64());
    let scaled = if fraction { raw * 100.0 } else { raw };
    Some((scaled.min(100.0) * 10.0).round() / 10.0)
}

/// Completeness-based score for providers that do not report one.
fn derived_score(analysis: &ArchitectureAnalysis) -> f64 {
    let components = analysis.components.len().min(5) as f64;
    let risks = analysis.risks.len().min(4) as f64;
    40.0 + components * 6.0 + risks * 7.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(content: &str) -> ModelResponse {
        ModelResponse {
            provider: "p1".into(),
            model: "m1".into(),
            content: content.into(),
            usage: None,
            latency_ms: 12,
        }
    }

    #[test]
    fn extracts_json_from_fenced_prose() {
        let text = "Here you go:\n```json\n{\"style\": \"Microservices\"}\n```\nThanks!";
        assert_eq!(extract_json(text).unwrap()["style"], "Microservices");
        assert!(extract_json("no braces here").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    #[test]
    fn style_synonyms_share_a_canonical_form() {
        assert_eq!(canonical_style("Micro-services"), "microservices");
        assert_eq!(canonical_style("Microservice Architecture"), "microservices");
        assert_eq!(canonical_style("Modular Monolith"), "modular_monolith");
        assert_eq!(canonical_style("monolithic"), "monolith");
        assert_eq!(canonical_style("FaaS"), "serverless");
        assert_eq!(canonical_style("Event-Driven"), "event_driven");
        assert_eq!(canonical_style("Ports and Adapters"), "hexagonal");
        assert_eq!(canonical_style("Three-tier"), "layered");
        assert_eq!(canonical_style("Space Based"), "space_based");
    }

    #[test]
    fn risk_categories_are_classified() {
        assert_eq!(canonical_risk_category("Security"), "security");
        assert_eq!(canonical_risk_category("vendor lock-in"), "vendor_lock_in");
        assert_eq!(canonical_risk_category("GDPR exposure"), "compliance");
        assert_eq!(canonical_risk_category("High latency under peak"), "performance");
        assert_eq!(canonical_risk_category("team morale"), "other");
    }

    #[test]
    fn accepts_alternate_field_spellings() {
        let a = normalize(&reply(
            r#"{
                "architecture": {"style": "Modular Monolith"},
                "services": ["Order  Service", {"name": "Payments", "type": "External API"}],
                "risks": ["SQL injection", {"type": "cost", "summary": "egress fees"}],
                "confidence": 0.8
            }"#,
        ))
        .unwrap();
        assert_eq!(a.provider, "p1");
        assert_eq!(a.style, "modular_monolith");
        assert_eq!(a.component_names().collect::<Vec<_>>(), ["order service", "payments"]);
        assert_eq!(a.components[1].kind.as_deref(), Some("external_api"));
        assert_eq!(a.risk_categories().collect::<Vec<_>>(), ["security", "cost"]);
        assert_eq!(a.score, 80.0);
    }

    #[test]
    fn pattern_key_and_derived_score() {
        let a = normalize(&reply(
            r#"{"pattern": "serverless", "components": ["api", "queue"], "risks": ["cold starts slow requests"]}"#,
        ))
        .unwrap();
        assert_eq!(a.style, "serverless");
        assert_eq!(a.risks[0].category, "performance");
        assert_eq!(a.score, 40.0 + 12.0 + 7.5);
    }

    #[test]
    fn score_above_one_is_a_percentage() {
        let a = normalize(&reply(r#"{"style": "layered", "score": 140}"#)).unwrap();
        assert_eq!(a.score, 100.0);
        let b = normalize(&reply(r#"{"style": "layered", "score": 72}"#)).unwrap();
        assert_eq!(b.score, 72.0);
    }

    #[test]
    fn integer_one_is_a_percentage_but_one_point_zero_is_a_fraction() {
        let a = normalize(&reply(r#"{"style": "layered", "score": 1}"#)).unwrap();
        assert_eq!(a.score, 1.0);
        let b = normalize(&reply(r#"{"style": "layered", "score": 1.0}"#)).unwrap();
        assert_eq!(b.score, 100.0);
        let c = normalize(&reply(r#"{"style": "layered", "score": 0}"#)).unwrap();
        assert_eq!(c.score, 0.0);
    }

    #[test]
    fn missing_style_is_malformed() {
        let err = normalize(&reply(r#"{"components": ["api"]}"#)).unwrap_err();
        assert!(err.contains("style"));
        assert!(normalize(&reply("I cannot help with that.")).is_err());
    }
}
