//! Complete stage documents used across unit tests.

use crate::quality::PriorContext;
use crate::types::Stage;
use serde_json::{json, Value};

pub fn content(stage: Stage) -> Value {
    match stage {
        Stage::Idea => idea(),
        Stage::Requirements => requirements(),
        Stage::Ux => ux(),
        Stage::Technical => technical(),
        Stage::Playbook => playbook(),
    }
}

/// Every upstream stage document for `stage`.
pub fn prior_for(stage: Stage) -> PriorContext {
    stage
        .upstream()
        .iter()
        .map(|s| (*s, content(*s)))
        .collect()
}

pub fn idea() -> Value {
    json!({
        "problem": {
            "statement": "Independent bakeries lose a large share of weekend orders because customers \
                cannot see what is still in stock, phone lines are busy during the morning rush, and \
                staff spend hours reconciling handwritten preorder lists against the ovens. The result \
                is wasted dough, missed sales and frustrated regular customers who drift to chains.",
            "target_users": ["bakery owners", "counter staff", "regular customers"],
            "pain_points": [
                "no live stock visibility",
                "phone preorders collide during the rush",
                "manual reconciliation of preorder lists"
            ]
        },
        "value_proposition": "A shared live shelf that lets customers reserve fresh items in seconds \
            while the bakery plans each bake from real demand.",
        "market": {
            "competitors": [
                {"name": "Generic POS add-ons", "weakness": "no preorder flow"},
                {"name": "Delivery marketplaces", "weakness": "high commission"},
                {"name": "Spreadsheets", "weakness": "no customer access"}
            ],
            "size": "Roughly 60k independent bakeries across the EU",
            "differentiators": ["live shelf", "bake planning from reservations"]
        },
        "feasibility": {
            "constraints": ["small budget", "must run on a tablet at the counter"],
            "resources": "Two developers and one designer for three months",
            "risks": ["adoption by older staff", "unreliable shop wifi", "payment provider fees"],
            "timeline": "Pilot with three bakeries after twelve weeks"
        }
    })
}

pub fn requirements() -> Value {
    let functional: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "id": format!("FR-{i}"),
                "description": format!("Functional capability number {i}"),
                "acceptance_criteria": [format!("Given a shop, when capability {i} runs, then it succeeds")]
            })
        })
        .collect();
    let stories: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "id": format!("US-{i}"),
                "as_a": "customer",
                "i_want": format!("feature {i}"),
                "so_that": "I get fresh bread",
                "requirement_ids": [format!("FR-{i}")]
            })
        })
        .collect();
    json!({
        "functional": functional,
        "non_functional": [
            {"description": "Fast shelf updates", "metric": "p95 under 300ms"},
            {"description": "Availability", "metric": "99.5% monthly"},
            {"description": "Accessible", "metric": "WCAG 2.1 AA"}
        ],
        "scope": {
            "in": ["live shelf", "reservations", "bake planner"],
            "out": ["delivery"]
        },
        "definition_of_done": "Feature is tested, reviewed, documented and demoed to a pilot bakery owner.",
        "user_stories": stories
    })
}

pub fn ux() -> Value {
    let components: Vec<Value> = ["ShelfGrid", "ItemCard", "ReserveButton", "Timer", "Toast"]
        .iter()
        .map(|name| json!({"name": name, "states": ["default", "loading", "error"]}))
        .collect();
    json!({
        "personas": [{"name": "Owner Olga"}, {"name": "Customer Carl"}],
        "journeys": [
            {"name": "Reserve a loaf", "persona": "Customer Carl", "steps": ["open shelf", "pick", "reserve"]},
            {"name": "Plan the bake", "persona": "Owner Olga", "steps": ["open planner", "review", "confirm"]}
        ],
        "accessibility": {
            "wcag_level": "AA",
            "considerations": ["contrast", "keyboard navigation", "screen reader labels", "reduced motion"],
            "testing": "axe audits in CI plus manual screen reader passes"
        },
        "components": components,
        "screens": [
            {"name": "Shelf", "components": ["ShelfGrid", "ItemCard"]},
            {"name": "Reservation", "components": ["ReserveButton", "Timer"]},
            {"name": "Planner", "components": ["ShelfGrid", "Toast"]}
        ]
    })
}

pub fn technical() -> Value {
    json!({
        "consensus": {
            "overall_consensus": 0.82,
            "providers": ["openai", "anthropic", "local"]
        },
        "architecture": {
            "style": "modular_monolith",
            "rationale": "All providers agreed on a single deployable for the pilot. The one provider that \
                proposed microservices flagged scaling, which we address with clear module boundaries so \
                the reservation module can be split out later without rewriting the shelf or planner."
        },
        "risks": [
            {"category": "reliability", "severity": "high", "description": "shop wifi drops", "mitigation": "offline queue"},
            {"category": "security", "severity": "medium", "description": "reservation abuse", "mitigation": "rate limits"},
            {"category": "cost", "severity": "low", "description": "payment fees", "mitigation": "batch payouts"},
            {"category": "scalability", "severity": "low", "description": "weekend peaks", "mitigation": "cache shelf reads"}
        ],
        "stack": [
            {"name": "Rust", "layer": "backend", "justification": "low footprint on cheap hosting"},
            {"name": "PostgreSQL", "layer": "data", "justification": "transactions for reservations"},
            {"name": "SvelteKit", "layer": "frontend", "justification": "small bundles for tablets"}
        ],
        "alternatives": ["microservices", "serverless functions"]
    })
}

pub fn playbook() -> Value {
    let steps: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "title": format!("Step {i}"),
                "instructions": format!("Implement increment {i} behind a feature flag"),
                "deliverables": [format!("increment-{i}")],
                "estimate": "2d"
            })
        })
        .collect();
    json!({
        "context": {
            "idea_summary": "A live shelf for independent bakeries that lets customers reserve fresh items \
                while owners plan each bake from real reservation demand.",
            "requirement_refs": ["FR-1", "FR-2", "FR-3"],
            "ux_refs": ["Reserve a loaf", "Plan the bake"],
            "architecture": "Modular monolith in Rust with PostgreSQL and a SvelteKit tablet frontend."
        },
        "steps": steps,
        "testing": {
            "unit": "cargo test per module",
            "integration": "API tests against a disposable database",
            "e2e": "Playwright on tablet viewport",
            "coverage_target": 80
        },
        "deployment": {
            "environments": ["staging", "production"],
            "rollback": "Redeploy the previous container image and run the down migration if needed.",
            "monitoring": "Request latency and error rate dashboards with paging",
            "ci": "Build, test and push image on every merge"
        }
    })
}
