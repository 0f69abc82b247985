//! Agreement between normalized analyses.
//!
//! Pairwise agreement blends three structural signals with the configured
//! [`AgreementWeights`]:
//!
//! ```text
//! agree(a, b) = w.style      · [style(a) == style(b)]
//!             + w.components · (0.7 · J(names) + 0.3 · J(kinds))
//!             + w.risks      · J(risk categories)
//! ```
//!
//! where `J` is Jaccard similarity and two empty sets count as identical.

use super::types::{ArchitectureAnalysis, Aspect, ConsensusArea, DivergenceArea};
use crate::config::AgreementWeights;
use std::collections::{BTreeMap, BTreeSet};

const NAME_SHARE: f64 = 0.7;
const KIND_SHARE: f64 = 0.3;

pub fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    shared / union
}

pub fn pairwise(a: &ArchitectureAnalysis, b: &ArchitectureAnalysis, w: &AgreementWeights) -> f64 {
    let style = if a.style == b.style { 1.0 } else { 0.0 };
    let names = jaccard(&a.component_names().collect(), &b.component_names().collect());
    let kinds = jaccard(&a.component_kinds().collect(), &b.component_kinds().collect());
    let risks = jaccard(&a.risk_categories().collect(), &b.risk_categories().collect());
    let score = w.style * style + w.components * (NAME_SHARE * names + KIND_SHARE * kinds) + w.risks * risks;
    score.clamp(0.0, 1.0)
}

/// Mean pairwise agreement over every unordered pair. A lone analysis
/// agrees with itself.
pub fn overall(analyses: &[ArchitectureAnalysis], w: &AgreementWeights) -> f64 {
    if analyses.len() < 2 {
        return 1.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in analyses.iter().enumerate() {
        for b in &analyses[i + 1..] {
            total += pairwise(a, b, w);
            pairs += 1;
        }
    }
    total / pairs as f64
}

// ---------------------------------------------------------------------------
// Clustering
// ---------------------------------------------------------------------------

fn find(parent: &mut [usize], i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    let mut cur = i;
    while parent[cur] != root {
        let next = parent[cur];
        parent[cur] = root;
        cur = next;
    }
    root
}

/// Indices of the majority cluster: the largest connected group where an
/// edge means pairwise agreement ≥ `threshold`. Ties go to the group with
/// the higher total score, then to the group holding the earliest index.
pub fn majority_cluster(
    analyses: &[ArchitectureAnalysis],
    w: &AgreementWeights,
    threshold: f64,
) -> Vec<usize> {
    let n = analyses.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in i + 1..n {
            if pairwise(&analyses[i], &analyses[j], w) >= threshold {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }

    let total = |g: &Vec<usize>| g.iter().map(|&i| analyses[i].score).sum::<f64>();
    let mut best: Option<Vec<usize>> = None;
    for group in groups.into_values() {
        let better = match &best {
            None => true,
            Some(b) => {
                group.len() > b.len()
                    || (group.len() == b.len() && total(&group) > total(b))
                    || (group.len() == b.len() && total(&group) == total(b) && group[0] < b[0])
            }
        };
        if better {
            best = Some(group);
        }
    }
    best.unwrap_or_default()
}

/// Highest-scoring member of `cluster`; ties go to the earlier index.
pub fn best_in(analyses: &[ArchitectureAnalysis], cluster: &[usize]) -> Option<usize> {
    cluster.iter().copied().fold(None, |best, i| match best {
        Some(b) if analyses[b].score >= analyses[i].score => Some(b),
        _ => Some(i),
    })
}

// ---------------------------------------------------------------------------
// Areas
// ---------------------------------------------------------------------------

fn items_of(a: &ArchitectureAnalysis, aspect: Aspect) -> BTreeSet<&str> {
    match aspect {
        Aspect::Style => std::iter::once(a.style.as_str()).collect(),
        Aspect::Component => a.component_names().collect(),
        Aspect::Risk => a.risk_categories().collect(),
    }
}

/// Provider support per item, for one aspect.
fn tally(analyses: &[ArchitectureAnalysis], aspect: Aspect) -> BTreeMap<&str, Vec<String>> {
    let mut support: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for a in analyses {
        for item in items_of(a, aspect) {
            support.entry(item).or_default().push(a.provider.clone());
        }
    }
    support
}

const ASPECTS: [Aspect; 3] = [Aspect::Style, Aspect::Component, Aspect::Risk];

/// Items held by a strict majority of analyses.
pub fn consensus_areas(analyses: &[ArchitectureAnalysis]) -> Vec<ConsensusArea> {
    let n = analyses.len();
    let mut areas = Vec::new();
    for aspect in ASPECTS {
        for (item, supporters) in tally(analyses, aspect) {
            if supporters.len() * 2 > n {
                areas.push(ConsensusArea {
                    aspect,
                    value: item.to_string(),
                    support: supporters.len() as f64 / n as f64,
                    supporters,
                });
            }
        }
    }
    areas
}

/// Per aspect, each provider's items that lack majority support. An aspect
/// appears only when at least one provider holds such an item.
pub fn divergence_areas(analyses: &[ArchitectureAnalysis]) -> Vec<DivergenceArea> {
    let n = analyses.len();
    let mut areas = Vec::new();
    for aspect in ASPECTS {
        let support = tally(analyses, aspect);
        let mut viewpoints: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for a in analyses {
            let outliers: Vec<String> = items_of(a, aspect)
                .into_iter()
                .filter(|item| support.get(item).map_or(0, Vec::len) * 2 <= n)
                .map(str::to_string)
                .collect();
            if !outliers.is_empty() {
                viewpoints.insert(a.provider.clone(), outliers);
            }
        }
        if !viewpoints.is_empty() {
            areas.push(DivergenceArea { aspect, viewpoints });
        }
    }
    areas
}
