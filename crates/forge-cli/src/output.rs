use forge_core::quality::QualityAssessment;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Human-readable assessment: headline, per-dimension scores, suggestions.
pub fn print_assessment(a: &QualityAssessment) {
    println!(
        "{}: {:.1}/100  gate {}  (minimum {:.0}, recommended {:.0}, confidence {})",
        a.stage,
        a.overall_score,
        a.gate,
        a.thresholds.minimum,
        a.thresholds.recommended,
        a.confidence_level,
    );

    let rows = a
        .dimension_scores
        .iter()
        .map(|(name, d)| {
            vec![
                name.clone(),
                format!("{:.1}", d.score),
                format!("{:.2}", d.weight),
                if d.available { d.feedback.clone() } else { format!("({})", d.feedback) },
            ]
        })
        .collect();
    println!();
    print_table(&["DIMENSION", "SCORE", "WEIGHT", "FEEDBACK"], rows);

    if !a.missing_context.is_empty() {
        println!("\nMissing upstream context: {}", a.missing_context.join(", "));
    }
    if !a.suggestions.is_empty() {
        println!("\nSuggestions:");
        for s in &a.suggestions {
            println!(
                "  [{}] {}: {} (+{:.1}, ~{}m)",
                s.priority, s.dimension, s.message, s.expected_impact, s.estimated_minutes
            );
        }
    }
}
