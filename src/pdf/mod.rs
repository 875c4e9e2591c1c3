// Proposal export PDF rendering
// Uses genpdf - requires Liberation or similar fonts in standard paths
use std::path::Path;

use genpdf::Element;

use crate::db::{Proposal, Window};

pub fn render_proposal(
    proposal: &Proposal,
    window: &Window,
    secondary_topics: &[String],
    output_path: &Path,
) -> Result<(), String> {
    // Try common font paths - genpdf needs actual font files for metrics
    let font_paths = [
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/System/Library/Fonts/Supplemental",
        "/Library/Fonts",
    ];

    let font_family = font_paths
        .iter()
        .find(|p| Path::new(p).exists())
        .and_then(|path| {
            ["LiberationSans", "DejaVuSans", "Arial"]
                .iter()
                .find_map(|name| genpdf::fonts::from_files(*path, name, None).ok())
        })
        .ok_or_else(|| {
            "No suitable fonts found. Install: apt install fonts-liberation".to_string()
        })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Proposal {}", proposal.id));

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let title_style = genpdf::style::Style::new().with_font_size(20);
    let title = truncate_title(&proposal.title, 120);
    doc.push(genpdf::elements::Paragraph::new(&title).styled(title_style));
    doc.push(genpdf::elements::Break::new(0.5));

    doc.push(genpdf::elements::Paragraph::new(format!(
        "Submission window: {}",
        window.name
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Principal investigator: {}",
        proposal.pi_user_id
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Centre: {}",
        proposal.centre_id
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Main area: {}",
        proposal.main_area
    )));
    if !secondary_topics.is_empty() {
        doc.push(genpdf::elements::Paragraph::new(format!(
            "Secondary topics: {}",
            secondary_topics.join(", ")
        )));
    }
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Status: {}",
        proposal.status
    )));
    if let Some(submitted_at) = proposal.submitted_at {
        doc.push(genpdf::elements::Paragraph::new(format!(
            "Submitted: {}",
            submitted_at.format("%B %d, %Y %H:%M UTC")
        )));
    }
    doc.push(genpdf::elements::Break::new(1.0));

    doc.push(genpdf::elements::Paragraph::new("Summary"));
    doc.push(genpdf::elements::Break::new(0.25));
    for line in proposal.summary.lines() {
        if line.trim().is_empty() {
            doc.push(genpdf::elements::Break::new(0.5));
        } else {
            doc.push(genpdf::elements::Paragraph::new(line));
        }
    }
    doc.push(genpdf::elements::Break::new(1.0));

    let generated = chrono::Utc::now().format("%B %d, %Y").to_string();
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Generated: {}",
        generated
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Proposal ID: {}",
        proposal.id
    )));

    doc.render_to_file(output_path).map_err(|e| e.to_string())
}

// Cut on a character boundary; titles are free text and may be non-ASCII.
fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let head: String = title.chars().take(max_chars).collect();
    format!("{head}...")
}
