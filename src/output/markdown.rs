//! Markdown report generation
//!
//! This module renders a human-readable report of completed and failed jobs,
//! with per-page metadata for every completed job.

use crate::output::summary::{OutputResult, ReportSummary};
use crate::storage::CrawlJob;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report to `output_path`
///
/// # Arguments
///
/// * `summary` - The report data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_markdown_report(summary: &ReportSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a report as markdown
pub fn format_markdown_report(summary: &ReportSummary) -> String {
    let mut md = String::new();

    md.push_str("# SiteLens Crawl Report\n\n");

    md.push_str("## Overview\n\n");
    md.push_str(&format!(
        "- **Generated**: {}\n",
        summary.generated_at.to_rfc3339()
    ));
    md.push_str(&format!("- **Config Fingerprint**: {}\n", summary.config_fingerprint));
    md.push_str(&format!("- **Total Jobs**: {}\n", summary.statistics.total));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        summary.success_rate()
    ));
    md.push_str(&format!(
        "- **Broken Links Found**: {}\n\n",
        summary.broken_link_total()
    ));

    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    for status in crate::state::JobStatus::all() {
        md.push_str(&format!(
            "| {} | {} |\n",
            status,
            summary.statistics.count(status)
        ));
    }
    md.push('\n');

    if !summary.completed.is_empty() {
        md.push_str("## Completed Pages\n\n");
        for job in &summary.completed {
            push_job_details(&mut md, job);
        }
    }

    if !summary.failed.is_empty() {
        md.push_str("## Failed Jobs\n\n");
        md.push_str("| URL | Error |\n");
        md.push_str("|-----|-------|\n");
        for job in &summary.failed {
            md.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&job.url),
                escape_cell(job.error_message.as_deref().unwrap_or(""))
            ));
        }
        md.push('\n');
    }

    md
}

fn push_job_details(md: &mut String, job: &CrawlJob) {
    md.push_str(&format!("### {}\n\n", job.url));

    let Some(metadata) = &job.metadata else {
        md.push_str("_No metadata recorded._\n\n");
        return;
    };

    let title = if metadata.title.is_empty() {
        "(none)"
    } else {
        metadata.title.as_str()
    };
    md.push_str(&format!("- **Title**: {}\n", title));
    md.push_str(&format!("- **HTML Version**: {}\n", metadata.html_version));
    if let Some(crawled_at) = job.crawled_at {
        md.push_str(&format!("- **Crawled**: {}\n", crawled_at.to_rfc3339()));
    }
    md.push_str(&format!(
        "- **Login Form**: {}\n",
        if metadata.has_login_form { "yes" } else { "no" }
    ));
    md.push_str(&format!(
        "- **Links**: {} internal, {} external\n",
        metadata.internal_links.len(),
        metadata.external_links.len()
    ));

    let [h1, h2, h3, h4, h5, h6] = metadata.heading_counts.as_array();
    md.push_str(&format!(
        "- **Headings**: h1 {}, h2 {}, h3 {}, h4 {}, h5 {}, h6 {}\n\n",
        h1, h2, h3, h4, h5, h6
    ));

    if !metadata.broken_links.is_empty() {
        md.push_str("| Broken Link | Status | Text |\n");
        md.push_str("|-------------|--------|------|\n");
        for link in &metadata.broken_links {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&link.url),
                link.status_code,
                escape_cell(&link.text)
            ));
        }
        md.push('\n');
    }
}

/// Keeps a value inside one table cell: pipes are escaped and line breaks
/// become spaces
fn escape_cell(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .replace('|', "\\|")
}
