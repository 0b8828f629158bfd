// Report Generation for Contract Risk
//
// This module formats risk reports as JSON or plain text.

use crate::api::types::RiskReport;
use crate::bytecode::RiskSeverity;
use crate::pipeline::StepStatus;
use crate::risk::Finding;
use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            other => Err(anyhow!("Unsupported report format: {}", other)),
        }
    }
}

/// Report formatter for Contract Risk
pub struct ReportFormatter;

impl ReportFormatter {
    /// Format a report as JSON
    pub fn to_json(report: &RiskReport) -> Result<String> {
        let json = serde_json::to_string_pretty(report)?;
        Ok(json)
    }

    /// Format a report as plain text
    pub fn to_text(report: &RiskReport) -> String {
        let mut output = String::new();

        output.push_str("Contract Risk Report\n");
        output.push_str("====================\n\n");

        output.push_str(&format!("Address: {}\n", report.address));
        output.push_str(&format!("Chain ID: {}\n", report.chain_id));
        if let Some(name) = &report.contract_name {
            output.push_str(&format!("Contract: {}\n", name));
        }
        output.push_str(&format!("Verified Source: {}\n", yes_no(report.is_verified)));
        output.push_str(&format!("Upgradeable: {}\n", yes_no(report.is_upgradeable)));
        output.push_str(&format!("Timestamp: {}\n", report.timestamp));
        if report.from_cache {
            output.push_str("Served from cache\n");
        }
        output.push('\n');

        output.push_str(&format!("Safety Score: {}/100\n", report.score));
        output.push_str(&format!("Severity: {}\n", report.severity.to_string().to_uppercase()));
        let scorer = if report.used_fallback { "Fallback heuristic" } else { "AI assessment" };
        output.push_str(&format!("{}: {}\n\n", scorer, report.reason));

        if let Some(quality) = &report.quality {
            output.push_str("Code Quality\n");
            output.push_str("------------\n");
            for (name, value) in quality.iter() {
                output.push_str(&format!("{}: {}/100\n", name, value));
            }
            output.push('\n');
        }

        if let Some(bytecode) = &report.bytecode_analysis {
            output.push_str("Bytecode\n");
            output.push_str("--------\n");
            output.push_str(&format!("Contract Type: {}\n", bytecode.contract_type));
            output.push_str(&format!("Complexity: {}/100\n", bytecode.estimated_complexity));
            output.push_str(&format!("Recognised Functions: {}\n", bytecode.function_selectors.len()));
            for risk in &bytecode.risk_assessment.risks {
                output.push_str(&format!("  - {}\n", risk));
            }
            output.push('\n');
        }

        output.push_str(&format!("Findings: {}\n", report.findings.len()));
        output.push_str("---------\n\n");
        for severity in [
            RiskSeverity::Critical,
            RiskSeverity::High,
            RiskSeverity::Medium,
            RiskSeverity::Low,
        ] {
            let group: Vec<&Finding> = report
                .findings
                .iter()
                .filter(|f| f.severity == severity)
                .collect();
            if !group.is_empty() {
                output.push_str(&format!("{}: {} issues\n", severity.to_string().to_uppercase(), group.len()));
                Self::format_findings(&mut output, &group);
            }
        }

        if !report.recommendations.is_empty() {
            output.push_str("Recommendations\n");
            output.push_str("---------------\n");
            for recommendation in &report.recommendations {
                output.push_str(&format!("[{}] {}\n", recommendation.category, recommendation.text));
            }
            output.push('\n');
        }

        output.push_str("Milestones\n");
        output.push_str("----------\n");
        for milestone in &report.milestones {
            let marker = match milestone.status {
                StepStatus::Completed => "done",
                StepStatus::Failed => "failed",
                StepStatus::InProgress => "running",
                StepStatus::Pending => "pending",
            };
            output.push_str(&format!("{:<22} {:<8} {}\n", milestone.id.as_str(), marker, milestone.message));
        }

        output
    }

    fn format_findings(output: &mut String, findings: &[&Finding]) {
        for (i, finding) in findings.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, finding.title));
            output.push_str(&format!("   Category: {}\n", finding.category));
            output.push_str(&format!("   Description: {}\n", finding.description));
            output.push_str(&format!("   Recommendation: {}\n\n", finding.recommendation));
        }
    }

    /// Save a report to a file
    pub fn save_to_file<P: AsRef<Path>>(report: &RiskReport, path: P, format: ReportFormat) -> Result<()> {
        let content = match format {
            ReportFormat::Json => Self::to_json(report)?,
            ReportFormat::Text => Self::to_text(report),
        };

        fs::write(path, content)?;
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
