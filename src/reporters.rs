//! Render analysis results for humans or machines.

use crate::types::{AnalysisReport, CodeAnalysis, Compliance, DiagramAnalysis, Severity};
use colored::{ColoredString, Colorize};
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {} (expected text or json)", s)),
        }
    }
}

/// Write `report` to `out` in the requested format.
pub fn report<W: Write>(report: &AnalysisReport, format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => match report {
            AnalysisReport::Code(analysis) => write_code(analysis, out)?,
            AnalysisReport::Diagram(analysis) => write_diagram(analysis, out)?,
        },
    }
    Ok(())
}

fn colorize(severity: &Severity) -> ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::Critical => label.bright_red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.blue(),
        Severity::Info => label.white(),
        Severity::Other(_) => label.magenta(),
    }
}

fn write_code<W: Write>(analysis: &CodeAnalysis, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", format!("Code analysis {}", analysis.analysis_id).bold())?;
    if let Some(ref language) = analysis.language {
        writeln!(out, "Language: {}", language)?;
    }
    if let Some(filename) = analysis.metadata.get("filename").and_then(|v| v.as_str()) {
        writeln!(out, "File:     {}", filename)?;
    }
    if let Some(model) = analysis.metadata.get("ai_model").and_then(|v| v.as_str()) {
        writeln!(out, "Model:    {}", model.dimmed())?;
    }
    writeln!(out)?;

    let s = &analysis.summary;
    let mut line = format!(
        "{} findings: {} critical, {} high, {} medium, {} low, {} info",
        s.total, s.critical, s.high, s.medium, s.low, s.info
    );
    if s.unknown > 0 {
        line.push_str(&format!(", {} unrated", s.unknown));
    }
    writeln!(out, "{}", line.bold())?;

    if analysis.vulnerabilities.is_empty() {
        writeln!(out, "{}", "No vulnerabilities found.".green())?;
    }

    for vuln in &analysis.vulnerabilities {
        writeln!(out)?;
        let location = vuln.location.as_ref();
        let position = location
            .and_then(|l| l.line.as_ref())
            .map(|l| format!(" (line {})", l))
            .unwrap_or_default();
        writeln!(
            out,
            "  [{}] {} {}{}",
            colorize(&vuln.severity),
            vuln.id.bright_cyan(),
            vuln.title,
            position
        )?;
        writeln!(out, "    Confidence: {:.2}  Exploitability: {}", vuln.confidence, vuln.exploitability)?;
        if !vuln.description.is_empty() {
            writeln!(out, "    {}", vuln.description)?;
        }
        if let Some(snippet) = location.and_then(|l| l.snippet.as_deref()) {
            writeln!(out, "    {}", snippet.dimmed())?;
        }
        if !vuln.remediation.is_empty() {
            writeln!(out, "    Fix: {}", vuln.remediation.green())?;
        }
        for reference in &vuln.references {
            writeln!(out, "    See: {}", reference.dimmed())?;
        }
    }

    if !analysis.secrets.is_empty() {
        writeln!(out, "\n{}", "Secrets".bold().underline())?;
        for secret in &analysis.secrets {
            writeln!(
                out,
                "  {} at line {}: {}",
                secret.secret_type.red(),
                secret.line,
                secret.description
            )?;
        }
    }

    if !analysis.dependencies.is_empty() {
        writeln!(out, "\n{}", "Dependencies".bold().underline())?;
        for dep in &analysis.dependencies {
            writeln!(
                out,
                "  {} {} [{}] {} known issue(s)",
                dep.name,
                dep.version.dimmed(),
                colorize(&dep.severity),
                dep.vulnerabilities
            )?;
            if let Some(ref recommendation) = dep.recommendation {
                writeln!(out, "    {}", recommendation)?;
            }
        }
    }

    write_compliance(&analysis.compliance, out)
}

fn write_diagram<W: Write>(analysis: &DiagramAnalysis, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", format!("Diagram analysis {}", analysis.analysis_id).bold())?;
    if let Some(filename) = analysis.metadata.get("filename").and_then(|v| v.as_str()) {
        writeln!(out, "File:     {}", filename)?;
    }
    writeln!(out)?;

    let assessment = &analysis.security_assessment;
    writeln!(
        out,
        "{} (risk: {})",
        assessment.overall.bold(),
        assessment.risk_level
    )?;
    for strength in &assessment.strengths {
        writeln!(out, "  + {}", strength.green())?;
    }
    for concern in &assessment.concerns {
        writeln!(out, "  - {}", concern.yellow())?;
    }

    if !analysis.components.is_empty() {
        writeln!(out, "\n{}", "Components".bold().underline())?;
        for component in &analysis.components {
            writeln!(
                out,
                "  {} [{}]",
                component.name,
                component.component_type.dimmed()
            )?;
        }
    }

    if !analysis.weaknesses.is_empty() {
        writeln!(out, "\n{}", "Weaknesses".bold().underline())?;
        for weakness in &analysis.weaknesses {
            writeln!(out, "  [{}] {}", colorize(&weakness.severity), weakness.title)?;
            if !weakness.affected_components.is_empty() {
                writeln!(out, "    Affects: {}", weakness.affected_components.join(", "))?;
            }
            if !weakness.recommendation.is_empty() {
                writeln!(out, "    Fix: {}", weakness.recommendation.green())?;
            }
        }
    }

    let zt = &analysis.zero_trust_proposal;
    let proposals = [
        ("Network segmentation", &zt.network_segmentation),
        ("Identity and access", &zt.identity_access),
        ("Encryption", &zt.encryption),
        ("Monitoring", &zt.monitoring),
    ];
    if proposals.iter().any(|(_, items)| items.is_some()) {
        writeln!(out, "\n{}", "Zero trust proposal".bold().underline())?;
        for (heading, items) in proposals {
            if let Some(items) = items {
                writeln!(out, "  {}:", heading)?;
                for item in items {
                    writeln!(out, "    - {}", item)?;
                }
            }
        }
    }

    write_compliance(&analysis.compliance, out)
}

fn write_compliance<W: Write>(compliance: &Compliance, out: &mut W) -> std::io::Result<()> {
    if compliance.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{}", "Compliance".bold().underline())?;
    for (framework, entry) in compliance {
        let status = if entry.compliant {
            "compliant".green()
        } else {
            "non-compliant".red()
        };
        writeln!(out, "  {}: {} ({} issue(s))", framework, status, entry.issues)?;
        if let Some(ref details) = entry.details {
            writeln!(out, "    {}", details.dimmed())?;
        }
    }
    Ok(())
}
