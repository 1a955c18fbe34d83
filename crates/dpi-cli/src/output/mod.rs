//! Output formatting for different formats.

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use dpi_probe::{Level, ProbeRun, TlsStatus, TransportProbeResult, Verdict};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable, colored
    #[default]
    Pretty,
    /// JSON, one document per result
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Resolved")]
    resolved: String,
    #[tabled(rename = "Addresses")]
    addresses: String,
    #[tabled(rename = "Latency")]
    latency: String,
}

#[derive(Tabled)]
struct PtrRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Reverse name")]
    name: String,
    #[tabled(rename = "Answered by")]
    provider: String,
}

/// Verdict level as a colored tag
pub fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Clear => "CLEAR".green().bold(),
        Level::Warning => "WARNING".yellow().bold(),
        Level::Blocked => "BLOCKED".red().bold(),
    }
}

/// `BLOCKED dns_spoofing`
pub fn verdict_label(verdict: &Verdict) -> String {
    format!("{} {}", level_tag(verdict.level), verdict.reason)
}

/// One transport layer, e.g. `connected (200) 84 ms` or `failed: timeout`
pub fn transport_summary(result: &TransportProbeResult) -> String {
    if !result.attempted {
        return "not applicable".dimmed().to_string();
    }
    if result.blackholed {
        return format!("{} after {} ms", "blackholed".red(), result.latency_ms);
    }
    if result.succeeded {
        let status = result
            .status_code
            .map(|code| format!(" ({code})"))
            .unwrap_or_default();
        return format!("{}{status} {} ms", "connected".green(), result.latency_ms);
    }

    let kind = result
        .error_kind
        .map_or_else(|| "unknown".to_string(), |k| k.to_string());
    format!("{}: {kind} after {} ms", "failed".red(), result.latency_ms)
}

fn tls_tag(status: TlsStatus) -> ColoredString {
    match status {
        TlsStatus::Valid => "valid".green(),
        TlsStatus::Invalid => "invalid".red(),
        TlsStatus::NoTls => "no_tls".dimmed(),
    }
}

/// Single-line result for batch output
pub fn result_line(id: &str, run: &ProbeRun) -> String {
    let dns = if run.dns.spoofed {
        "spoofed".red().to_string()
    } else if run.dns.resolved {
        "ok".green().to_string()
    } else {
        "unresolved".yellow().to_string()
    };
    let http = if run.http.succeeded {
        "ok".green()
    } else {
        "fail".red()
    };

    format!(
        "[{id}] {} {}  dns={dns} http={http} tls={}  {} ms",
        run.display_name().cyan().bold(),
        verdict_label(&run.verdict),
        tls_tag(run.tls.tls_status()),
        run.total_ms
    )
}

/// Detailed report for a single run
pub fn print_run(run: &ProbeRun) {
    // Header
    println!("{} {}", "Target:".bold(), run.display_name().cyan().bold());
    if run.display_name() != run.target.host() {
        println!("  {} {}", "Address:".bold(), run.target.address());
    }
    println!();

    println!("  {} {}", "Verdict:".bold(), verdict_label(&run.verdict));
    println!("  {}", run.verdict.reason.description().dimmed());
    println!();

    println!("  {} {}", "HTTP:".bold(), transport_summary(&run.http));
    println!(
        "  {} {} {}",
        "TLS:".bold(),
        tls_tag(run.tls.tls_status()),
        transport_summary(&run.tls)
    );

    // DNS
    println!();
    let spoofed = if run.dns.spoofed {
        "yes".red().bold()
    } else {
        "no".green()
    };
    println!(
        "{} {} lookup, resolved: {}, spoofing suspected: {spoofed}",
        "DNS:".bold().underline(),
        run.dns.record_type,
        run.dns.resolved
    );

    if !run.dns.per_provider.is_empty() {
        let rows: Vec<ProviderRow> = run
            .dns
            .per_provider
            .values()
            .map(|p| ProviderRow {
                provider: p.provider.clone(),
                resolved: p
                    .error
                    .as_ref()
                    .map_or_else(|| "yes".to_string(), |e| format!("no ({e})")),
                addresses: p
                    .addresses
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                latency: format!("{} ms", p.latency_ms),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }

    if !run.dns.ptr_by_address.is_empty() {
        let rows: Vec<PtrRow> = run
            .dns
            .ptr_by_address
            .values()
            .map(|ptr| PtrRow {
                address: ptr.address.to_string(),
                name: ptr.reverse_domain.clone().unwrap_or_else(|| "-".into()),
                provider: ptr.provider.clone().unwrap_or_else(|| "-".into()),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }

    println!();
    println!(
        "{}",
        format!(
            "Checked {} in {} ms",
            run.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
            run.total_ms
        )
        .dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpi_probe::{Layer, TransportErrorKind};

    #[test]
    fn formats_parse_the_way_clap_sees_them() {
        assert_eq!(OutputFormat::from_str("JSON", true).unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("pretty", false).unwrap(), OutputFormat::Pretty);
        assert!(OutputFormat::from_str("yaml", true).is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn transport_summaries() {
        colored::control::set_override(false);

        let ok = TransportProbeResult::success(Layer::Http, 84, Some(200));
        assert_eq!(transport_summary(&ok), "connected (200) 84 ms");

        let failed = TransportProbeResult::failure(Layer::Http, 12, TransportErrorKind::Connect);
        assert_eq!(transport_summary(&failed), "failed: connect after 12 ms");

        let hung = TransportProbeResult::blackholed(15_000);
        assert_eq!(transport_summary(&hung), "blackholed after 15000 ms");
    }
}
