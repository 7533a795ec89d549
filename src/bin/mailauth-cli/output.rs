use anyhow::{Result, bail};
use mailauth_check::{DomainReport, ValidationResult};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct Row {
    pub domain: String,
    pub kind: &'static str,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub record: Option<String>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub policy: Option<String>,
    pub result: ValidationResult,
}

impl Row {
    pub fn new(domain: &str, kind: &'static str, record: Option<String>, result: ValidationResult) -> Self {
        Self {
            domain: domain.to_string(),
            kind,
            record,
            policy: None,
            result,
        }
    }

    pub fn from_report(report: DomainReport) -> [Self; 2] {
        let spf = Self::new(&report.domain, "spf", report.spf_record, report.spf);
        let mut dmarc = Self::new(&report.domain, "dmarc", report.dmarc_record, report.dmarc);
        dmarc.policy = report.dmarc_policy.map(|policy| policy.to_string());
        [spf, dmarc]
    }
}

pub fn emit(rows: &[Row], format: &str, out: Option<&str>) -> Result<()> {
    match format {
        "human" => {
            for row in rows {
                print_human(row);
            }
            Ok(())
        }
        "json" => emit_json(rows, out),
        "ndjson" => emit_ndjson(rows, out),
        "csv" => emit_csv(rows, out),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

fn print_human(row: &Row) {
    let label = if row.result.status { "[OK]     " } else { "[INVALID]" };
    println!("{label} {} {}", row.kind, row.domain);
    if let Some(record) = &row.record {
        println!("          record: {record}");
    }
    if let Some(policy) = &row.policy {
        println!("          policy: {policy}");
    }
    for issue in &row.result.issues {
        println!("          {issue}");
    }
}

#[cfg(feature = "with-serde")]
fn emit_json(rows: &[Row], out: Option<&str>) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    match out {
        Some(path) => write_all_atomically(path, s.as_bytes()),
        None => {
            println!("{s}");
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn emit_json(_rows: &[Row], _out: Option<&str>) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn emit_ndjson(rows: &[Row], out: Option<&str>) -> Result<()> {
    let mut buf = Vec::new();
    for row in rows {
        buf.extend_from_slice(serde_json::to_string(row)?.as_bytes());
        buf.push(b'\n');
    }
    match out {
        Some(path) => write_all_atomically(path, &buf),
        None => {
            print!("{}", String::from_utf8_lossy(&buf));
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn emit_ndjson(_rows: &[Row], _out: Option<&str>) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
fn emit_csv(rows: &[Row], out: Option<&str>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["domain", "kind", "status", "severity", "message"])?;
    for row in rows {
        let status = if row.result.status { "true" } else { "false" };
        if row.result.issues.is_empty() {
            wtr.write_record([row.domain.as_str(), row.kind, status, "", ""])?;
        }
        for issue in &row.result.issues {
            wtr.write_record([
                row.domain.as_str(),
                row.kind,
                status,
                issue.severity.as_str(),
                issue.message.as_str(),
            ])?;
        }
    }
    let data = wtr.into_inner()?;
    match out {
        Some(path) => write_all_atomically(path, &data),
        None => {
            print!("{}", String::from_utf8_lossy(&data));
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-csv"))]
fn emit_csv(_rows: &[Row], _out: Option<&str>) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;
    let tmp = format!("{}.tmp", path);
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}
