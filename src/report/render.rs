/// Report rendering: table, JSON and YAML
use anyhow::{Context, Result};
use std::cmp::Reverse;
use tabled::builder::Builder;
use tabled::settings::{Padding, Style};

use super::query::Metric;
use super::{Report, ReportRow};
use crate::config::{OutputFormat, QueryKind};

/// Stable sort, largest node count first
pub fn sort_rows(rows: &mut [ReportRow]) {
    rows.sort_by_key(|row| Reverse(row.node_count));
}

pub fn header(query: QueryKind) -> [&'static str; 3] {
    match query {
        QueryKind::Pods => ["CLUSTER NAME", "NODE COUNT", "POD COUNT"],
        QueryKind::MachineTypes => ["CLUSTER NAME", "NODE COUNT", "MACHINE TYPE"],
    }
}

fn metric_cell(metric: &Metric) -> String {
    match metric {
        Metric::PodCount(count) => count.to_string(),
        Metric::MachineTypes(types) => types.join(", "),
        Metric::Error(_) => "error".to_string(),
    }
}

/// Render the column-aligned table, header first
pub fn render_table(report: &Report) -> String {
    let mut builder = Builder::default();
    builder.push_record(header(report.query).map(String::from));

    for row in &report.rows {
        builder.push_record([
            row.name.clone(),
            row.node_count.to_string(),
            metric_cell(&row.metric),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::blank()).with(Padding::new(0, 8, 0, 0));

    let mut out = String::new();
    for line in table.to_string().lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(report)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&report.rows)
                .context("Failed to serialize report as JSON")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(&report.rows).context("Failed to serialize report as YAML")
        }
    }
}
