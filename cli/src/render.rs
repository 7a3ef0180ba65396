use chrono::{DateTime, Local};
use comfy_table::{Cell, CellAlignment, Color, Table};
use common::{Job, JobStats, JobStatus, Page};
use jobdeck_sync::QueryState;

fn status_cell(status: JobStatus) -> Cell {
    let color = match status {
        JobStatus::Completed => Color::Green,
        JobStatus::Failed => Color::Red,
        JobStatus::Running => Color::Blue,
        JobStatus::Pending => Color::Yellow,
    };
    Cell::new(status.as_str()).fg(color)
}

pub fn created_at(raw: &str) -> String {
    if raw.is_empty() {
        return "N/A".to_string();
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Local).format("%b %-d, %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// One line telling how trustworthy the data on screen is.
pub fn freshness(state: &QueryState) -> String {
    let mut line = match state.updated_at {
        Some(at) => format!("updated {}", at.with_timezone(&Local).format("%H:%M:%S")),
        None => "never loaded".to_string(),
    };
    if state.is_fetching {
        line.push_str(" (refreshing)");
    }
    if state.is_stale {
        line.push_str(" [stale]");
    }
    if let Some(err) = &state.error {
        line.push_str(&format!(" [last refresh failed: {}]", err));
    }
    line
}

pub fn stats_table(stats: &JobStats) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Total", "Pending", "Running", "Completed", "Failed"]);
    table.add_row(vec![
        Cell::new(stats.total_jobs),
        Cell::new(stats.pending_jobs).fg(Color::Yellow),
        Cell::new(stats.running_jobs).fg(Color::Blue),
        Cell::new(stats.completed_jobs).fg(Color::Green),
        Cell::new(stats.failed_jobs).fg(Color::Red),
    ]);
    table
}

pub fn stats_note(stats: &JobStats) -> Option<String> {
    if stats.is_consistent() {
        None
    } else {
        Some(format!(
            "note: server total {} differs from the sum of status counters {}",
            stats.total_jobs,
            stats.status_sum()
        ))
    }
}

pub fn jobs_table(page: &Page<Job>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Type", "Status", "Created At", "Retries"]);
    for job in &page.items {
        table.add_row(vec![
            Cell::new(&job.id),
            Cell::new(&job.job_type),
            status_cell(job.status),
            Cell::new(created_at(&job.created_at)),
            Cell::new(job.retry_count).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn page_footer(page: &Page<Job>) -> String {
    format!(
        "Page {} of {} ({} records)",
        page.current_page, page.total_pages, page.total_records
    )
}

pub fn jobs_csv(page: &Page<Job>) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["id", "type", "status", "created_at", "retry_count", "error_message"])?;
    for job in &page.items {
        let retries = job.retry_count.to_string();
        wtr.write_record([
            job.id.0.as_str(),
            job.job_type.as_str(),
            job.status.as_str(),
            job.created_at.as_str(),
            retries.as_str(),
            job.error_message.as_deref().unwrap_or(""),
        ])?;
    }
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

pub fn job_detail(job: &Job) -> String {
    let payload = job
        .payload
        .as_deref()
        .map(|raw| {
            serde_json::from_str::<serde_json::Value>(raw)
                .and_then(|v| serde_json::to_string_pretty(&v))
                .unwrap_or_else(|_| raw.to_string())
        })
        .unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    out.push_str("Job Details:\n");
    out.push_str(&format!("  ID:       {}\n", job.id));
    out.push_str(&format!("  Type:     {}\n", job.job_type));
    out.push_str(&format!("  Status:   {}\n", job.status));
    out.push_str(&format!("  Created:  {}\n", created_at(&job.created_at)));
    out.push_str(&format!("  Retries:  {}\n", job.retry_count));
    if let Some(err) = &job.error_message {
        out.push_str(&format!("  Error:    {}\n", err));
    }
    out.push_str(&format!("  Payload:\n{}\n", payload));
    out
}
