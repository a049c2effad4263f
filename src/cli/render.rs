//! Terminal rendering: live progress and the final result table

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use probe_bench_core::{BatchReport, ProbeEvent, ProbeOutput, TaskResult, TaskStatus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const MODEL_WIDTH: usize = 32;

/// Drive a progress bar from worker events until every worker has finished
pub fn track(
    total: usize,
    mut events: mpsc::Receiver<ProbeEvent>,
    visible: bool,
) -> Result<JoinHandle<()>> {
    let pb = if visible {
        ProgressBar::new(total as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );

    Ok(tokio::spawn(async move {
        let mut failed = 0;
        while let Some(event) = events.recv().await {
            match event {
                ProbeEvent::Started { model, .. } => pb.set_message(model),
                ProbeEvent::Finished { status, .. } => {
                    if status == TaskStatus::Failed {
                        failed += 1;
                    }
                    pb.inc(1);
                    if failed > 0 {
                        pb.set_message(format!("({failed} failed)"));
                    }
                }
            }
        }
        pb.finish_and_clear();
    }))
}

/// Print the full response of a single probe
pub fn print_probe(model: &str, output: &ProbeOutput) {
    println!("Model:    {model}");
    println!("Status:   success");
    for warning in output.warnings() {
        println!("Warning:  {warning}");
    }
    println!("Response:\n");
    println!("{}", output.text);
}

/// Print the sorted results and the batch summary
pub fn print_report(report: &BatchReport) {
    println!("{}", "=".repeat(100));
    println!(
        "{:<width$}  {:<8}  {:>9}  Response",
        "Model",
        "Status",
        "Time",
        width = MODEL_WIDTH
    );
    println!("{}", "-".repeat(100));
    for result in &report.results {
        println!("{}", format_row(result));
    }
    println!("{}", "=".repeat(100));

    let summary = &report.summary;
    println!(
        "{} succeeded, {} failed of {} models in {:.2}s ({} workers, {:.1} probes/s)",
        summary.succeeded,
        summary.failed,
        summary.total_tasks,
        summary.elapsed.as_secs_f64(),
        summary.total_workers,
        summary.probes_per_second()
    );
    if summary.aborted_workers > 0 {
        println!("{} worker(s) aborted", summary.aborted_workers);
    }
}

fn format_row(result: &TaskResult) -> String {
    let time = result
        .elapsed_ms
        .map(|ms| format!("{ms:.0}ms"))
        .unwrap_or_else(|| "-".to_string());

    let mut detail = result.preview.replace(['\r', '\n'], " ");
    if let Some(kind) = result.error_kind {
        detail = format!("[{kind}] {detail}");
    } else if !result.warnings.is_empty() {
        let kinds: Vec<_> = result.warnings.iter().map(|k| k.as_str()).collect();
        detail = format!("{detail} [{}]", kinds.join(", "));
    }

    format!(
        "{:<width$}  {:<8}  {:>9}  {}",
        result.model,
        result.status.to_string(),
        time,
        detail,
        width = MODEL_WIDTH
    )
}
