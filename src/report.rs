//! Console reporting for the CLI

use crate::dispatch::{BatchResult, ServeResult};
use console::style;
use std::time::Duration;

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

fn rate(commands: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        commands as f64 / secs
    } else {
        0.0
    }
}

/// Print a header at the start of a batch run
pub fn print_batch_header(input: &str, output: &str, workers: usize) {
    println!();
    println!(
        "{} {}",
        style("treefs").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Input:").bold(), input);
    println!("  {} {}", style("Output:").bold(), output);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!();
}

/// Print a summary of a completed batch run
pub fn print_batch_summary(result: &BatchResult, output: &str) {
    let duration_secs = result.duration.as_secs_f64();

    println!();
    println!("{}", style("Batch Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Commands:").bold(),
        format_number(result.commands)
    );
    println!(
        "  {} {:.3}s ({:.0} commands/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate(result.commands, result.duration)
    );
    if result.failed > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(result.failed)
        );
    }
    println!("  {} {}", style("Tree dump:").bold(), output);
    println!();
}

/// Print a header when the service starts listening
pub fn print_serve_header(socket: &str, workers: usize) {
    println!();
    println!(
        "{} {}",
        style("treefs").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Socket:").bold(), socket);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {}", style("Press Ctrl-C to stop").dim());
    println!();
}

/// Print a summary after the service stops
pub fn print_serve_summary(result: &ServeResult) {
    println!();
    println!("{}", style("Service Stopped").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Commands:").bold(),
        format_number(result.commands)
    );
    println!(
        "  {} {:.1}s",
        style("Uptime:").bold(),
        result.duration.as_secs_f64()
    );
    if result.failed > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(result.failed)
        );
    }
    println!();
}
