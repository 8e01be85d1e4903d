// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! CLI output reporter with colored formatting

use crate::geometry::{MeshAnalysis, SimplificationLevel};
use crate::session::SimplificationOutcome;
use colored::*;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    fn rule() {
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Analysis summary grouped the way the metrics are read
    pub fn report_analysis(name: &str, analysis: &MeshAnalysis, duration: Duration) {
        println!();
        Self::rule();
        println!("{} {}", "Mesh:".bold(), name.cyan());
        Self::rule();

        println!("{}", "Basic Info".bold());
        Self::print_value("Vertices", &analysis.vertices.to_string());
        Self::print_value("Triangles", &analysis.triangles.to_string());
        Self::print_value("Surface area", &format!("{:.4}", analysis.surface_area));
        Self::print_value(
            "Volume",
            &analysis
                .volume
                .map(|v| format!("{:.4}", v))
                .unwrap_or_else(|| "n/a (not watertight)".to_string()),
        );
        Self::print_value(
            "Convex hull volume",
            &format!("{:.4}", analysis.convex_hull_volume),
        );

        let bb = &analysis.bounding_box;
        Self::print_value(
            "Bounding box",
            &format!(
                "[{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
                bb.min_bound[0],
                bb.min_bound[1],
                bb.min_bound[2],
                bb.max_bound[0],
                bb.max_bound[1],
                bb.max_bound[2]
            ),
        );

        println!("\n{}", "Topology & Quality".bold());
        Self::print_flag("Watertight", analysis.watertight);
        Self::print_count("Non-manifold edges", analysis.non_manifold_edge_count);
        Self::print_value(
            "Connected components",
            &analysis.connected_components.to_string(),
        );
        Self::print_value("Sharp edges", &analysis.sharp_edge_count.to_string());
        Self::print_value(
            "Avg edge length",
            &format!("{:.5}", analysis.average_edge_length),
        );
        Self::print_value(
            "Avg aspect ratio",
            &format!("{:.4}", analysis.average_triangle_aspect_ratio),
        );

        println!("\n{}", "Curvature & Thickness".bold());
        Self::print_value(
            "Curvature (min/avg/max)",
            &format!(
                "{:.5} / {:.5} / {:.5}",
                analysis.min_curvature, analysis.average_curvature, analysis.max_curvature
            ),
        );
        Self::print_value(
            "Approx thickness",
            &format!("{:.5}", analysis.approx_thickness),
        );

        println!(
            "\n  {} {}",
            "Time:".bright_black(),
            Self::format_duration(duration).yellow()
        );
        Self::rule();
    }

    pub fn report_suggestion(level: Option<SimplificationLevel>, has_model: bool) {
        match (level, has_model) {
            (Some(level), _) => println!(
                "{} {}",
                "Suggested simplification level:".bold(),
                level.to_string().green().bold()
            ),
            (None, true) => Self::report_warning("the model could not suggest a level"),
            (None, false) => Self::report_info("no trained model found, no suggestion available"),
        }
    }

    pub fn report_simplification(outcome: &SimplificationOutcome, duration: Duration) {
        let kept = if outcome.original_triangles == 0 {
            0.0
        } else {
            outcome.final_triangles as f64 / outcome.original_triangles as f64 * 100.0
        };
        println!(
            "{} {} {} -> {} triangles (target {}, {:.1}% kept) in {}",
            "Simplified".green().bold(),
            format!("[{}]", outcome.level).cyan(),
            outcome.original_triangles,
            outcome.final_triangles.to_string().cyan(),
            outcome.target_triangles,
            kept,
            Self::format_duration(duration).yellow()
        );
    }

    /// One line per batch entry
    pub fn report_batch_line(name: &str, analysis: &MeshAnalysis) {
        let status = if analysis.watertight {
            "watertight".green()
        } else {
            "open".yellow()
        };
        println!(
            "  {:<32} {:>10} tris  {}",
            name.cyan(),
            analysis.triangles,
            status
        );
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report warning
    pub fn report_warning(message: &str) {
        println!("{} {}", "⚠️  Warning:".yellow().bold(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    fn print_value(name: &str, value: &str) {
        println!(
            "  {:<26} {}",
            format!("{}:", name).bright_black(),
            value.cyan()
        );
    }

    fn print_flag(name: &str, ok: bool) {
        let value = if ok { "yes".green() } else { "no".red() };
        println!("  {:<26} {}", format!("{}:", name).bright_black(), value);
    }

    fn print_count(name: &str, count: usize) {
        let value = if count == 0 {
            count.to_string().green()
        } else {
            count.to_string().red()
        };
        println!("  {:<26} {}", format!("{}:", name).bright_black(), value);
    }

    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}
