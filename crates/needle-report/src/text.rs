use colored::Colorize;

use needle_core::naming::node_to_package_name;
use needle_core::types::{BlockType, CodeType, FileKind, LineType, PackageKind, Tally};
use needle_core::{Module, Package};

const RULE_WIDTH: usize = 40;

/// Format the full module report for terminal output.
pub fn format_analysis(module: &Module, details: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "Needle - Go Module Analysis".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(RULE_WIDTH)));

    out.push_str(&format_summary(module));
    out.push_str(&format_line_breakdown(&module.totals));
    out.push_str(&format_declarations(&module.totals));
    out.push_str(&format_packages(module, details));
    out.push_str(&format_dependency_sections(module));

    out.push('\n');
    out
}

/// Format only the dependency sections: external users, internal users,
/// independent packages, and levels.
pub fn format_deps(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}: {}\n", "Module".bold(), module.name));
    out.push_str(&format_dependency_sections(module));
    out.push('\n');
    out
}

/// Format only the per-package line and declaration breakdowns.
pub fn format_code(module: &Module, details: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}: {}\n", "Module".bold(), module.name));

    for (name, _) in module.package_sizes() {
        let Some(package) = module.package(name) else {
            continue;
        };
        out.push_str(&section(&format!(
            "{} ({}, {} files)",
            package.name,
            package.kind,
            package.file_count()
        )));
        out.push_str(&line_rows(&package.tally));
        out.push_str(&declaration_rows(&package.tally));
        if details {
            out.push_str(&file_rows(package));
        }
    }

    out.push('\n');
    out
}

fn section(title: &str) -> String {
    format!("\n{}\n{}\n", title.bold(), "-".repeat(RULE_WIDTH))
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn format_summary(module: &Module) -> String {
    let stats = &module.stats;
    let mut out = String::new();
    out.push_str(&format!("{}   {}\n", "Module:".bold(), module.name));
    out.push_str(&format!("{}     {}\n", "Path:".bold(), module.path.display()));
    out.push_str(&format!(
        "{} {} ({} main, {} lib)\n",
        "Packages:".bold(),
        stats.package_count,
        module.count_packages(PackageKind::Main),
        module.count_packages(PackageKind::Lib),
    ));
    out.push_str(&format!(
        "{}    {} ({} code, {} test)\n",
        "Files:".bold(),
        stats.file_count,
        stats.files_of(FileKind::Code),
        stats.files_of(FileKind::Test),
    ));
    out.push_str(&format!(
        "{}    {} ({} code, {} test)\n",
        "Lines:".bold(),
        module.totals.line_count(),
        stats.lines_of(FileKind::Code),
        stats.lines_of(FileKind::Test),
    ));
    out.push_str(&format!(
        "{}    {} ({} code, {} test)\n",
        "Chars:".bold(),
        module.totals.char_count(),
        stats.chars_of(FileKind::Code),
        stats.chars_of(FileKind::Test),
    ));
    out
}

fn format_line_breakdown(tally: &Tally) -> String {
    let mut out = section("Lines");
    out.push_str(&line_rows(tally));
    out
}

fn line_rows(tally: &Tally) -> String {
    let total = tally.line_count();
    let mut out = String::new();
    for line_type in LineType::ALL {
        let count = tally.lines_of(line_type);
        out.push_str(&format!(
            "  {:<10} {:>7} {:>6.1}%   avg {:.1} chars\n",
            line_type.to_string(),
            count,
            percent(count, total),
            average(tally.chars_of(line_type), count),
        ));
    }
    out.push_str(&format!("  {:<10} {:>7}\n", "total", total));
    out
}

fn format_declarations(tally: &Tally) -> String {
    let mut out = section("Declarations");
    out.push_str(&declaration_rows(tally));
    out
}

fn declaration_rows(tally: &Tally) -> String {
    let groups = [
        (BlockType::Function, CodeType::FUNCTIONS.as_slice()),
        (BlockType::Type, CodeType::TYPES.as_slice()),
        (BlockType::Global, CodeType::GLOBALS.as_slice()),
    ];
    let mut out = String::new();
    for (block, codes) in groups {
        let breakdown: Vec<String> = codes
            .iter()
            .map(|code| format!("{code} {}", tally.code(*code)))
            .collect();
        out.push_str(&format!(
            "  {:<10} {:>7}   {}\n",
            block.to_string(),
            tally.block(block),
            breakdown.join(", ").dimmed(),
        ));
    }
    out
}

fn format_packages(module: &Module, details: bool) -> String {
    let mut out = section("Packages");
    out.push_str(&format!(
        "  {:<30} {:<5} {:>5} {:>7} {:>9} {:>6} {:>7}\n",
        "package", "kind", "files", "lines", "functions", "types", "globals"
    ));
    for package in &module.packages {
        out.push_str(&format!(
            "  {:<30} {:<5} {:>5} {:>7} {:>9} {:>6} {:>7}\n",
            package.name,
            package.kind.to_string(),
            package.file_count(),
            package.line_count(),
            package.tally.block(BlockType::Function),
            package.tally.block(BlockType::Type),
            package.tally.block(BlockType::Global),
        ));
        if details {
            out.push_str(&file_rows(package));
        }
    }
    out
}

fn file_rows(package: &Package) -> String {
    let mut out = String::new();
    for file in &package.files {
        let name = match file.kind {
            FileKind::Test => file.name.dimmed().to_string(),
            FileKind::Code => file.name.clone(),
        };
        out.push_str(&format!(
            "      {:<26} {:>5} lines  {:>5} code  {:>5} comment  {:>4} deps\n",
            name,
            file.line_count(),
            file.tally.lines_of(LineType::Code),
            file.tally.lines_of(LineType::Comment),
            file.deps.len(),
        ));
    }
    out
}

fn format_dependency_sections(module: &Module) -> String {
    let mut out = String::new();

    let external = module.external_usage();
    out.push_str(&section(&format!("External Dependencies ({})", external.len())));
    if external.is_empty() {
        out.push_str("  none declared\n");
    }
    for (dep, count) in external {
        let users = &module.external_users[dep];
        if users.is_empty() {
            out.push_str(&format!(
                "  {:<40} {:>3}  {}\n",
                dep,
                count,
                "unused".yellow()
            ));
        } else {
            out.push_str(&format!(
                "  {:<40} {:>3}  {}\n",
                dep,
                count,
                users.join(", ")
            ));
        }
    }

    out.push_str(&section("Internal Users"));
    let mut any_users = false;
    for (name, count) in module.internal_usage() {
        if count == 0 {
            continue;
        }
        any_users = true;
        let folder = needle_core::package_to_node_name(&name);
        let users: Vec<String> = module
            .graph
            .users_of(&folder)
            .iter()
            .map(|u| node_to_package_name(u))
            .collect();
        out.push_str(&format!("  {:<30} {:>3}  {}\n", name, count, users.join(", ")));
    }
    if !any_users {
        out.push_str("  no internal imports\n");
    }

    let graph = &module.graph;
    out.push_str(&section(&format!(
        "Independent Packages ({})",
        graph.independent.len()
    )));
    for folder in &graph.independent {
        out.push_str(&format!("  {}\n", node_to_package_name(folder)));
    }

    out.push_str(&section(&format!("Dependency Levels ({})", graph.levels.len())));
    for (level, members) in &graph.levels {
        let names: Vec<String> = members.iter().map(|m| node_to_package_name(m)).collect();
        out.push_str(&format!(
            "  {} {}\n",
            format!("Level {level}:").cyan(),
            names.join(", ")
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_module;

    #[test]
    fn test_analysis_has_every_section() {
        colored::control::set_override(false);
        let (_dir, module) = sample_module();
        let out = format_analysis(&module, false);
        for heading in [
            "Needle - Go Module Analysis",
            "Lines",
            "Declarations",
            "Packages",
            "External Dependencies (2)",
            "Internal Users",
            "Independent Packages (1)",
            "Dependency Levels (2)",
        ] {
            assert!(out.contains(heading), "missing section {heading:?}");
        }
        assert!(out.contains("example.com/demo"));
        assert!(!out.contains("main.go"), "file rows only with details");
    }

    #[test]
    fn test_analysis_details_lists_files() {
        let (_dir, module) = sample_module();
        let out = format_analysis(&module, true);
        assert!(out.contains("main.go"));
        assert!(out.contains("util.go"));
    }

    #[test]
    fn test_deps_lists_levels_and_unused() {
        colored::control::set_override(false);
        let (_dir, module) = sample_module();
        let out = format_deps(&module);
        assert!(out.contains("Level 0: util"), "got:\n{out}");
        assert!(out.contains("Level 1: /"), "got:\n{out}");
        assert!(out.contains("unused"));
        assert!(out.contains("github.com/google/uuid"));
        assert!(!out.contains("Declarations"));
    }

    #[test]
    fn test_code_lists_packages_largest_first() {
        colored::control::set_override(false);
        let (_dir, module) = sample_module();
        let out = format_code(&module, false);
        let root = out.find("/ (main").expect("root package section");
        let util = out.find("util (lib").expect("util package section");
        assert!(root < util, "root package has more lines");
        assert!(!out.contains("External Dependencies"));
    }

    #[test]
    fn test_percent_and_average_handle_zero() {
        assert_eq!(percent(1, 0), 0.0);
        assert_eq!(average(10, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
