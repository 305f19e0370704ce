//! Interactive workbook picker.
//!
//! This is intentionally kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker provides the "run `gkfit fit` and choose a workbook" UX
//!
//! The picker searches for spreadsheet files under the current working directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Default directory recursion depth for finding workbooks.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Extensions calamine can open.
pub const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Prompt the user to select a workbook from the current directory tree.
///
/// Behavior:
/// - list discovered workbooks
/// - accept either a number (from the list) or an explicit path
/// - `q` cancels
pub fn prompt_for_workbook_path() -> Result<PathBuf, AppError> {
    let files = discover_workbooks();
    if files.is_empty() {
        return Err(AppError::input(
            "No workbooks found. Provide one with `gkfit fit <workbook.xlsx>`.",
        ));
    }

    println!("Found {} workbook(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::input(format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::input(format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::input(
                "No input received. Provide a workbook path with `gkfit fit <workbook.xlsx>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::input("Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_workbook_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_workbook_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate the provided path points to a spreadsheet file.
pub fn validate_workbook_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::input(format!("Workbook not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::input(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    if !is_workbook(path) {
        return Err(AppError::input(format!(
            "Expected a spreadsheet ({}), got: {}",
            WORKBOOK_EXTENSIONS.join(", "),
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Discover workbooks under the current directory (deterministic order).
///
/// This is used by both the basic text prompt and the Ratatui TUI.
pub fn discover_workbooks() -> Vec<PathBuf> {
    find_workbooks(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_workbooks(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_workbooks_inner(root, 0, max_depth, &mut out);
    out.sort_by(|a, b| pretty_path(a).cmp(&pretty_path(b)));
    out
}

fn find_workbooks_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            find_workbooks_inner(&path, depth + 1, max_depth, out);
            continue;
        }

        if file_type.is_file() && is_workbook(&path) && !is_lock_file(&path) {
            out.push(path);
        }
    }
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// Office keeps `~$name.xlsx` owner files next to open workbooks.
fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with("~$"))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

pub fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}
