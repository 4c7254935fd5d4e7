//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::reconcile::{Action, CreateReason};
use crate::record::attrs::flatten;
use crate::record::{encode, SecretRecord};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// One row of the plan table.
pub struct PlanRow<'a> {
    pub address: &'a str,
    /// `None` means the resource is gone from the file and will be deleted.
    pub action: Option<&'a Action>,
}

fn action_cell(action: Option<&Action>) -> String {
    match action {
        None => style("delete").red().to_string(),
        Some(Action::Create {
            reason: CreateReason::New,
        }) => style("create").green().to_string(),
        Some(a @ Action::Create { .. }) => style(a.to_string()).yellow().bold().to_string(),
        Some(a @ Action::Update { .. }) => style(a.to_string()).yellow().to_string(),
        Some(a) => style(a.to_string()).dim().to_string(),
    }
}

fn changes_cell(action: Option<&Action>) -> String {
    match action {
        Some(Action::Update { changes }) => changes
            .iter()
            .map(|c| format!("{} {}", c.kind, c.path))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Print the planned action per resource (Resource, Action, Changes).
pub fn print_plan_table(rows: &[PlanRow<'_>]) {
    if rows.is_empty() {
        info("No resources declared.");
        tip("Add a [resource.<type>.<name>] table to the declarative file.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Resource", "Action", "Changes"]);

    for row in rows {
        table.add_row(vec![
            row.address.to_string(),
            action_cell(row.action),
            changes_cell(row.action),
        ]);
    }

    println!("{table}");
}

/// Attribute paths whose values are secrets.
fn is_secret_path(path: &str) -> bool {
    path.starts_with("password.value")
        || path.starts_with("pin_code.value")
        || path.ends_with("card_security_code")
        || path.ends_with("card_number")
}

/// Print a record's attributes (Attribute, Value), masking secrets unless `show_values`.
pub fn print_record_table(record: &SecretRecord, show_values: bool) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Attribute", "Value"]);

    let mut rows = flatten(&encode(record));
    if let Some(pw) = record.fields.password() {
        if let (true, Some(value)) = (pw.policy.enforce_generation, &pw.value) {
            rows.insert("password.value".into(), value.clone());
        }
    }

    for (path, value) in rows {
        let shown = if !show_values && is_secret_path(&path) && !value.is_empty() {
            style("********").dim().to_string()
        } else {
            value
        };
        table.add_row(vec![path, shown]);
    }

    println!("{table}");
}
