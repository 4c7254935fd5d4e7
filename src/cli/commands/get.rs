//! `ksm get`: fetch and print a single record.

use crate::cli::output;
use crate::cli::{build_client, call_context, manifest_path, Cli};
use crate::client::RecordClient;
use crate::config::Manifest;
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, uid: &str, show_values: bool) -> Result<()> {
    // The declarative file is optional here; it only supplies settings.
    let path = manifest_path(cli);
    let manifest = if path.exists() {
        Some(Manifest::load(&path)?)
    } else {
        None
    };

    let client = build_client(cli, manifest.as_ref())?;
    let record = client.fetch(&call_context(manifest.as_ref()), uid)?;

    output::info(&format!("{} ({})", record.title, record.record_type()));
    output::print_record_table(&record, show_values);
    Ok(())
}
