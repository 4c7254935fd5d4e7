//! `ksm read`: print every data source in the declarative file.

use console::style;

use crate::cli::output;
use crate::cli::{build_client, call_context, load_manifest, Cli};
use crate::errors::Result;
use crate::provider::{read_data_source, DataSourceQuery};

/// Execute the `read` command.
pub fn execute(cli: &Cli, show_values: bool) -> Result<()> {
    let manifest = load_manifest(cli)?;
    if manifest.data.is_empty() {
        output::info("No data sources declared.");
        output::tip("Add a [data.<type>.<name>] table with `path = \"<uid>\"`.");
        return Ok(());
    }

    let client = build_client(cli, Some(&manifest))?;
    for data in &manifest.data {
        let query = DataSourceQuery::from_attrs(&data.attributes)?;
        let ctx = call_context(Some(&manifest));
        let record = read_data_source(&client, &ctx, data.record_type, &query)?;

        println!("{}", style(&data.address).bold());
        output::print_record_table(&record, show_values);
    }
    Ok(())
}
