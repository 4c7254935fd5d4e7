use clap::Parser;
use ksm_records::cli::{AuthAction, Cli, Commands};
use ksm_records::record::Complexity;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Send logs to stderr; `-v` turns on debug output for this crate.
fn initialise_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ksm_records=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber set earlier wins.
    let _ = tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish(),
    );
}

fn main() {
    let cli = Cli::parse();
    initialise_logging(cli.verbose);

    let result = match cli.command {
        Commands::Plan => ksm_records::cli::commands::plan::execute(&cli),
        Commands::Apply { yes } => ksm_records::cli::commands::apply::execute(&cli, yes),
        Commands::Import {
            ref name,
            ref record_type,
            ref uid,
        } => ksm_records::cli::commands::import_cmd::execute(&cli, name, record_type, uid),
        Commands::Read { show_values } => {
            ksm_records::cli::commands::read::execute(&cli, show_values)
        }
        Commands::Get {
            ref uid,
            show_values,
        } => ksm_records::cli::commands::get::execute(&cli, uid, show_values),
        Commands::Delete { ref name, force } => {
            ksm_records::cli::commands::delete::execute(&cli, name, force)
        }
        Commands::Generate {
            length,
            caps,
            lowercase,
            digits,
            special,
        } => ksm_records::cli::commands::generate::execute(&Complexity {
            length,
            caps,
            lowercase,
            digits,
            special,
        }),
        Commands::Auth { ref action } => match action {
            AuthAction::Keyring { delete } => {
                ksm_records::cli::commands::auth::execute_keyring(&cli, *delete)
            }
        },
    };

    if let Err(e) = result {
        ksm_records::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
