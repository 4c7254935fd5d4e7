//! `ksm auth`: manage the cached credential.
//!
//! Subcommands:
//! - `ksm auth keyring`         : save the credential to the OS keyring
//! - `ksm auth keyring --delete`: remove it from the keyring
//!
//! When the keyring feature is not compiled in, keyring commands return
//! a helpful error message.

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::{ProviderError, Result};

/// Execute `ksm auth keyring`: save or delete the credential in the OS keyring.
pub fn execute_keyring(cli: &Cli, delete: bool) -> Result<()> {
    #[cfg(feature = "keyring-store")]
    {
        let project = crate::cli::project_id(&crate::cli::manifest_path(cli));

        if delete {
            crate::keyring::delete_credential(&project)?;
            output::success("Credential removed from OS keyring.");
        } else {
            let blob = match cli.credential.clone() {
                Some(c) => zeroize::Zeroizing::new(c),
                None => zeroize::Zeroizing::new(
                    dialoguer::Password::new()
                        .with_prompt("Paste credential")
                        .interact()
                        .map_err(|e| {
                            ProviderError::CommandFailed(format!("credential prompt: {e}"))
                        })?,
                ),
            };

            // Verify the blob parses before storing it.
            let credential = crate::client::Credential::parse(&blob)?;
            crate::keyring::store_credential(&project, &blob)?;
            output::success(&format!(
                "Credential for {} saved to OS keyring.",
                credential.hostname()
            ));
        }

        Ok(())
    }

    #[cfg(not(feature = "keyring-store"))]
    {
        let _ = (cli, delete);
        output::tip("Set KSM_CREDENTIAL instead, or rebuild with the keyring feature.");
        Err(ProviderError::KeyringError(
            "keyring support not compiled: rebuild with `cargo build --features keyring-store`"
                .into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn keyring_disabled_returns_error() {
        // Tests compile without the keyring-store feature by default.
        #[cfg(not(feature = "keyring-store"))]
        {
            use clap::Parser;
            let cli = crate::cli::Cli::parse_from(["ksm", "auth", "keyring"]);
            let result = super::execute_keyring(&cli, false);
            assert!(result.is_err());
            let msg = result.unwrap_err().to_string();
            assert!(
                msg.contains("keyring support not compiled"),
                "unexpected error: {msg}"
            );
        }
    }
}
