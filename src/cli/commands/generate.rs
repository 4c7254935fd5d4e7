//! `ksm generate`: print a random password meeting the given complexity.

use crate::crypto::generate_password;
use crate::errors::Result;
use crate::record::Complexity;

/// Execute the `generate` command.
pub fn execute(complexity: &Complexity) -> Result<()> {
    let password = generate_password(complexity)?;
    println!("{}", password.as_str());
    Ok(())
}
