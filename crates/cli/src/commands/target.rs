//! Print a resolved target

use crate::errors::Result;
use devkit_architect::{Architect, TargetSpecifier};
use std::io::Write;

/// Resolve `specifier` and write it to `out` as pretty JSON.
pub fn execute_target(
    architect: &Architect,
    specifier: &TargetSpecifier,
    out: &mut impl Write,
) -> Result<()> {
    let target = architect.get_target(specifier)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&target)?)?;
    Ok(())
}
