//! Print the builder description of a target

use crate::errors::Result;
use devkit_architect::{Architect, TargetSpecifier};
use std::io::Write;

/// Resolve `specifier`, locate its builder and write the description to `out`.
pub async fn execute_describe(
    architect: &Architect,
    specifier: &TargetSpecifier,
    out: &mut impl Write,
) -> Result<()> {
    let target = architect.get_target(specifier)?;
    let description = architect.get_builder_description(&target).await?;
    writeln!(out, "{}", serde_json::to_string_pretty(&description)?)?;
    Ok(())
}
