//! Validate a workspace and summarize it

use crate::errors::Result;
use devkit_architect::Architect;
use std::io::Write;

/// Write one line per project listing its targets.
///
/// Loading the workspace already validated it, so this only reports.
pub fn execute_validate(architect: &Architect, out: &mut impl Write) -> Result<()> {
    let workspace = architect.workspace()?;
    writeln!(out, "Workspace is valid ({} projects)", workspace.projects.len())?;
    for (name, project) in &workspace.projects {
        let targets: Vec<&str> = project.target_names().collect();
        let targets = if targets.is_empty() {
            "no targets".to_string()
        } else {
            targets.join(", ")
        };
        writeln!(out, "  {name} ({}): {targets}", project.project_type)?;
    }
    Ok(())
}
