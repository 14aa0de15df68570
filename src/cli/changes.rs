//! List the watched files changed in a revision range.

use std::io::{self, Write};

use crate::changeset::{self, ChangeSet};
use crate::error::Error;

use super::RunArgs;

/// Run the changes command. Needs only the revisions.
pub fn run(args: &RunArgs) -> Result<(), Error> {
    let range = args.revisions()?;
    let changes = changeset::resolve(&args.repo, &range);
    print_changes(&mut io::stdout().lock(), &changes)?;
    Ok(())
}

fn print_changes(out: &mut impl Write, changes: &ChangeSet) -> io::Result<()> {
    if changes.is_empty() {
        writeln!(out, "No watched files changed.")?;
        return Ok(());
    }
    for file in changes.files() {
        writeln!(out, "{:<14} {}", file.category.as_str(), file.path)?;
    }
    Ok(())
}
