//! Saved searches command

use clap::{Args, Subcommand};
use serde_json::Value;

use super::cache::{SavedEntries, SavedKind};
use super::{print_json, CliCache, CliError, OutputFormat};

/// Saved searches subcommand
#[derive(Debug, Args)]
pub struct SearchesCommand {
    #[command(subcommand)]
    action: SearchesAction,

    /// Work on saved queries instead of saved search results
    #[arg(long, global = true, default_value_t = false)]
    queries: bool,
}

#[derive(Debug, Subcommand)]
enum SearchesAction {
    /// List saved entries
    List {
        /// Show the saved ids or filters
        #[arg(long, default_value_t = false)]
        detailed: bool,
    },

    /// Rename a saved entry
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },

    /// Delete saved entries
    Delete {
        /// Names to delete
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Delete all saved entries
    Prune {
        /// Confirm deletion
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

impl SearchesCommand {
    fn kind(&self) -> SavedKind {
        if self.queries {
            SavedKind::Queries
        } else {
            SavedKind::Results
        }
    }

    /// Execute the saved searches command
    pub fn execute(&self, cache: &CliCache, format: OutputFormat) -> Result<(), CliError> {
        let kind = self.kind();
        match &self.action {
            SearchesAction::List { detailed } => {
                let entries = cache.load_saved(kind);
                match format {
                    OutputFormat::Json => print_json(&entries),
                    OutputFormat::Human => {
                        if entries.is_empty() {
                            println!(
                                "no {} entries in {}",
                                kind.label(),
                                cache.saved_path(kind).display()
                            );
                        }
                        for line in summary_lines(&entries, *detailed)? {
                            println!("{line}");
                        }
                        Ok(())
                    }
                }
            }
            SearchesAction::Rename { old, new } => {
                cache.rename_saved(kind, old, new)?;
                println!("renamed {} '{old}' to '{new}'", kind.label());
                Ok(())
            }
            SearchesAction::Delete { names } => {
                cache.delete_saved(kind, names)?;
                println!("deleted {} {}", names.len(), kind.label());
                Ok(())
            }
            SearchesAction::Prune { yes } => {
                if !yes {
                    return Err(CliError::InvalidArgument(format!(
                        "pass --yes to delete every {} in {}",
                        kind.label(),
                        cache.saved_path(kind).display()
                    )));
                }
                cache.prune_saved(kind)?;
                println!("deleted {}", cache.saved_path(kind).display());
                Ok(())
            }
        }
    }
}

/// One line per entry: name plus item or filter count, or the pretty JSON when `detailed`
fn summary_lines(entries: &SavedEntries, detailed: bool) -> Result<Vec<String>, CliError> {
    entries
        .iter()
        .map(|(name, value)| {
            if detailed {
                return Ok(format!("{name}: {}", serde_json::to_string_pretty(value)?));
            }
            Ok(match value {
                Value::Array(ids) => format!("{name} ({} items)", ids.len()),
                Value::Object(filters) => format!("{name} ({} filters)", filters.len()),
                _ => name.clone(),
            })
        })
        .collect()
}
