//! Settings command

use clap::{Args, Subcommand};

use super::{print_json, CliCache, CliError, OutputFormat};
use crate::search::fields;

/// Settings subcommand
#[derive(Debug, Args)]
pub struct SettingsCommand {
    #[command(subcommand)]
    action: SettingsAction,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Show current settings
    Show,

    /// Set the default search limit
    Limit {
        /// Number of results
        limit: u64,
    },

    /// Set the search result table columns
    Columns {
        /// Comma separated columns, e.g. `id,datetime,product_type`
        #[arg(value_delimiter = ',', required = true)]
        columns: Vec<String>,
    },

    /// Set the default console user
    User {
        /// Account email
        email: String,
    },

    /// Forget the cached JWT
    Logout,
}

impl SettingsCommand {
    /// Execute the settings command
    pub fn execute(&self, cache: &CliCache, format: OutputFormat) -> Result<(), CliError> {
        let mut settings = cache.load_settings();
        match &self.action {
            SettingsAction::Show => {}
            SettingsAction::Limit { limit } => {
                if *limit == 0 {
                    return Err(CliError::InvalidArgument(
                        "limit must be greater than 0".to_string(),
                    ));
                }
                settings.limit = Some(*limit);
                cache.save_settings(&settings)?;
            }
            SettingsAction::Columns { columns } => {
                settings.search_headers = Some(validate_columns(columns)?);
                cache.save_settings(&settings)?;
            }
            SettingsAction::User { email } => {
                if email.trim().is_empty() {
                    return Err(CliError::InvalidArgument("email must not be empty".to_string()));
                }
                settings.console_user = Some(email.trim().to_string());
                cache.save_settings(&settings)?;
            }
            SettingsAction::Logout => {
                cache.clear_jwt()?;
                println!("removed cached JWT");
                return Ok(());
            }
        }

        match format {
            OutputFormat::Json => print_json(&settings),
            OutputFormat::Human => {
                println!("settings: {}", cache.settings_path().display());
                println!("limit:    {}", settings.effective_limit());
                println!("columns:  {}", settings.effective_columns().join(","));
                println!(
                    "user:     {}",
                    settings.console_user.as_deref().unwrap_or("n/a")
                );
                Ok(())
            }
        }
    }
}

/// Trimmed, non-empty columns; each `id`, `collection` or a known search field
fn validate_columns(columns: &[String]) -> Result<Vec<String>, CliError> {
    let columns: Vec<String> = columns
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        return Err(CliError::InvalidArgument(
            "at least one column is required".to_string(),
        ));
    }
    if let Some(unknown) = columns
        .iter()
        .find(|c| !matches!(c.as_str(), "id" | "collection") && fields::lookup(c).is_none())
    {
        return Err(CliError::InvalidArgument(format!("unknown column '{unknown}'")));
    }
    Ok(columns)
}
