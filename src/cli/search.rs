//! Search command

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Args;
use serde_json::Value;
use tracing::{debug, info};

use super::{cell_text, print_json, render_table, CliCache, CliError, OutputFormat};
use crate::client::ConsoleClient;
use crate::search::fields::{self, Operator};
use crate::search::SearchFilters;
use crate::validate::validate_bbox;
use crate::StacItem;

/// Parse `key=value`; the value is read as JSON when possible, else as a string
pub fn parse_filter(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing filter name in '{raw}'"));
    }

    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| Value::String(value.trim().to_string()));
    if key == "bbox" {
        validate_bbox(&value).map_err(|e| e.to_string())?;
    }
    Ok((key.to_string(), value))
}

/// Fields the interactive search asks an operator for; all others use `eq`
const RANGE_FIELDS: &[&str] = &[
    "billable_area",
    "center_frequency",
    "datetime",
    "incidence_angle",
    "look_angle",
    "looks_azimuth",
    "looks_equivalent_number",
    "looks_range",
    "pixel_spacing_azimuth",
    "pixel_spacing_range",
    "resolution_azimuth",
    "resolution_ground_range",
    "resolution_range",
    "squint_angle",
];

/// Operator symbols accepted by the interactive search
const OPERATOR_SYMBOLS: &[(&str, Operator)] = &[
    ("=", Operator::Eq),
    (">", Operator::Gt),
    (">=", Operator::Gte),
    ("<", Operator::Lt),
    ("<=", Operator::Lte),
    ("in", Operator::In),
];

/// Ask for filters on `output`, reading answers from `input`
///
/// Each answer becomes a `key=value` string checked by [`parse_filter`];
/// invalid values and operators are asked again.
pub fn prompt_filters<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Vec<(String, Value)>, CliError> {
    let names: Vec<&str> = fields::SEARCH_FIELDS
        .iter()
        .map(|f| f.name)
        .filter(|name| *name != "limit")
        .collect();
    writeln!(output, "filters: {}", names.join(", "))?;
    let selected = ask(input, output, "filters to set (comma separated):")?;

    let mut filters = Vec::new();
    for name in selected.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.contains(&name) {
            writeln!(output, "skipping unknown filter '{name}'")?;
            continue;
        }
        let operators = if RANGE_FIELDS.contains(&name) {
            ask_operators(input, output, name)?
        } else {
            vec![Operator::Eq]
        };
        for op in operators {
            let key = match op {
                Operator::Eq => name.to_string(),
                _ => format!("{name}__{op}"),
            };
            loop {
                let value = ask(input, output, &format!("{name} [{op}]:"))?;
                if value.is_empty() {
                    continue;
                }
                match parse_filter(&format!("{key}={value}")) {
                    Ok(filter) => {
                        filters.push(filter);
                        break;
                    }
                    Err(e) => writeln!(output, "{e}")?,
                }
            }
        }
    }
    Ok(filters)
}

fn ask_operators<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    name: &str,
) -> Result<Vec<Operator>, CliError> {
    let symbols: Vec<&str> = OPERATOR_SYMBOLS.iter().map(|(s, _)| *s).collect();
    loop {
        let question = format!("{name} operators ({}) [=]:", symbols.join(" "));
        let answer = ask(input, output, &question)?;
        if answer.is_empty() {
            return Ok(vec![Operator::Eq]);
        }
        let parsed: Option<Vec<Operator>> = answer
            .split(',')
            .map(|symbol| {
                OPERATOR_SYMBOLS
                    .iter()
                    .find(|(s, _)| *s == symbol.trim())
                    .map(|(_, op)| *op)
            })
            .collect();
        match parsed {
            Some(mut operators) => {
                operators.dedup();
                return Ok(operators);
            }
            None => writeln!(output, "unknown operator in '{answer}'")?,
        }
    }
}

fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<String, CliError> {
    write!(output, "{question} ")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(CliError::InvalidArgument(
            "input ended before the search was complete".to_string(),
        ));
    }
    Ok(line.trim().to_string())
}

/// Search command arguments
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Filter as key=value, e.g. `product_type=GEO` or `incidence_angle__gte=30` (repeatable)
    #[arg(short, long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, Value)>,

    /// Sort directives, e.g. `-datetime,+id`
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub sortby: Vec<String>,

    /// Maximum number of results (defaults to the configured limit)
    #[arg(long)]
    pub limit: Option<u64>,

    /// Result table columns (defaults to the configured columns)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Write results as GeoJSON feature collection to this file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Prompt for filters
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Start from the filters saved under this name
    #[arg(long)]
    pub saved_query: Option<String>,

    /// Save the filters of this search under this name
    #[arg(long)]
    pub save_query: Option<String>,

    /// Save the STAC ids found under this name
    #[arg(long)]
    pub save_results: Option<String>,
}

impl SearchArgs {
    /// Filters including limit and sort directives
    pub fn to_filters(&self, default_limit: u64) -> SearchFilters {
        self.build_filters(SearchFilters::new(), Vec::new(), default_limit)
    }

    /// `base` overridden by `prompted` and then `--filter` entries, plus limit and sort directives
    pub fn build_filters(
        &self,
        base: SearchFilters,
        prompted: Vec<(String, Value)>,
        default_limit: u64,
    ) -> SearchFilters {
        let mut filters = base;
        for (key, value) in prompted.into_iter().chain(self.filters.iter().cloned()) {
            filters.insert(key, value);
        }
        match self.limit {
            Some(limit) => filters.insert("limit", limit),
            None if !filters.contains("limit") => filters.insert("limit", default_limit),
            None => {}
        }
        if !self.sortby.is_empty() {
            filters = filters.sortby(self.sortby.iter().cloned());
        }
        filters
    }

    /// Execute the search command
    pub async fn execute(
        &self,
        client: &ConsoleClient,
        cache: &CliCache,
        format: OutputFormat,
    ) -> Result<(), CliError> {
        let settings = cache.load_settings();
        let base = match &self.saved_query {
            Some(name) => cache.saved_query(name)?,
            None => SearchFilters::new(),
        };
        let prompted = if self.interactive {
            prompt_filters(&mut std::io::stdin().lock(), &mut std::io::stderr())?
        } else {
            Vec::new()
        };
        let filters = self.build_filters(base, prompted, settings.effective_limit());
        if let Some(name) = &self.save_query {
            cache.save_query(name, &filters)?;
            info!("saved query as '{}'", name);
        }

        let result = client.search(&filters).await?;
        let request_body = serde_json::to_string(result.request_body())?;
        debug!(
            "search took {} page(s), request body: {}",
            result.page_count(),
            request_body
        );
        if let Some(name) = &self.save_results {
            cache.save_results(name, &result.stac_ids())?;
            info!("saved {} STAC ids as '{}'", result.len(), name);
        }

        if let Some(path) = &self.out {
            let json = serde_json::to_string_pretty(&result.to_feature_collection())?;
            std::fs::write(path, json)?;
            info!("wrote {} STAC items to {}", result.len(), path.display());
        }

        match format {
            OutputFormat::Json => print_json(&result.to_feature_collection()),
            OutputFormat::Human => {
                if result.is_empty() {
                    println!("found no STAC items matching your query");
                    return Ok(());
                }
                let columns = if self.columns.is_empty() {
                    settings.effective_columns()
                } else {
                    self.columns.clone()
                };
                let rows: Vec<Vec<String>> = result
                    .features()
                    .iter()
                    .map(|item| columns.iter().map(|c| column_value(item, c)).collect())
                    .collect();
                println!("{}", render_table(&columns, &rows));
                println!("\n{} STAC items", result.len());
                Ok(())
            }
        }
    }
}

/// Value of `column` for `item`; property fields are read by their STAC name
fn column_value(item: &StacItem, column: &str) -> String {
    match column {
        "id" => item.id.clone(),
        "collection" => item.collection.clone().unwrap_or_else(|| "n/a".to_string()),
        _ => {
            let wire_name = fields::lookup(column).map_or(column, |f| f.wire_name);
            cell_text(
                item.property(wire_name)
                    .or_else(|| item.property(column))
                    .or_else(|| item.extra.get(column)),
            )
        }
    }
}
