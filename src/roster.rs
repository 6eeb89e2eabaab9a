use log::{debug, info, warn};

use leadership_tree::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use calamine::{open_workbook, Reader, Xlsx};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::roster::cache::ResultCache;

pub mod cache;
pub mod demo;
pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum RosterError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook has no usable worksheet"))]
    EmptyExcel {},
    #[snafu(display("Several worksheets are present, pass the worksheet name explicitly"))]
    AmbiguousWorksheet {},
    #[snafu(display("Excel cell of an unexpected type at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display(""))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("The roster has no header row"))]
    MissingHeader {},
    #[snafu(display("The roster header has no name column"))]
    MissingNameColumn {},
    #[snafu(display("Unknown input type {input_type}"))]
    UnknownInputType { input_type: String },
    #[snafu(display("Error writing the output file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The computed summary differs from the reference summary"))]
    ReferenceMismatch {},
    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type BRosterResult<T> = Result<T, Box<RosterError>>;

/// A roster row as produced by the readers, before any column has been
/// interpreted: the line number and the (header, cell) pairs of the
/// non-empty cells, in column order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedRow {
    pub lineno: u64,
    pub values: Vec<(String, String)>,
}

/// The roles a roster column can play.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum ColumnRole {
    Name,
    Level,
    Municipality,
    Neighborhood,
    Votes,
}

/// Resolves a header cell to a column role. This is the only place that
/// knows which column name means what; everything downstream of
/// [map_rows] works on typed fields.
fn column_role(header: &str) -> Option<ColumnRole> {
    match io_common::fold_header(header).as_str() {
        "nome" | "name" | "nomecompleto" => Some(ColumnRole::Name),
        "nivel" | "level" | "tipo" | "cargo" | "nivellideranca" => Some(ColumnRole::Level),
        "municipio" | "cidade" | "city" | "municipality" => Some(ColumnRole::Municipality),
        "bairro" | "neighborhood" | "zona" => Some(ColumnRole::Neighborhood),
        "votos" | "votes" | "votosprojetados" | "projecao" => Some(ColumnRole::Votes),
        _ => None,
    }
}

/// Maps parsed roster rows to the typed raw rows the engine consumes.
///
/// The first non-empty cell for a role wins when a roster repeats a
/// column. Unrecognized columns are ignored.
pub fn map_rows(headers: &[String], parsed: &[ParsedRow]) -> BRosterResult<Vec<RawRow>> {
    for header in headers.iter() {
        if column_role(header).is_none() && !header.is_empty() {
            debug!("map_rows: ignoring unrecognized column {:?}", header);
        }
    }
    if !headers.iter().any(|h| column_role(h) == Some(ColumnRole::Name)) {
        return Err(Box::new(RosterError::MissingNameColumn {}));
    }

    let mut res: Vec<RawRow> = Vec::new();
    for row in parsed.iter() {
        let mut raw = RawRow::default();
        for (header, cell) in row.values.iter() {
            let role = match column_role(header) {
                Some(r) => r,
                None => continue,
            };
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            match role {
                ColumnRole::Name => {
                    if raw.name.is_none() {
                        raw.name = Some(cell.to_string());
                    }
                }
                ColumnRole::Level => {
                    if raw.level.is_none() {
                        raw.level = Some(cell.to_string());
                    }
                }
                ColumnRole::Municipality => {
                    if raw.municipality.is_none() {
                        raw.municipality = Some(cell.to_string());
                    }
                }
                ColumnRole::Neighborhood => {
                    if raw.neighborhood.is_none() {
                        raw.neighborhood = Some(cell.to_string());
                    }
                }
                ColumnRole::Votes => {
                    if raw.votes.is_none() {
                        raw.votes = Some(cell.to_string());
                    }
                }
            }
        }
        debug!("map_rows: lineno {:?} mapped to {:?}", row.lineno, raw);
        res.push(raw);
    }
    Ok(res)
}

fn read_roster(args: &Args) -> BRosterResult<Vec<RawRow>> {
    let path = match &args.input {
        Some(p) => p.clone(),
        None => {
            return Err(Box::new(RosterError::Whatever {
                message: "no input file provided".to_string(),
                source: None,
            }))
        }
    };
    let input_type = match &args.input_type {
        Some(t) => t.clone(),
        None if path.to_lowercase().ends_with(".xlsx") => "xlsx".to_string(),
        None => "csv".to_string(),
    };
    info!(
        "read_roster: reading {:?} as {:?}",
        io_common::simplify_file_name(path.as_str()),
        input_type
    );
    let (headers, rows) = match input_type.as_str() {
        "csv" => io_csv::read_csv_roster(path)?,
        "xlsx" | "excel" => io_xlsx::read_xlsx_roster(path, args.excel_worksheet_name.clone())?,
        x => {
            return Err(Box::new(RosterError::UnknownInputType {
                input_type: x.to_string(),
            }))
        }
    };
    map_rows(&headers, &rows)
}

/// The provenance flags attached to every dashboard summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputFlags {
    #[serde(rename = "demoData")]
    pub demo_data: bool,
    pub degraded: bool,
}

fn node_to_json(node: &LeadershipNode) -> JSValue {
    // Depth is bounded by the engine's validator, plain recursion is fine
    // at this boundary.
    let children: Vec<JSValue> = node.children.iter().map(node_to_json).collect();
    json!({
        "id": node.id,
        "name": node.display_name,
        "level": node.level.label(),
        "municipality": node.municipality,
        "neighborhood": node.neighborhood,
        "projectedVotes": node.projected_votes,
        "subtreeVotes": node.subtree_votes,
        "synthesized": node.origin.is_synthesized(),
        "children": children,
    })
}

fn summary_to_json(result: &HierarchyResult) -> JSValue {
    let municipalities: Vec<JSValue> = result
        .summary
        .municipalities
        .iter()
        .map(|m| {
            let neighborhoods: Vec<JSValue> = m
                .neighborhoods
                .iter()
                .map(|n| json!({"name": n.name, "votes": n.votes}))
                .collect();
            json!({"name": m.name, "votes": m.votes, "neighborhoods": neighborhoods})
        })
        .collect();
    let mut levels: JSMap<String, JSValue> = JSMap::new();
    for ls in result.summary.levels.iter() {
        levels.insert(
            ls.level.label().to_string(),
            json!({"count": ls.records, "votes": ls.votes}),
        );
    }
    json!({
        "totalRecords": result.summary.total_records,
        "totalVotes": result.summary.total_votes,
        "averageVotes": result.summary.average_votes,
        "skippedRows": result.skipped_rows,
        "mergedRows": result.merged_rows,
        "synthesizedNodes": result.synthesized_nodes,
        "municipalities": municipalities,
        "levels": levels,
    })
}

fn build_dashboard_js(result: &HierarchyResult, flags: &OutputFlags) -> JSValue {
    let forest: Vec<JSValue> = result.roots.iter().map(node_to_json).collect();
    json!({
        "summary": summary_to_json(result),
        "forest": forest,
        "flags": flags,
    })
}

fn write_output(args: &Args, result_js: &JSValue) -> BRosterResult<()> {
    let pretty = serde_json::to_string_pretty(result_js).context(ParsingJsonSnafu {})?;
    match &args.out {
        Some(path) if path.as_str() != "stdout" => {
            fs::write(path, pretty.as_bytes()).context(WritingOutputSnafu { path: path.clone() })?;
            info!("write_output: wrote the summary to {:?}", path);
        }
        _ => {
            println!("{}", pretty);
        }
    }
    Ok(())
}

fn read_reference(path: String) -> BRosterResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn check_reference(path: String, computed: &JSValue) -> BRosterResult<()> {
    let reference = read_reference(path)?;
    let pretty_reference = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    let pretty_computed = serde_json::to_string_pretty(computed).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty_computed {
        warn!("check_reference: found differences with the reference file");
        print_diff(pretty_reference.as_str(), pretty_computed.as_str(), "\n");
        return Err(Box::new(RosterError::ReferenceMismatch {}));
    }
    Ok(())
}

/// Runs one tabulation: read the roster (or substitute the demonstration
/// data), build the forest, render and deliver the JSON summary.
///
/// The cache belongs to the caller; the engine itself is a pure function
/// and is only invoked when no fresh result is available.
pub fn run_tabulation(args: &Args, cache: &mut ResultCache) -> BRosterResult<()> {
    if let Some(cached) = cache.lookup(args.refresh) {
        info!("run_tabulation: serving the cached tabulation");
        return write_output(args, &cached);
    }

    let mut flags = OutputFlags {
        demo_data: false,
        degraded: false,
    };
    let rows: Vec<RawRow> = if args.demo {
        flags.demo_data = true;
        demo::demo_rows()
    } else {
        match read_roster(args) {
            Ok(rows) if rows.is_empty() => {
                warn!("run_tabulation: the roster is empty, substituting the demonstration data");
                flags.demo_data = true;
                demo::demo_rows()
            }
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "run_tabulation: could not read the roster ({}), substituting the demonstration data",
                    e
                );
                flags.demo_data = true;
                demo::demo_rows()
            }
        }
    };

    let result = match build_hierarchy(&rows, &HierarchyRules::DEFAULT_RULES) {
        Ok(r) => r,
        Err(e) => {
            // A corrupt forest must never be rendered. Fall back to the
            // demonstration roster and report degraded mode.
            warn!(
                "run_tabulation: structural defect in the forest ({}), degrading to the demonstration data",
                e
            );
            flags.demo_data = true;
            flags.degraded = true;
            match build_hierarchy(&demo::demo_rows(), &HierarchyRules::DEFAULT_RULES) {
                Ok(r) => r,
                Err(e2) => {
                    return Err(Box::new(RosterError::Whatever {
                        message: format!("the demonstration data failed to tabulate: {}", e2),
                        source: None,
                    }))
                }
            }
        }
    };

    let result_js = build_dashboard_js(&result, &flags);
    cache.store(result_js.clone());

    if let Some(reference_path) = &args.reference {
        check_reference(reference_path.clone(), &result_js)?;
    }

    write_output(args, &result_js)
}
