use clap::Parser;

/// This is a campaign leadership tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The roster file with the leadership records. CSV and Excel
    /// (.xlsx) files are supported.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default inferred from the file extension) The type of the input: 'csv'
    /// or 'xlsx'.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the dashboard summary will
    /// be written in JSON format to the given location instead of the standard
    /// output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected tabulation in JSON
    /// format. If provided, lidermap will check that the computed output
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default single worksheet) When using an Excel file, indicates the name
    /// of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// If passed as an argument, recompute the forest even when a cached
    /// result is still fresh.
    #[clap(long, takes_value = false)]
    pub refresh: bool,

    /// If passed as an argument, skip reading any input and tabulate the
    /// built-in demonstration roster.
    #[clap(long, takes_value = false)]
    pub demo: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard
    /// output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
