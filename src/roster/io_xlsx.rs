// Primitives for reading Excel rosters.

use calamine::DataType;

use crate::roster::*;

/// Reads an Excel roster: the first row of the selected worksheet is the
/// header, every following row becomes one parsed row carrying its
/// non-empty cells.
pub fn read_xlsx_roster(
    path: String,
    worksheet_name: Option<String>,
) -> BRosterResult<(Vec<String>, Vec<ParsedRow>)> {
    let wrange = get_range(&path, worksheet_name)?;

    let header_row = wrange.rows().next().context(EmptyExcelSnafu {})?;
    // Non-text header cells keep their position with an empty name so the
    // cells below them stay aligned.
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| match cell {
            calamine::DataType::String(s) => s.trim().to_string(),
            _ => String::new(),
        })
        .collect();
    debug!("read_xlsx_roster: header: {:?}", headers);

    let mut iter = wrange.rows();
    iter.next();
    let mut rows: Vec<ParsedRow> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = (idx + 2) as u64;
        let mut values: Vec<(String, String)> = Vec::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            if let Some(text) = cell_to_text(cell, lineno)? {
                if !text.trim().is_empty() {
                    values.push((header.clone(), text));
                }
            }
        }
        debug!("read_xlsx_roster: lineno: {:?} row: {:?}", lineno, values);
        rows.push(ParsedRow { lineno, values });
    }
    Ok((headers, rows))
}

fn cell_to_text(cell: &calamine::DataType, lineno: u64) -> BRosterResult<Option<String>> {
    match cell {
        calamine::DataType::String(s) => Ok(Some(s.clone())),
        calamine::DataType::Float(f) => Ok(Some(format!("{}", f))),
        calamine::DataType::Int(i) => Ok(Some(format!("{}", i))),
        calamine::DataType::Bool(b) => Ok(Some(format!("{}", b))),
        calamine::DataType::Empty => Ok(None),
        _ => Err(Box::new(RosterError::ExcelWrongCellType {
            lineno,
            content: format!("{:?}", cell),
        })),
    }
}

fn get_range(
    path: &String,
    worksheet_name_o: Option<String>,
) -> BRosterResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let p = path.clone();
    let mut workbook: Xlsx<_> =
        open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(RosterError::EmptyExcel {})),
            [(worksheet_name, wrange)] => {
                debug!(
                    "get_range: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => Err(Box::new(RosterError::AmbiguousWorksheet {})),
        }
    }
}
