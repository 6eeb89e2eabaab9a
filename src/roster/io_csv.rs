// Primitives for reading CSV rosters.

use crate::roster::{io_common::simplify_file_name, *};

/// Reads a CSV roster: the first line is the header, every following line
/// becomes one parsed row carrying its non-empty cells.
pub fn read_csv_roster(path: String) -> BRosterResult<(Vec<String>, Vec<ParsedRow>)> {
    debug!("read_csv_roster: {:?}", simplify_file_name(path.as_str()));
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.clone())
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();

    let header_record = match records.next() {
        Some(r) => r.context(CsvLineParseSnafu {})?,
        None => return Err(Box::new(RosterError::MissingHeader {})),
    };
    let headers: Vec<String> = header_record.iter().map(|s| s.trim().to_string()).collect();
    debug!("read_csv_roster: header: {:?}", headers);

    let mut rows: Vec<ParsedRow> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1, the first record is line 2.
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_roster: lineno: {:?} row: {:?}", lineno, line);
        let values: Vec<(String, String)> = headers
            .iter()
            .cloned()
            .zip(line.iter().map(|s| s.to_string()))
            .filter(|(_, cell)| !cell.trim().is_empty())
            .collect();
        rows.push(ParsedRow { lineno, values });
    }
    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_roster_file() {
        let path = std::env::temp_dir().join("lidermap_io_csv_test.csv");
        std::fs::write(
            &path,
            "Nome,Município,Votos\nAna,Teresina,10\nBruno,,20\n",
        )
        .unwrap();
        let (headers, rows) = read_csv_roster(path.to_str().unwrap().to_string()).unwrap();
        assert_eq!(headers, vec!["Nome", "Município", "Votos"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].lineno, 2);
        assert_eq!(
            rows[0].values,
            vec![
                ("Nome".to_string(), "Ana".to_string()),
                ("Município".to_string(), "Teresina".to_string()),
                ("Votos".to_string(), "10".to_string()),
            ]
        );
        // The empty municipality cell is dropped.
        assert_eq!(rows[1].values.len(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let res = read_csv_roster("/nonexistent/lidermap.csv".to_string());
        assert!(res.is_err());
    }
}
