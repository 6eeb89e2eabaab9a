use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Folds a header cell for comparison: lower-cases, strips the accents seen
/// in roster exports and drops separators.
pub fn fold_header(header: &str) -> String {
    let mut folded = String::new();
    for c in header.to_lowercase().chars() {
        match c {
            'á' | 'à' | 'â' | 'ã' => folded.push('a'),
            'é' | 'ê' => folded.push('e'),
            'í' => folded.push('i'),
            'ó' | 'ô' | 'õ' => folded.push('o'),
            'ú' => folded.push('u'),
            'ç' => folded.push('c'),
            ' ' | '\t' | '_' | '-' | '.' => {}
            _ => folded.push(c),
        }
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_accents_and_separators() {
        assert_eq!(fold_header("Município"), "municipio");
        assert_eq!(fold_header("Nível"), "nivel");
        assert_eq!(fold_header("Votos Projetados"), "votosprojetados");
        assert_eq!(fold_header("nome_completo"), "nomecompleto");
        assert_eq!(fold_header("Projeção"), "projecao");
    }

    #[test]
    fn simplifies_paths() {
        assert_eq!(simplify_file_name("/tmp/data/roster.csv"), "roster.csv");
        assert_eq!(simplify_file_name("roster.csv"), "roster.csv");
    }
}
