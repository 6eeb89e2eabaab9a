// The built-in demonstration roster. The calling layer substitutes it when
// the real roster cannot be read or is empty, so the dashboard always has a
// forest to render; the output is flagged so nobody mistakes it for real
// data.

use leadership_tree::RawRow;

fn demo_row(name: &str, level: &str, municipality: &str, neighborhood: &str, votes: &str) -> RawRow {
    RawRow {
        name: Some(name.to_string()),
        level: Some(level.to_string()),
        municipality: Some(municipality.to_string()),
        neighborhood: Some(neighborhood.to_string()),
        votes: Some(votes.to_string()),
    }
}

pub fn demo_rows() -> Vec<RawRow> {
    vec![
        demo_row("Ana Martins", "candidato", "Teresina", "Centro", "0"),
        demo_row("Bruno Carvalho", "lideranca", "Teresina", "Centro", "850"),
        demo_row("Carla Sousa", "lideranca", "Picos", "Junco", "430"),
        demo_row("Diego Ferreira", "lideranca n1", "Teresina", "Dirceu", "220"),
        demo_row("Elisa Andrade", "lideranca n1", "Picos", "Centro", "180"),
        demo_row("Fabio Lima", "lideranca nivel 2", "Teresina", "Mocambinho", "95"),
        demo_row("Gabriela Rocha", "nivel 2", "Parnaiba", "Frei Higino", "60"),
        demo_row("Heitor Nunes", "nivel 3", "Teresina", "Dirceu", "40"),
        demo_row("Iara Campos", "nivel 3", "Picos", "Ipueiras", "35"),
        demo_row("Joao Batista", "nivel 4", "Teresina", "Angelim", "20"),
        demo_row("Karina Melo", "nivel 5", "Teresina", "Centro", "10"),
    ]
}
