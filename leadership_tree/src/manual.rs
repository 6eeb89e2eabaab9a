/*!

This is the long-form manual for `leadership_tree` and `lidermap`.

## Input

The engine consumes a flat roster: one row per canvasser or leader, in
spreadsheet order. The command line tool reads CSV and Excel (`.xlsx`)
files whose first row is a header; the following column names are
recognized (case-insensitive, accents tolerated):

| field        | accepted headers                                   |
|--------------|----------------------------------------------------|
| name         | `nome`, `name`, `nome completo`                    |
| level        | `nivel`, `nível`, `level`, `tipo`, `cargo`         |
| municipality | `municipio`, `município`, `cidade`, `city`, `municipality` |
| neighborhood | `bairro`, `neighborhood`, `zona`                   |
| votes        | `votos`, `votes`, `votos projetados`, `projecao`, `projeção` |

Unrecognized columns are ignored. A row without a usable name is skipped
and counted; it is never an error.

## Level tags

The level column is free text. It is normalized to one of the seven
canonical ranks `candidate`, `leader`, `level1` .. `level5`:

* `candidato` maps to the candidate rank;
* `lideranca` (or `liderança`) maps to the plain leader rank;
* `lideranca n3`, `liderancanivel3`, `nível 3` and any other text carrying
  a level marker map to the rank named by the last digit;
* anything else, including out-of-range digits, defaults to the plain
  leader rank.

## Pipeline

Each tabulation runs the same eight stages over the complete roster:
classification, level bucketing, placeholder synthesis (fabricated nodes
keep the tree connected when an intermediate level has no data), tree
linking (same-municipality parents preferred, round-robin otherwise),
bottom-up vote aggregation, a completeness audit, statistics compilation
and a structural validation. The output is a forest of exclusively-owned
nodes plus per-municipality, per-neighborhood and per-level totals.

The engine is a pure function of its input: no state is carried between
calls, and the same roster always produces the same forest.

## Running the command line tool

```bash
lidermap -i roster.xlsx --out summary.json
```

The summary is written in JSON format. When the roster cannot be read or
is empty, a built-in demonstration roster is tabulated instead and the
output is flagged with `"demoData": true`.

*/
