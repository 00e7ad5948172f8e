// SPDX-License-Identifier: Apache-2.0

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{BackendError, SheetGenerator};

const HEADER: [&str; 6] = ["id", "first_name", "last_name", "email", "city", "phone"];
const FIRST_NAMES: &[&str] = &[
    "Anna", "Bjorn", "Clara", "David", "Elin", "Farid", "Greta", "Hugo", "Ines", "Jonas", "Karin",
    "Lukas", "Maja", "Nils", "Olga", "Pavel", "Rosa", "Sven", "Tilde", "Viktor",
];
const LAST_NAMES: &[&str] = &[
    "Andersson", "Berg", "Carlsson", "Dahl", "Eklund", "Forsberg", "Gustafsson", "Holm", "Isaksson",
    "Johansson", "Karlsson", "Lindqvist", "Magnusson", "Nyberg", "Olsson", "Persson", "Svensson",
];
const CITIES: &[&str] = &[
    "Stockholm", "Goteborg", "Malmo", "Uppsala", "Vasteras", "Orebro", "Linkoping", "Helsingborg",
    "Umea", "Lund",
];
const DUPLICATE_RATE: f64 = 0.2;
const SHARED_RATE: f64 = 0.5;

type Row = [String; 5];

/// Synthetic people lists with injected near-duplicates (typos, case
/// changes, stray whitespace).
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    max_rows: usize,
    seed: Option<u64>,
}

impl SyntheticGenerator {
    #[must_use]
    pub fn new(max_rows: usize) -> Self {
        Self {
            max_rows,
            seed: None,
        }
    }

    /// Every call produces the same output for the same seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    fn check_rows(&self, rows: usize) -> Result<(), BackendError> {
        if rows == 0 || rows > self.max_rows {
            return Err(BackendError(format!(
                "row count must be between 1 and {} (got {rows})",
                self.max_rows
            )));
        }
        Ok(())
    }
}

impl SheetGenerator for SyntheticGenerator {
    fn generate(&self, rows: usize, dir: &Path, filename: &str) -> Result<PathBuf, BackendError> {
        self.check_rows(rows)?;
        let mut rng = self.rng();
        let table = people_with_duplicates(&mut rng, rows);
        let path = dir.join(filename);
        write_table(&path, &table)?;
        info!(rows, path = %path.display(), "generated spreadsheet");
        Ok(path)
    }

    fn generate_two(
        &self,
        rows: usize,
        dir: &Path,
        filenames: [&str; 2],
    ) -> Result<(PathBuf, PathBuf), BackendError> {
        self.check_rows(rows)?;
        let mut rng = self.rng();
        let first = people_with_duplicates(&mut rng, rows);
        let second: Vec<Row> = (0..rows)
            .map(|_| {
                if rng.random_bool(SHARED_RATE) {
                    let source = &first[rng.random_range(0..first.len())];
                    perturb(&mut rng, source)
                } else {
                    person(&mut rng)
                }
            })
            .collect();

        let left = dir.join(filenames[0]);
        let right = dir.join(filenames[1]);
        write_table(&left, &first)?;
        write_table(&right, &second)?;
        info!(rows, left = %left.display(), right = %right.display(), "generated spreadsheet pair");
        Ok((left, right))
    }
}

fn pick<'a>(rng: &mut StdRng, values: &[&'a str]) -> &'a str {
    values[rng.random_range(0..values.len())]
}

fn person(rng: &mut StdRng) -> Row {
    let first = pick(rng, FIRST_NAMES);
    let last = pick(rng, LAST_NAMES);
    let email = format!(
        "{}.{}{}@example.com",
        first.to_lowercase(),
        last.to_lowercase(),
        rng.random_range(1..100)
    );
    let phone = format!(
        "07{}-{:03} {:02} {:02}",
        rng.random_range(0..10),
        rng.random_range(0..1000),
        rng.random_range(0..100),
        rng.random_range(0..100)
    );
    [
        first.to_string(),
        last.to_string(),
        email,
        pick(rng, CITIES).to_string(),
        phone,
    ]
}

fn people_with_duplicates(rng: &mut StdRng, rows: usize) -> Vec<Row> {
    let mut table: Vec<Row> = Vec::with_capacity(rows);
    for _ in 0..rows {
        let row = if !table.is_empty() && rng.random_bool(DUPLICATE_RATE) {
            let source = table[rng.random_range(0..table.len())].clone();
            perturb(rng, &source)
        } else {
            person(rng)
        };
        table.push(row);
    }
    table
}

/// Copy of `row` with one text field slightly damaged.
fn perturb(rng: &mut StdRng, row: &Row) -> Row {
    let mut out = row.clone();
    let field = rng.random_range(0..4);
    let value = out[field].clone();
    out[field] = match rng.random_range(0..4) {
        0 => value.to_uppercase(),
        1 => format!(" {value}  "),
        2 if value.len() > 2 => {
            let at = rng.random_range(1..value.len());
            let mut s = value.clone();
            s.remove(at);
            s
        }
        _ if value.len() > 1 => {
            let mut chars: Vec<char> = value.chars().collect();
            let at = rng.random_range(0..chars.len() - 1);
            chars.swap(at, at + 1);
            chars.into_iter().collect()
        }
        _ => value.to_lowercase(),
    };
    out
}

fn write_table(path: &Path, rows: &[Row]) -> Result<(), BackendError> {
    let err = |e: csv::Error| BackendError(format!("write {}: {e}", path.display()));
    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    writer.write_record(HEADER).map_err(err)?;
    for (index, row) in rows.iter().enumerate() {
        let id = (index + 1).to_string();
        writer
            .write_record(std::iter::once(id.as_str()).chain(row.iter().map(String::as_str)))
            .map_err(err)?;
    }
    writer
        .flush()
        .map_err(|e| BackendError(format!("flush {}: {e}", path.display())))
}
