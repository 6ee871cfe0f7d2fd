pub mod flatten;
pub mod io;
pub mod pslsplit;
pub mod timeparse;

/// An in-memory tabular file: ordered column names plus string rows.
///
/// Missing cells are empty strings; every row always has one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from per-record key/value lists. Columns appear in
    /// first-seen order; records missing a column get an empty cell.
    pub fn from_records(records: &[Vec<(String, String)>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for rec in records {
            for (key, _) in rec {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for rec in records {
            let mut row = vec![String::new(); columns.len()];
            for (key, val) in rec {
                if let Some(idx) = columns.iter().position(|c| c == key) {
                    row[idx] = val.clone();
                }
            }
            rows.push(row);
        }

        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Move a column to the front, keeping every row aligned. Returns false
    /// when the column does not exist.
    pub fn move_column_first(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        if idx == 0 {
            return true;
        }
        let col = self.columns.remove(idx);
        self.columns.insert(0, col);
        for row in &mut self.rows {
            let cell = row.remove(idx);
            row.insert(0, cell);
        }
        true
    }

    /// Stable lexical sort by one column. Returns false when the column does
    /// not exist.
    pub fn sort_by_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.rows.sort_by(|a, b| a[idx].cmp(&b[idx]));
        true
    }

    /// Stable numeric sort by one column; cells that do not parse sort first.
    pub fn sort_by_column_numeric(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.rows
            .sort_by_key(|row| row[idx].parse::<i64>().unwrap_or(i64::MIN));
        true
    }

    /// Append another table, unioning columns; cells absent on either side
    /// become empty strings.
    pub fn concat(&mut self, other: Table) {
        for col in &other.columns {
            if !self.columns.contains(col) {
                self.columns.push(col.clone());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }

        for orow in other.rows {
            let mut row = vec![String::new(); self.columns.len()];
            for (ocol, cell) in other.columns.iter().zip(orow) {
                if let Some(idx) = self.column_index(ocol) {
                    row[idx] = cell;
                }
            }
            self.rows.push(row);
        }
    }

    /// Add a column with one value per existing row.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<String>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].clone()).collect())
    }
}
