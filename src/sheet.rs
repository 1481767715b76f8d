use crate::status::is_blank;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug)]
pub enum SheetError {
    Io(io::Error),
    Csv(csv::Error),
    #[cfg(feature = "xlsx")]
    Spreadsheet(calamine::Error),
    Unsupported(String),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::Io(err) => write!(f, "io error: {err}"),
            SheetError::Csv(err) => write!(f, "csv error: {err}"),
            #[cfg(feature = "xlsx")]
            SheetError::Spreadsheet(err) => write!(f, "spreadsheet error: {err}"),
            SheetError::Unsupported(msg) => write!(f, "unsupported input: {msg}"),
        }
    }
}

impl std::error::Error for SheetError {}

impl From<io::Error> for SheetError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for SheetError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

#[cfg(feature = "xlsx")]
impl From<calamine::Error> for SheetError {
    fn from(value: calamine::Error) -> Self {
        Self::Spreadsheet(value)
    }
}

pub type SheetResult<T> = Result<T, SheetError>;

/// One raw, loosely-typed sheet: a header row and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows,
        }
    }

    /// Convenience constructor for literal tables.
    pub fn from_rows(name: impl Into<String>, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> SheetResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(name, headers, rows))
    }

    pub fn from_csv_str(name: impl Into<String>, text: &str) -> SheetResult<Self> {
        Self::from_csv_reader(name, text.as_bytes())
    }

    pub fn from_csv_path<P: AsRef<Path>>(name: impl Into<String>, path: P) -> SheetResult<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(name, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first header matching any alias (trimmed, case-insensitive).
    /// Aliases are tried in order so the first alias wins over later ones.
    pub fn column_index<S: AsRef<str>>(&self, aliases: &[S]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            let alias = alias.as_ref().trim();
            self.headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(alias))
        })
    }

    /// Trimmed cell text; `None` for out-of-range or blank cells.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(|cell| cell.trim())
            .filter(|cell| !is_blank(cell))
    }
}

/// An ordered collection of named sheets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<SheetTable>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sheets(sheets: Vec<SheetTable>) -> Self {
        Self { sheets }
    }

    pub fn push(&mut self, sheet: SheetTable) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[SheetTable] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(SheetTable::name).collect()
    }

    /// Sheet lookup by trimmed, case-insensitive name.
    pub fn sheet(&self, name: &str) -> Option<&SheetTable> {
        let name = name.trim();
        self.sheets
            .iter()
            .find(|sheet| sheet.name().trim().eq_ignore_ascii_case(name))
    }

    /// Opens a spreadsheet file, a directory of CSV files (one sheet per file,
    /// named by file stem) or a single CSV file.
    pub fn open<P: AsRef<Path>>(path: P) -> SheetResult<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::open_csv_dir(path);
        }
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => {
                let sheet = SheetTable::from_csv_path(file_stem(path), path)?;
                Ok(Self::from_sheets(vec![sheet]))
            }
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::open_spreadsheet(path),
            other => Err(SheetError::Unsupported(format!(
                "'{}' has unsupported extension '{other}'",
                path.display()
            ))),
        }
    }

    fn open_csv_dir(dir: &Path) -> SheetResult<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if path.is_file() && is_csv {
                paths.push(path);
            }
        }
        paths.sort();

        let mut workbook = Self::new();
        for path in paths {
            workbook.push(SheetTable::from_csv_path(file_stem(&path), &path)?);
        }
        tracing::debug!(dir = %dir.display(), sheets = workbook.sheets.len(), "loaded csv sheets");
        Ok(workbook)
    }

    #[cfg(feature = "xlsx")]
    fn open_spreadsheet(path: &Path) -> SheetResult<Self> {
        use calamine::{Reader, open_workbook_auto};

        let mut source = open_workbook_auto(path)?;
        let mut workbook = Self::new();
        for name in source.sheet_names() {
            let range = source.worksheet_range(&name)?;
            let mut rows = range
                .rows()
                .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
                .skip_while(|row| row.iter().all(|cell| cell.trim().is_empty()));
            let headers = rows.next().unwrap_or_default();
            workbook.push(SheetTable::new(name, headers, rows.collect()));
        }
        tracing::debug!(path = %path.display(), sheets = ?workbook.sheet_names(), "loaded spreadsheet");
        Ok(workbook)
    }

    #[cfg(not(feature = "xlsx"))]
    fn open_spreadsheet(path: &Path) -> SheetResult<Self> {
        Err(SheetError::Unsupported(format!(
            "'{}' needs the xlsx feature",
            path.display()
        )))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(feature = "xlsx")]
fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|value| value.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
