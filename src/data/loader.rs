use crate::data::{FeatureMatrix, TabularDataset};
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Csv,
    Tsv,
    GzippedCsv,
    GzippedTsv,
}

impl FileFormat {
    /// Detect file format from path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str());
        let stem = path.file_stem().and_then(|s| s.to_str());

        match (ext, stem) {
            (Some("gz"), Some(stem)) => {
                if stem.ends_with(".csv") {
                    Ok(FileFormat::GzippedCsv)
                } else if stem.ends_with(".tsv") || stem.ends_with(".txt") {
                    Ok(FileFormat::GzippedTsv)
                } else {
                    bail!("Cannot determine format of gzipped file")
                }
            }
            (Some("csv"), _) => Ok(FileFormat::Csv),
            (Some("tsv"), _) | (Some("txt"), _) => Ok(FileFormat::Tsv),
            _ => bail!("Unsupported file format"),
        }
    }

    /// Get delimiter character
    pub fn delimiter(&self) -> u8 {
        match self {
            FileFormat::Csv | FileFormat::GzippedCsv => b',',
            FileFormat::Tsv | FileFormat::GzippedTsv => b'\t',
        }
    }

    /// Check if format is gzipped
    pub fn is_gzipped(&self) -> bool {
        matches!(self, FileFormat::GzippedCsv | FileFormat::GzippedTsv)
    }
}

/// Tabular loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Whether the file has a header row
    pub has_header: bool,
    /// Name of the target column; `None` means the last column
    pub target_column: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            has_header: true,
            target_column: None,
        }
    }
}

/// Loader for numeric tabular files (features plus one target column)
pub struct TabularLoader {
    config: LoaderConfig,
}

impl TabularLoader {
    /// Create new loader with default config
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    /// Create new loader with custom config
    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load a dataset from file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<TabularDataset> {
        let path = path.as_ref();
        info!("Loading data from {:?}", path);

        let format = FileFormat::from_path(path)?;
        debug!("Detected file format: {:?}", format);

        let dataset = if format.is_gzipped() {
            self.load_gzipped(path, format)?
        } else {
            self.load_plain(path, format)?
        };

        info!(
            "Loaded {} rows with {} features",
            dataset.len(),
            dataset.features.cols()
        );
        Ok(dataset)
    }

    /// Load from plain file
    fn load_plain<P: AsRef<Path>>(&self, path: P, format: FileFormat) -> Result<TabularDataset> {
        let file = File::open(path).context("Failed to open file")?;
        let reader = BufReader::new(file);
        self.parse_rows(reader, format)
    }

    /// Load from gzipped file
    fn load_gzipped<P: AsRef<Path>>(&self, path: P, format: FileFormat) -> Result<TabularDataset> {
        let file = File::open(path).context("Failed to open gzipped file")?;
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        self.parse_rows(reader, format)
    }

    /// Parse rows from reader
    fn parse_rows<R: Read>(&self, reader: R, format: FileFormat) -> Result<TabularDataset> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(self.config.has_header)
            .from_reader(reader);

        let headers = if self.config.has_header {
            csv_reader
                .headers()?
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        debug!("Headers: {:?}", headers);

        let target_index = self.resolve_target_index(&headers)?;

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        let mut line = if self.config.has_header { 1 } else { 0 };

        for result in csv_reader.records() {
            let record = result.context("Failed to parse record")?;
            line += 1;

            match parse_numeric_row(&record, target_index) {
                Ok((features, target)) => {
                    rows.push(features);
                    targets.push(target);
                }
                Err(e) => {
                    warn!("Skipping line {}: {}", line, e);
                }
            }
        }

        if rows.is_empty() {
            bail!("No parseable rows found");
        }

        let features = FeatureMatrix::from_rows(rows)?;
        TabularDataset::new(features, targets)
    }

    /// Resolve the target column index; headers are required to address it by name
    fn resolve_target_index(&self, headers: &[String]) -> Result<Option<usize>> {
        match &self.config.target_column {
            Some(name) => {
                let index = headers
                    .iter()
                    .position(|h| h == name)
                    .with_context(|| format!("Target column not found: {}", name))?;
                Ok(Some(index))
            }
            // last column by position
            None => Ok(None),
        }
    }
}

impl Default for TabularLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one record into (features, target); `target_index = None` takes the last column
fn parse_numeric_row(
    record: &csv::StringRecord,
    target_index: Option<usize>,
) -> Result<(Vec<f32>, f32)> {
    if record.len() < 2 {
        bail!("expected at least two columns, got {}", record.len());
    }

    let target_index = target_index.unwrap_or(record.len() - 1);
    if target_index >= record.len() {
        bail!("target column index {} out of range", target_index);
    }

    let mut features = Vec::with_capacity(record.len() - 1);
    let mut target = None;

    for (i, field) in record.iter().enumerate() {
        let value: f32 = field
            .trim()
            .parse()
            .with_context(|| format!("non-numeric value in column {}: {:?}", i, field))?;
        if value.is_nan() || value.is_infinite() {
            bail!("non-finite value in column {}", i);
        }

        if i == target_index {
            target = Some(value);
        } else {
            features.push(value);
        }
    }

    match target {
        Some(target) => Ok((features, target)),
        None => bail!("row is missing its target column"),
    }
}
