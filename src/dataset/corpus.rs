// Copyright 2019 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::common::error::StanceError;
use std::fs::File;
use std::path::Path;

/// A raw annotated sentence read from the source corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct StanceExample {
    /// Sentence text
    pub sentence: String,
    /// Binary stance label (0 or 1)
    pub label: i64,
}

/// # Column layout of an annotated CSV file
///
/// Stance corpora do not share a common header convention (the vaccine
/// attitude corpus labels its annotation column `Best_label_attitude`), so
/// the text and label columns are located by header name.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    /// Header of the column holding the sentence text
    pub text_column: String,
    /// Header of the column holding the binary label
    pub label_column: String,
    /// Field delimiter (`b'\t'` for TSV corpora such as SST-2)
    pub delimiter: u8,
}

impl Default for CsvFormat {
    fn default() -> CsvFormat {
        CsvFormat {
            text_column: String::from("sentence"),
            label_column: String::from("label"),
            delimiter: b',',
        }
    }
}

/// Reads an annotated corpus from a delimited file.
///
/// Labels must parse as integers in {0, 1}; any other value aborts the read
/// with an `InvalidDatasetError` naming the offending line.
///
/// # Arguments
///
/// * `path` - Location of the CSV/TSV file. A header row is required.
/// * `format` - `CsvFormat` describing the column headers and delimiter.
///
/// # Returns
///
/// * `Vec<StanceExample>` with one entry per data row.
pub fn read_stance_csv<P: AsRef<Path>>(
    path: P,
    format: &CsvFormat,
) -> Result<Vec<StanceExample>, StanceError> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(format.delimiter)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let text_index = headers
        .iter()
        .position(|header| header == format.text_column)
        .ok_or_else(|| {
            StanceError::InvalidConfigurationError(format!(
                "Column `{}` not found in CSV headers",
                format.text_column
            ))
        })?;
    let label_index = headers
        .iter()
        .position(|header| header == format.label_column)
        .ok_or_else(|| {
            StanceError::InvalidConfigurationError(format!(
                "Column `{}` not found in CSV headers",
                format.label_column
            ))
        })?;

    let mut examples = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record
            .position()
            .map(|position| position.line())
            .unwrap_or_default();
        let sentence = record.get(text_index).unwrap_or_default().to_string();
        let raw_label = record.get(label_index).unwrap_or_default().trim();
        let label = raw_label.parse::<i64>().map_err(|_| {
            StanceError::InvalidDatasetError(format!(
                "Label `{}` at line {} is not an integer",
                raw_label, line
            ))
        })?;
        if label != 0 && label != 1 {
            return Err(StanceError::InvalidDatasetError(format!(
                "Label {} at line {} is outside the supported {{0, 1}} set",
                label, line
            )));
        }
        examples.push(StanceExample { sentence, label });
    }
    Ok(examples)
}

/// Counts examples per label, index 0 holding the count for label 0.
pub fn label_distribution(examples: &[StanceExample]) -> [usize; 2] {
    let mut counts = [0usize; 2];
    for example in examples {
        counts[example.label as usize] += 1;
    }
    counts
}
