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

use rust_bert::RustBertError;
use rust_tokenizers::error::TokenizerError;
use tch::TchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StanceError {
    #[error("IO error: {0}")]
    IOError(String),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("Tch tensor error: {0}")]
    TchError(String),

    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration error: {0}")]
    InvalidConfigurationError(String),

    #[error("Invalid dataset error: {0}")]
    InvalidDatasetError(String),
}

impl From<std::io::Error> for StanceError {
    fn from(error: std::io::Error) -> Self {
        StanceError::IOError(error.to_string())
    }
}

impl From<csv::Error> for StanceError {
    fn from(error: csv::Error) -> Self {
        StanceError::CsvError(error.to_string())
    }
}

impl From<TchError> for StanceError {
    fn from(error: TchError) -> Self {
        StanceError::TchError(error.to_string())
    }
}

impl From<TokenizerError> for StanceError {
    fn from(error: TokenizerError) -> Self {
        StanceError::TokenizerError(error.to_string())
    }
}

impl From<RustBertError> for StanceError {
    fn from(error: RustBertError) -> Self {
        StanceError::ModelError(error.to_string())
    }
}

impl From<serde_json::Error> for StanceError {
    fn from(error: serde_json::Error) -> Self {
        StanceError::SerializationError(error.to_string())
    }
}
