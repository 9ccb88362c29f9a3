/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Translation-unit loading and parsing.

use crate::ast::TranslationUnit;
use crate::diagnostics::ConvertError;
use crate::parser::parse_translation_unit;
use std::path::Path;

/// One parsed translation unit with its source text and path label.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path label used in persistent locations and diagnostics.
    pub path: String,
    /// Full original source text.
    pub source: String,
    /// Parsed AST.
    pub unit: TranslationUnit,
}

impl SourceUnit {
    /// Parses one in-memory source into a unit.
    pub fn from_source(
        path: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, ConvertError> {
        let path = path.into();
        let source = source.into();
        let unit = parse_translation_unit(&source, &path)?;
        Ok(Self { path, source, unit })
    }

    /// Reads and parses one translation unit from disk.
    pub fn from_path(path: &Path) -> Result<Self, ConvertError> {
        let label = path.to_string_lossy().to_string();
        let source = std::fs::read_to_string(path).map_err(|err| ConvertError::Io {
            path: label.clone(),
            message: err.to_string(),
        })?;
        Self::from_source(label, source)
    }
}
