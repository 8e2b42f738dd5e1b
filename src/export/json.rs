//! JSON import/export for question banks and dashboard reports.
//! Reports are any serializable engine output: due queues, review stats,
//! skill summaries.

use crate::error::Result;
use crate::models::QuestionBank;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// Writes a question bank to a JSON file at the specified path.
pub fn export_question_bank(bank: &QuestionBank, path: impl AsRef<Path>) -> Result<()> {
    export_report(bank, path)
}

/// Reads a question bank from a JSON file.
/// Accepts either `{"questions": [...]}` or a bare array of questions.
pub fn import_question_bank(path: impl AsRef<Path>) -> Result<QuestionBank> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let value: serde_json::Value = serde_json::from_reader(reader)?;

    let bank = if value.is_array() {
        QuestionBank::new(serde_json::from_value(value)?)
    } else {
        serde_json::from_value(value)?
    };

    tracing::info!(path = %path.display(), questions = bank.len(), "question bank imported");
    Ok(bank)
}

/// Pretty-prints any serializable report to `path`.
pub fn export_report<T: Serialize + ?Sized>(report: &T, path: impl AsRef<Path>) -> Result<()> {
    let json_string = serde_json::to_string_pretty(report)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}
