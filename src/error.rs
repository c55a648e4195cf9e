// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    ConstraintViolation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type DataResult<T> = std::result::Result<T, DataError>;

impl DataError {
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        DataError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        DataError::InvalidInput(msg.into())
    }
}

/// True when SQLite rejected a write because of a UNIQUE, FOREIGN KEY or
/// CHECK constraint.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// `{success, error}` result handed to the presentation layer for guarded
/// writes such as deletes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        ActionOutcome {
            success: true,
            error: None,
        }
    }
}

impl<T> From<DataResult<T>> for ActionOutcome {
    fn from(res: DataResult<T>) -> Self {
        match res {
            Ok(_) => ActionOutcome::ok(),
            Err(e) => ActionOutcome {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}
