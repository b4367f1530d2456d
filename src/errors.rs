/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use thiserror::Error;

/// Every fallible outcome the pipeline can produce, from IR construction
/// through emission. Warnings are collected separately (see [`Warning`])
/// and never appear here.
#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    #[error("Construction Error: {field} was already set")]
    AlreadySet { field: &'static str },

    #[error("Construction Error: {reason}")]
    InvalidConstruction { reason: String },

    #[error("Duplicate object name: {0}")]
    DuplicateName(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Attempt to register an object with an empty name")]
    Unnamed,

    #[error("Invalid storage class for {name}: {reason}")]
    InvalidStorageClass { name: String, reason: String },

    #[error("Invalid target mode: {0}")]
    InvalidMode(String),

    #[error("Invalid width for {name} in this mode: {reason}")]
    InvalidWidth { name: String, reason: String },

    #[error("Routine {0} has no instructions")]
    EmptyRoutine(String),

    #[error("Basic block in routine {routine} is empty")]
    EmptyBlock { routine: String },

    #[error("Unknown opcode encountered during {pass}")]
    UnknownOpcode { pass: &'static str },

    #[error("Bad operand cast in {context}: expected {expected}")]
    BadCast { context: String, expected: &'static str },

    #[error("Syntax Error: {0}")]
    ParseError(#[from] pest::error::Error<crate::text_ir::Rule>),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal diagnostic. Collected by every pass into a shared list and
/// surfaced to the caller alongside a successful result; never aborts the
/// pipeline on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub pass: &'static str,
    pub object: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(pass: &'static str, message: impl Into<String>) -> Self {
        Self { pass, object: None, message: message.into() }
    }

    pub fn on(pass: &'static str, object: impl Into<String>, message: impl Into<String>) -> Self {
        Self { pass, object: Some(object.into()), message: message.into() }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.object {
            Some(obj) => write!(f, "[{}] {}: {}", self.pass, obj, self.message),
            None => write!(f, "[{}] {}", self.pass, self.message),
        }
    }
}
