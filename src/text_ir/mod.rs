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

//! A small front end for the line-oriented textual IR notation (§3.1),
//! standing in for the real MPL parser: a `pest` grammar drives
//! [`parse_program`], and [`lower::lower`] walks the resulting pairs once
//! to populate an [`crate::ir::IrContainer`].

pub mod lower;

use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::errors::CoreError;

#[derive(PestParser)]
#[grammar = "text_ir/grammar.pest"]
pub struct TextIrParser;

pub fn parse_program(text: &str) -> Result<Pairs<'_, Rule>, CoreError> {
    Ok(TextIrParser::parse(Rule::program, text)?)
}
