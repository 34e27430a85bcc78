// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Query document parser.
//!
//! Accepts the read-only subset of GraphQL the catalog engine serves:
//!
//! ```text
//! query Name {
//!   alias: field(arg: "value", other: 3) {
//!     nested
//!   }
//! }
//! ```
//!
//! Only a single query operation is supported. Fragments, variables,
//! directives and mutations are rejected.

#![allow(clippy::redundant_closure_call)]

use peg::{error::ParseError, str::LineCol};
use serde_json::{Number, Value};
use thiserror::Error;

/// Deepest selection set nesting accepted, counting the operation's own set.
pub const MAX_DEPTH: usize = 32;

const DEPTH_EXCEEDED: &str = "selection depth within limit";

/// Syntax error with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error at offset {offset}: {message}")]
pub struct DocumentError {
    pub offset: usize,
    pub message: String,
}

impl DocumentError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A parsed query operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub operation_name: Option<String>,
    pub selections: Vec<Selection>,
}

/// One selected field.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, Value)>,
    pub selections: Vec<Selection>,
}

impl Selection {
    /// Key the field's value is written under in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }
}

peg::parser! {
    grammar graphql() for str {
        // Commas are insignificant, like whitespace.
        rule _()
            = quiet!{ ([' ' | '\t' | '\n' | '\r' | ',' | '\u{feff}'] / comment())* }

        rule comment()
            = "#" (!['\n'] [_])*

        rule name_start()
            = ['_' | 'a'..='z' | 'A'..='Z']

        rule name_char()
            = ['_' | 'a'..='z' | 'A'..='Z' | '0'..='9']

        rule name() -> String
            = quiet!{ n:$(name_start() name_char()*) { n.to_string() } }
            / expected!("a name")

        rule kw_query()
            = "query" !name_char()

        rule escape() -> char
            = "\"" { '"' }
            / "\\" { '\\' }
            / "/" { '/' }
            / "n" { '\n' }
            / "t" { '\t' }
            / "r" { '\r' }
            / expected!("an escape sequence")

        rule string_char() -> char
            = "\\" c:escape() { c }
            / c:[^ '"' | '\\' | '\n' | '\r'] { c }

        // e.g. "T_1", "say \"hi\""
        rule string() -> String
            = quiet!{ "\"" } chars:string_char()* "\"" { chars.into_iter().collect() }

        // e.g. 42, -1, 12.5, 1e3
        rule number() -> Value
            = n:$("-"? ['0'..='9']+ ("." ['0'..='9']+)? (['e' | 'E'] ['+' | '-']? ['0'..='9']+)?)
              !name_char()
            {? number_value(n).ok_or("a finite number") }

        rule value() -> Value
            = s:string() { Value::String(s) }
            / quiet!{ number() }
            / quiet!{ n:$(name_start() name_char()*) { name_value(n) } }
            / expected!("a value")

        rule argument() -> (String, Value)
            = n:name() _ ":" _ v:value() { (n, v) }

        rule arguments() -> Vec<(String, Value)>
            = "(" _ args:(argument() ++ _) _ ")"
            {? if has_duplicates(&args) { Err("distinct argument names") } else { Ok(args) } }

        rule selection(depth: usize) -> Selection
            = first:name() _ second:(":" _ n:name() { n })? _ arguments:arguments()? _
              selections:selection_set(depth + 1)?
            {
                let (alias, name) = match second {
                    Some(name) => (Some(first), name),
                    None => (None, first),
                };
                Selection {
                    alias,
                    name,
                    arguments: arguments.unwrap_or_default(),
                    selections: selections.unwrap_or_default(),
                }
            }

        // Fails before descending, so nesting cannot exhaust the stack.
        rule open(depth: usize)
            = "{" {? if depth <= MAX_DEPTH { Ok(()) } else { Err(DEPTH_EXCEEDED) } }

        rule selection_set(depth: usize) -> Vec<Selection>
            = open(depth) _ selections:(selection(depth) ++ _) _ "}" { selections }

        rule operation_name() -> Option<String>
            = kw_query() _ n:name()? { n }

        rule end()
            = quiet!{ ![_] } / expected!("end of document")

        pub rule document() -> Document
            = _ operation_name:operation_name()? _ selections:selection_set(1) _ end() {
                Document {
                    operation_name: operation_name.flatten(),
                    selections,
                }
            }
    }
}

fn number_value(text: &str) -> Option<Value> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn name_value(name: &str) -> Value {
    match name {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        // Enum values are passed through as strings.
        other => Value::String(other.to_string()),
    }
}

fn has_duplicates(arguments: &[(String, Value)]) -> bool {
    arguments
        .iter()
        .enumerate()
        .any(|(i, (name, _))| arguments[..i].iter().any(|(seen, _)| seen == name))
}

impl From<ParseError<LineCol>> for DocumentError {
    fn from(err: ParseError<LineCol>) -> Self {
        let message = if err.expected.tokens().any(|token| token == DEPTH_EXCEEDED) {
            format!("selections nested deeper than {MAX_DEPTH} levels")
        } else {
            format!("expected {}", err.expected)
        };
        DocumentError::new(err.location.offset, message)
    }
}

impl Document {
    /// Parse a query document.
    pub fn parse(source: &str) -> Result<Self, DocumentError> {
        Ok(graphql::document(source)?)
    }
}
