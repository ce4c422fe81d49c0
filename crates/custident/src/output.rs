use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use custident_pipeline::{CallerResponse, StepKind, StepReport};
use custident_transform::{FaultOutcome, ResponseOutcome};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct StepOutput<'a> {
    operation: &'a str,
    step: StepKind,
    outcome: &'static str,
    writes: Map<String, Value>,
}

#[derive(Serialize)]
struct CallerOutput<'a> {
    operation: &'a str,
    success: bool,
    response: Value,
}

pub fn outcome_label(report: &StepReport) -> &'static str {
    match report {
        StepReport::SchemaProvided(true) => "provided",
        StepReport::SchemaProvided(false) => "noSchema",
        StepReport::Validated(true) => "valid",
        StepReport::Validated(false) => "invalid",
        StepReport::RequestShaped => "shaped",
        StepReport::Response(ResponseOutcome::Absent) => "absent",
        StepReport::Response(ResponseOutcome::Success(_)) => "success",
        StepReport::Response(ResponseOutcome::Failure(_)) => "failure",
        StepReport::Fault(FaultOutcome::PassThrough) => "passThrough",
        StepReport::Fault(FaultOutcome::Normalized(_)) => "normalized",
    }
}

/// Print what a single step wrote to its context.
pub fn print_step(
    operation: &str,
    step: StepKind,
    report: &StepReport,
    writes: &[(String, Value)],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json | OutputFormat::Pretty => {
            let out = StepOutput {
                operation,
                step,
                outcome: outcome_label(report),
                writes: writes.iter().cloned().collect(),
            };
            print_json(&out, matches!(format, OutputFormat::Pretty));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["VARIABLE", "VALUE"]);
            for (key, value) in writes {
                table.add_row(vec![key.clone(), display_value(value)]);
            }
            println!("{step} {operation}: {}", outcome_label(report));
            if !writes.is_empty() {
                println!("{table}");
            }
        }
        OutputFormat::Raw => {
            for (_, value) in writes {
                println!("{}", display_value(value));
            }
        }
    }
}

/// Print the response a caller would receive.
pub fn print_caller_response(operation: &str, response: &CallerResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Pretty => {
            let out = CallerOutput {
                operation,
                success: response.is_success(),
                response: response.to_value(),
            };
            print_json(&out, matches!(format, OutputFormat::Pretty));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            match response.to_value() {
                Value::Object(map) => {
                    for (key, value) in map {
                        table.add_row(vec![key, display_value(&value)]);
                    }
                }
                other => {
                    table.add_row(vec!["<body>".to_string(), display_value(&other)]);
                }
            }
            let label = if response.is_success() { "success" } else { "failure" };
            println!("{operation}: {label}");
            println!("{table}");
        }
        OutputFormat::Raw => println!("{}", response.to_value()),
    }
}

pub fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    println!("{}", text.unwrap_or_else(|_| "{}".to_string()));
}

/// Strings print without quotes; everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
