use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use custident_transform::StatusCodeSource;
use serde::Serialize;

use crate::cmd::GatewayArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OperationRow<'a> {
    name: &'a str,
    request_fields: Option<usize>,
    response_fields: Option<usize>,
    status_fallback: &'a str,
    status_code: &'static str,
    schema: bool,
}

pub fn run(gateway: &GatewayArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = gateway.load_catalog()?;
    let schemas = gateway.load_schemas()?;

    let rows: Vec<OperationRow<'_>> = catalog
        .iter()
        .map(|op| OperationRow {
            name: &op.name,
            request_fields: op.request.as_ref().map(|s| s.len()),
            response_fields: op.response.as_ref().map(|s| s.len()),
            status_fallback: &op.failure.status_fallback,
            status_code: status_code_label(op.failure.status_code),
            schema: schemas
                .as_ref()
                .is_some_and(|schemas| schemas.has_schema(&op.name)),
        })
        .collect();

    match format {
        OutputFormat::Json | OutputFormat::Pretty => {
            print_json(&rows, matches!(format, OutputFormat::Pretty));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "OPERATION",
                    "REQUEST",
                    "RESPONSE",
                    "STATUS FALLBACK",
                    "STATUS CODE",
                    "SCHEMA",
                ]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    field_count(row.request_fields),
                    field_count(row.response_fields),
                    row.status_fallback.to_string(),
                    row.status_code.to_string(),
                    if row.schema { "yes" } else { "no" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Raw => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
    }

    Ok(SUCCESS)
}

fn status_code_label(source: StatusCodeSource) -> &'static str {
    match source {
        StatusCodeSource::Transport => "transport",
        StatusCodeSource::BodyThenTransport => "body, then transport",
    }
}

fn field_count(fields: Option<usize>) -> String {
    match fields {
        Some(n) => format!("{n} fields"),
        None => "forward".to_string(),
    }
}
