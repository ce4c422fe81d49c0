use custident_pipeline::{vars, StepKind, StepReport, VariableContext};
use serde::Serialize;

use crate::cmd::{GatewayArgs, ValidateArgs};
use crate::exit::{pipeline_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ValidateOutput<'a> {
    operation: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    violation: Option<String>,
}

pub fn run(args: ValidateArgs, gateway: &GatewayArgs, format: OutputFormat) -> CliResult<i32> {
    let pipeline = gateway.pipeline()?;
    let Some(schemas) = pipeline.schemas() else {
        return Err(CliError::new(
            USAGE,
            "validate needs a schema directory (--schemas or CUSTIDENT_SCHEMA_DIR)",
        ));
    };
    let payload = args.payload.require()?;

    let mut ctx = VariableContext::new().with(vars::REQUEST_CONTENT, payload.as_str());
    let report = pipeline
        .step(&args.operation, StepKind::ValidateSchema)
        .and_then(|step| step.run(&mut ctx))
        .map_err(|err| pipeline_error("validation failed", err))?;
    let valid = report == StepReport::Validated(true);

    let violation = if valid {
        None
    } else {
        let document = serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null);
        schemas.first_violation(&args.operation, &document)
    };

    match format {
        OutputFormat::Json | OutputFormat::Pretty => {
            let out = ValidateOutput {
                operation: &args.operation,
                valid,
                violation,
            };
            print_json(&out, matches!(format, OutputFormat::Pretty));
        }
        OutputFormat::Table | OutputFormat::Raw => {
            let verdict = if valid { "valid" } else { "invalid" };
            match violation {
                Some(violation) => println!("{}: {verdict} ({violation})", args.operation),
                None => println!("{}: {verdict}", args.operation),
            }
        }
    }

    Ok(if valid { SUCCESS } else { DATA_INVALID })
}
