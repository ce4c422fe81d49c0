use custident_pipeline::{vars, StepKind, VariableContext};

use crate::cmd::{GatewayArgs, ShapeRequestArgs};
use crate::exit::{pipeline_error, CliResult, SUCCESS};
use crate::output::{print_step, OutputFormat};

pub fn run(args: ShapeRequestArgs, gateway: &GatewayArgs, format: OutputFormat) -> CliResult<i32> {
    let pipeline = gateway.pipeline()?;
    let payload = args.payload.require()?;

    let mut ctx = VariableContext::new().with(vars::REQUEST_CONTENT, payload);
    let headers = [
        (vars::REQUEST_CONSUMER_REQUEST_ID, args.headers.consumer_request_id),
        (vars::REQUEST_TOKEN, args.headers.token),
        (vars::REQUEST_SESSION_ID, args.headers.session_id),
    ];
    for (key, value) in headers {
        if let Some(value) = value {
            ctx = ctx.with(key, value);
        }
    }

    let report = pipeline
        .step(&args.operation, StepKind::ShapeRequest)
        .and_then(|step| step.run(&mut ctx))
        .map_err(|err| pipeline_error("request shaping failed", err))?;

    print_step(&args.operation, StepKind::ShapeRequest, &report, ctx.writes(), format);
    Ok(SUCCESS)
}
