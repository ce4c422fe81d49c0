use custident_pipeline::{StepKind, StepReport};
use custident_transform::ResponseOutcome;

use crate::cmd::{response_context, GatewayArgs, ResponseArgs};
use crate::exit::{pipeline_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_step, OutputFormat};

pub fn run(args: ResponseArgs, gateway: &GatewayArgs, format: OutputFormat) -> CliResult<i32> {
    let pipeline = gateway.pipeline()?;
    let mut ctx = response_context(&args)?;

    let report = pipeline
        .step(&args.operation, StepKind::ShapeResponse)
        .and_then(|step| step.run(&mut ctx))
        .map_err(|err| pipeline_error("response shaping failed", err))?;

    print_step(&args.operation, StepKind::ShapeResponse, &report, ctx.writes(), format);
    Ok(match report {
        StepReport::Response(ResponseOutcome::Failure(_)) => FAILURE,
        _ => SUCCESS,
    })
}
