use custident_pipeline::StepKind;

use crate::cmd::{response_context, GatewayArgs, ResponseArgs};
use crate::exit::{pipeline_error, CliResult, SUCCESS};
use crate::output::{print_step, OutputFormat};

pub fn run(args: ResponseArgs, gateway: &GatewayArgs, format: OutputFormat) -> CliResult<i32> {
    let pipeline = gateway.pipeline()?;
    let mut ctx = response_context(&args)?;

    let report = pipeline
        .step(&args.operation, StepKind::NormalizeFault)
        .and_then(|step| step.run(&mut ctx))
        .map_err(|err| pipeline_error("fault normalization failed", err))?;

    print_step(&args.operation, StepKind::NormalizeFault, &report, ctx.writes(), format);
    Ok(SUCCESS)
}
