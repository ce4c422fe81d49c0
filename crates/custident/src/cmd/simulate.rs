use std::fs;

use custident_pipeline::{
    InboundRequest, PipelineConfig, Result as PipelineResult, TransferEnvelope, UpstreamResponse,
};

use crate::cmd::{GatewayArgs, SimulateArgs};
use crate::exit::{io_error, pipeline_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_caller_response, OutputFormat};

pub fn run(args: SimulateArgs, gateway: &GatewayArgs, format: OutputFormat) -> CliResult<i32> {
    let pipeline = gateway.pipeline()?.with_config(PipelineConfig {
        validate_requests: !args.no_validate,
    });

    let inbound = InboundRequest {
        consumer_request_id: args.headers.consumer_request_id.clone(),
        token: args.headers.token.clone(),
        session_id: args.headers.session_id.clone(),
        body: args.payload.require()?,
    };
    let canned = UpstreamResponse {
        status_code: Some(args.upstream_status),
        body: upstream_body(&args)?,
    };

    let upstream = |operation: &str, request: &TransferEnvelope| -> PipelineResult<UpstreamResponse> {
        tracing::info!(operation, ?request, "forwarding to canned upstream");
        Ok(canned.clone())
    };
    let response = pipeline
        .execute(&args.operation, &inbound, &upstream)
        .map_err(|err| pipeline_error("simulation failed", err))?;

    print_caller_response(&args.operation, &response, format);
    Ok(if response.is_success() { SUCCESS } else { FAILURE })
}

fn upstream_body(args: &SimulateArgs) -> CliResult<Option<String>> {
    if let Some(body) = &args.upstream_body {
        return Ok(Some(body.clone()));
    }
    match &args.upstream_file {
        Some(path) => fs::read_to_string(path)
            .map(Some)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => Ok(None),
    }
}
