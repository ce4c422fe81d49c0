use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use custident_pipeline::{vars, OperationCatalog, Pipeline, VariableContext};
use custident_schema::{RegistryConfig, SchemaRegistry};

use crate::exit::{io_error, pipeline_error, schema_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod normalize_fault;
pub mod operations;
pub mod shape_request;
pub mod shape_response;
pub mod simulate;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the operations in the catalog.
    Operations,
    /// Check a request payload against the operation's schema.
    Validate(ValidateArgs),
    /// Project a request payload through the operation's request selector.
    ShapeRequest(ShapeRequestArgs),
    /// Shape an upstream response as the success path would.
    ShapeResponse(ResponseArgs),
    /// Normalize an upstream failure into the error envelope.
    NormalizeFault(ResponseArgs),
    /// Run the full pipeline against a canned upstream response.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, gateway: &GatewayArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Operations => operations::run(gateway, format),
        Command::Validate(args) => validate::run(args, gateway, format),
        Command::ShapeRequest(args) => shape_request::run(args, gateway, format),
        Command::ShapeResponse(args) => shape_response::run(args, gateway, format),
        Command::NormalizeFault(args) => normalize_fault::run(args, gateway, format),
        Command::Simulate(args) => simulate::run(args, gateway, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where operations and schemas come from.
#[derive(Args, Debug, Default)]
pub struct GatewayArgs {
    /// Operation catalog file. Default: the built-in catalog.
    #[arg(long, value_name = "FILE", env = "CUSTIDENT_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,
    /// Directory of `<operation>.schema.json` files.
    #[arg(long, value_name = "DIR", env = "CUSTIDENT_SCHEMA_DIR", global = true)]
    pub schemas: Option<PathBuf>,
    /// Reject properties that object schemas do not declare.
    #[arg(long, global = true)]
    pub strict: bool,
}

impl GatewayArgs {
    pub fn load_catalog(&self) -> CliResult<OperationCatalog> {
        match &self.catalog {
            Some(path) => OperationCatalog::from_file(path)
                .map_err(|err| pipeline_error("failed loading catalog", err)),
            None => Ok(OperationCatalog::builtin()),
        }
    }

    pub fn load_schemas(&self) -> CliResult<Option<SchemaRegistry>> {
        let Some(dir) = &self.schemas else {
            return Ok(None);
        };
        let config = RegistryConfig {
            strict_mode: self.strict,
            ..RegistryConfig::default()
        };
        SchemaRegistry::from_directory_with_config(dir, config)
            .map(Some)
            .map_err(|err| schema_error(&format!("failed loading schemas from {}", dir.display()), err))
    }

    pub fn pipeline(&self) -> CliResult<Pipeline> {
        let pipeline = Pipeline::new(Arc::new(self.load_catalog()?));
        Ok(match self.load_schemas()? {
            Some(schemas) => pipeline.with_schemas(Arc::new(schemas)),
            None => pipeline,
        })
    }
}

/// One payload given inline or from a file.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw text payload, passed through without parsing.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    /// The payload text, if one was given.
    pub fn resolve(&self) -> CliResult<Option<String>> {
        if let Some(json) = &self.json {
            serde_json::from_str::<serde_json::Value>(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
            return Ok(Some(json.clone()));
        }
        if let Some(data) = &self.data {
            return Ok(Some(data.clone()));
        }
        if let Some(path) = &self.file {
            return fs::read_to_string(path)
                .map(Some)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(None)
    }

    pub fn require(&self) -> CliResult<String> {
        self.resolve()?
            .ok_or_else(|| CliError::new(USAGE, "a payload is required (--json, --data or --file)"))
    }
}

/// Request identifiers forwarded with the payload.
#[derive(Args, Debug, Default)]
pub struct HeaderArgs {
    #[arg(long, value_name = "ID")]
    pub consumer_request_id: Option<String>,
    #[arg(long)]
    pub token: Option<String>,
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Operation name.
    pub operation: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct ShapeRequestArgs {
    /// Operation name.
    pub operation: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub headers: HeaderArgs,
}

#[derive(Args, Debug)]
pub struct ResponseArgs {
    /// Operation name.
    pub operation: String,
    /// Upstream status code. Omit to simulate a missing code.
    #[arg(long)]
    pub status: Option<u16>,
    /// Upstream body. Omit to simulate a missing body.
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Operation name.
    pub operation: String,
    /// Caller request payload.
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub headers: HeaderArgs,
    /// Status code the canned upstream answers with.
    #[arg(long, default_value = "200")]
    pub upstream_status: u16,
    /// Body the canned upstream answers with.
    #[arg(long, value_name = "TEXT", conflicts_with = "upstream_file")]
    pub upstream_body: Option<String>,
    /// Read the canned upstream body from a file.
    #[arg(long, value_name = "FILE")]
    pub upstream_file: Option<PathBuf>,
    /// Skip the schema gate.
    #[arg(long)]
    pub no_validate: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Context seeded with an upstream status code and body.
pub fn response_context(args: &ResponseArgs) -> CliResult<VariableContext> {
    let mut ctx = VariableContext::new();
    if let Some(status) = args.status {
        ctx = ctx.with(vars::RESPONSE_STATUS_CODE, status);
    }
    if let Some(body) = args.payload.resolve()? {
        ctx = ctx.with(vars::RESPONSE_CONTENT, body);
    }
    Ok(ctx)
}
