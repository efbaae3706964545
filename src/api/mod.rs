use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{ArgAction, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    AccumulationParams, CancelFlag, DecumulationParams, Dispatcher, EngineError, FailureThreshold,
    GoalSolveConfig, GoalType, MAX_HORIZON_MONTHS, MAX_SIMULATION_COUNT, MAX_YEARS,
    ProfileParameters, ProjectionOptions, SimulationControl, accumulation, decumulation,
    run_projection, solve_goal, volatility_for_return,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliFailureThreshold {
    Strict,
    Standard,
    Relaxed,
    Lenient,
}

impl From<CliFailureThreshold> for FailureThreshold {
    fn from(value: CliFailureThreshold) -> Self {
        match value {
            CliFailureThreshold::Strict => FailureThreshold::Strict,
            CliFailureThreshold::Standard => FailureThreshold::Standard,
            CliFailureThreshold::Relaxed => FailureThreshold::Relaxed,
            CliFailureThreshold::Lenient => FailureThreshold::Lenient,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGoalType {
    RequiredInvestment,
    MaxSpending,
}

impl From<CliGoalType> for GoalType {
    fn from(value: CliGoalType) -> Self {
        match value {
            CliGoalType::RequiredInvestment => GoalType::RequiredInvestment,
            CliGoalType::MaxSpending => GoalType::MaxSpending,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFailureThreshold {
    Strict,
    #[serde(alias = "default")]
    Standard,
    Relaxed,
    Lenient,
}

impl From<ApiFailureThreshold> for CliFailureThreshold {
    fn from(value: ApiFailureThreshold) -> Self {
        match value {
            ApiFailureThreshold::Strict => CliFailureThreshold::Strict,
            ApiFailureThreshold::Standard => CliFailureThreshold::Standard,
            ApiFailureThreshold::Relaxed => CliFailureThreshold::Relaxed,
            ApiFailureThreshold::Lenient => CliFailureThreshold::Lenient,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "requiredInvestment", alias = "required_investment")]
    RequiredInvestment,
    #[serde(alias = "maxSpending", alias = "max_spending")]
    MaxSpending,
}

impl From<ApiGoalType> for CliGoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::RequiredInvestment => CliGoalType::RequiredInvestment,
            ApiGoalType::MaxSpending => CliGoalType::MaxSpending,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    desired_monthly_income: Option<f64>,
    current_net_assets: Option<f64>,
    monthly_investment: Option<f64>,
    pre_retirement_return_rate: Option<f64>,
    post_retirement_return_rate: Option<f64>,
    simulations: Option<i64>,
    failure_threshold: Option<ApiFailureThreshold>,
    failure_threshold_multiplier: Option<f64>,
    years: Option<u32>,
    track_paths: Option<bool>,
    pre_retirement_volatility: Option<f64>,
    post_retirement_volatility: Option<f64>,
    seed: Option<u64>,
    parallelism: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    projection: ProjectionPayload,
    goal_type: Option<ApiGoalType>,
    target_success_rate: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
    simulations_per_iteration: Option<i64>,
    final_simulations: Option<i64>,
    horizon_months: Option<u32>,
    solver_seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AccumulationPayload {
    initial_asset: Option<f64>,
    monthly_investment: Option<f64>,
    target_asset: Option<f64>,
    mean_return: Option<f64>,
    volatility: Option<f64>,
    simulations: Option<i64>,
    max_months: Option<u32>,
    track_paths: Option<bool>,
    seed: Option<u64>,
    parallelism: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DecumulationPayload {
    initial_asset: Option<f64>,
    monthly_spending: Option<f64>,
    annual_return: Option<f64>,
    volatility: Option<f64>,
    years: Option<u32>,
    simulations: Option<i64>,
    seed: Option<u64>,
    parallelism: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct VolatilityQuery {
    rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VolatilityResponse {
    rate: f64,
    volatility: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, help = "Desired monthly income in retirement")]
    pub desired_monthly_income: f64,
    #[arg(long, default_value_t = 0.0)]
    pub current_net_assets: f64,
    #[arg(long)]
    pub monthly_investment: f64,
    #[arg(long, help = "Expected annual return before retirement in percent, e.g. 6.5")]
    pub pre_retirement_return_rate: f64,
    #[arg(long, help = "Expected annual return after retirement in percent, e.g. 4")]
    pub post_retirement_return_rate: f64,
    #[arg(
        long,
        default_value_t = 30_000,
        allow_negative_numbers = true,
        help = "Trajectories per phase, at most 1000000"
    )]
    pub simulations: i64,
    #[arg(long, value_enum, default_value_t = CliFailureThreshold::Standard)]
    pub failure_threshold: CliFailureThreshold,
    #[arg(
        long,
        help = "Custom horizon multiple of the deterministic baseline; overrides --failure-threshold"
    )]
    pub failure_threshold_multiplier: Option<f64>,
    #[arg(long, default_value_t = 40, help = "Retirement years to simulate, at most 100")]
    pub years: u32,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub track_paths: bool,
    #[arg(
        long,
        help = "Accumulation volatility in percent; defaults to the return-rate table"
    )]
    pub pre_retirement_volatility: Option<f64>,
    #[arg(
        long,
        help = "Decumulation volatility in percent; defaults to the return-rate table"
    )]
    pub post_retirement_volatility: Option<f64>,
    #[arg(long, help = "Fixed base seed for reproducible runs")]
    pub seed: Option<u64>,
    #[arg(long, help = "Worker count; defaults to available cores clamped to 2..=8")]
    pub parallelism: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    pub projection: ProjectArgs,
    #[arg(long, value_enum, default_value_t = CliGoalType::RequiredInvestment)]
    pub goal_type: CliGoalType,
    #[arg(long, default_value_t = 90.0, help = "Required success rate in percent")]
    pub target_success_rate: f64,
    #[arg(long, default_value_t = 0.0)]
    pub search_min: f64,
    #[arg(long, default_value_t = 10_000_000.0)]
    pub search_max: f64,
    #[arg(long, default_value_t = 1_000.0)]
    pub tolerance: f64,
    #[arg(long, default_value_t = 32)]
    pub max_iterations: u32,
    #[arg(long, default_value_t = 2_000, allow_negative_numbers = true)]
    pub simulations_per_iteration: i64,
    #[arg(long, default_value_t = 10_000, allow_negative_numbers = true)]
    pub final_simulations: i64,
    #[arg(long, help = "Accumulation horizon; defaults to the failure-threshold cap")]
    pub horizon_months: Option<u32>,
    #[arg(long, default_value_t = 42)]
    pub solver_seed: u64,
}

/// Bisection halves the bracket each step, so this is far past any useful tolerance.
const MAX_SOLVER_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Copy)]
struct ProjectionRequest {
    profile: ProfileParameters,
    options: ProjectionOptions,
}

#[derive(Debug, Clone, Copy)]
struct SolveRequest {
    projection: ProjectionRequest,
    config: GoalSolveConfig,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn simulation_count(flag: &str, value: i64) -> Result<usize, String> {
    if value <= 0 {
        return Err(format!("{flag} must be > 0"));
    }
    match usize::try_from(value) {
        Ok(count) if count <= MAX_SIMULATION_COUNT => Ok(count),
        _ => Err(format!("{flag} must be <= {MAX_SIMULATION_COUNT}")),
    }
}

fn decumulation_years(flag: &str, value: u32) -> Result<u32, String> {
    if value == 0 || value > MAX_YEARS {
        return Err(format!("{flag} must be between 1 and {MAX_YEARS}"));
    }
    Ok(value)
}

fn horizon_months(flag: &str, value: u32) -> Result<u32, String> {
    if value == 0 || value > MAX_HORIZON_MONTHS {
        return Err(format!(
            "{flag} must be between 1 and {MAX_HORIZON_MONTHS}"
        ));
    }
    Ok(value)
}

fn finite(flag: &str, value: f64) -> Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{flag} must be a finite number"))
    }
}

fn optional_volatility(flag: &str, value: Option<f64>) -> Result<Option<f64>, String> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(format!("{flag} must be >= 0")),
        other => Ok(other),
    }
}

fn build_projection_request(args: &ProjectArgs) -> Result<ProjectionRequest, String> {
    let desired_monthly_income = finite("--desired-monthly-income", args.desired_monthly_income)?;
    if desired_monthly_income < 0.0 {
        return Err("--desired-monthly-income must be >= 0".to_string());
    }
    let years = decumulation_years("--years", args.years)?;
    if args.parallelism == Some(0) {
        return Err("--parallelism must be > 0".to_string());
    }

    let failure_threshold = match args.failure_threshold_multiplier {
        Some(m) if !m.is_finite() || m <= 0.0 => {
            return Err("--failure-threshold-multiplier must be > 0".to_string());
        }
        Some(m) => FailureThreshold::Custom(m),
        None => args.failure_threshold.into(),
    };

    Ok(ProjectionRequest {
        profile: ProfileParameters {
            desired_monthly_income,
            current_net_assets: finite("--current-net-assets", args.current_net_assets)?,
            monthly_investment: finite("--monthly-investment", args.monthly_investment)?,
            pre_retirement_return_rate: finite(
                "--pre-retirement-return-rate",
                args.pre_retirement_return_rate,
            )?,
            post_retirement_return_rate: finite(
                "--post-retirement-return-rate",
                args.post_retirement_return_rate,
            )?,
        },
        options: ProjectionOptions {
            simulation_count: simulation_count("--simulations", args.simulations)?,
            failure_threshold,
            decumulation_years: years,
            track_paths: args.track_paths,
            pre_retirement_volatility: optional_volatility(
                "--pre-retirement-volatility",
                args.pre_retirement_volatility,
            )?,
            post_retirement_volatility: optional_volatility(
                "--post-retirement-volatility",
                args.post_retirement_volatility,
            )?,
            seed: args.seed,
            parallelism: args.parallelism,
        },
    })
}

fn build_solve_request(args: &SolveArgs) -> Result<SolveRequest, String> {
    let projection = build_projection_request(&args.projection)?;

    if !(0.0..=100.0).contains(&args.target_success_rate) {
        return Err("--target-success-rate must be between 0 and 100".to_string());
    }
    if args.search_max <= args.search_min {
        return Err("--search-max must be greater than --search-min".to_string());
    }
    if args.search_min < 0.0 {
        return Err("--search-min must be >= 0".to_string());
    }
    if !args.tolerance.is_finite() || args.tolerance <= 0.0 {
        return Err("--tolerance must be > 0".to_string());
    }
    if args.max_iterations == 0 || args.max_iterations > MAX_SOLVER_ITERATIONS {
        return Err(format!(
            "--max-iterations must be between 1 and {MAX_SOLVER_ITERATIONS}"
        ));
    }
    let horizon = args
        .horizon_months
        .map(|m| horizon_months("--horizon-months", m))
        .transpose()?;

    Ok(SolveRequest {
        projection,
        config: GoalSolveConfig {
            goal_type: args.goal_type.into(),
            target_success_rate: args.target_success_rate / 100.0,
            search_min: finite("--search-min", args.search_min)?,
            search_max: finite("--search-max", args.search_max)?,
            tolerance: args.tolerance,
            max_iterations: args.max_iterations,
            simulations_per_iteration: simulation_count(
                "--simulations-per-iteration",
                args.simulations_per_iteration,
            )?,
            final_simulations: simulation_count("--final-simulations", args.final_simulations)?,
            horizon_months: horizon,
            seed: args.solver_seed,
        },
    })
}

fn cli_control() -> SimulationControl {
    SimulationControl::new().with_progress(|progress| {
        debug!(
            completed = progress.completed,
            total = progress.total,
            "simulation progress"
        );
    })
}

/// Runs one projection from CLI flags and returns it as pretty JSON.
pub fn run_project_command(args: ProjectArgs) -> Result<String, String> {
    let request = build_projection_request(&args)?;
    let report = run_projection(&request.profile, &request.options, &cli_control())
        .map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to encode report: {e}"))
}

/// Runs the goal solver from CLI flags and returns it as pretty JSON.
pub fn run_solve_command(args: SolveArgs) -> Result<String, String> {
    let request = build_solve_request(&args)?;
    let result = solve_goal(
        &request.projection.profile,
        &request.projection.options,
        request.config,
        &cli_control(),
    )
    .map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&result).map_err(|e| format!("Failed to encode result: {e}"))
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/accumulation", post(accumulation_handler))
        .route("/api/decumulation", post(decumulation_handler))
        .route("/api/solve", post(solve_handler))
        .route("/api/volatility", get(volatility_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection HTTP API listening");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn volatility_handler(Query(query): Query<VolatilityQuery>) -> Response {
    if !query.rate.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "rate must be a finite number");
    }
    json_response(
        StatusCode::OK,
        VolatilityResponse {
            rate: query.rate,
            volatility: volatility_for_return(query.rate),
        },
    )
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_handler_impl(payload).await
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_handler_impl(payload).await
}

async fn projection_handler_impl(payload: ProjectionPayload) -> Response {
    let request = match projection_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    respond(run_blocking(move |control| {
        run_projection(&request.profile, &request.options, control)
    }))
    .await
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    let request = match solve_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    respond(run_blocking(move |control| {
        solve_goal(
            &request.projection.profile,
            &request.projection.options,
            request.config,
            control,
        )
    }))
    .await
}

async fn accumulation_handler(Json(payload): Json<AccumulationPayload>) -> Response {
    let (params, dispatcher) = match accumulation_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    respond(run_blocking(move |control| {
        accumulation::simulate(&params, &dispatcher, control)
    }))
    .await
}

async fn decumulation_handler(Json(payload): Json<DecumulationPayload>) -> Response {
    let (params, dispatcher) = match decumulation_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    respond(run_blocking(move |control| {
        decumulation::simulate(&params, &dispatcher, control)
    }))
    .await
}

/// Cancels the run when the request future is dropped (client went away).
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&SimulationControl) -> Result<T, EngineError> + Send + 'static,
{
    let flag = CancelFlag::new();
    let _guard = CancelOnDrop(flag.clone());
    let control = cli_control().with_cancel_flag(flag);

    match tokio::task::spawn_blocking(move || job(&control)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(engine_error_response(&err)),
        Err(join_err) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Simulation task failed: {join_err}"),
        )),
    }
}

async fn respond<T: Serialize>(
    outcome: impl std::future::Future<Output = Result<T, Response>>,
) -> Response {
    match outcome.await {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(response) => response,
    }
}

fn engine_error_response(err: &EngineError) -> Response {
    let status = match err {
        EngineError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::WorkerPool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn projection_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    projection_request_from_payload(payload)
}

fn apply_projection_payload(args: &mut ProjectArgs, payload: ProjectionPayload) {
    if let Some(v) = payload.desired_monthly_income {
        args.desired_monthly_income = v;
    }
    if let Some(v) = payload.current_net_assets {
        args.current_net_assets = v;
    }
    if let Some(v) = payload.monthly_investment {
        args.monthly_investment = v;
    }
    if let Some(v) = payload.pre_retirement_return_rate {
        args.pre_retirement_return_rate = v;
    }
    if let Some(v) = payload.post_retirement_return_rate {
        args.post_retirement_return_rate = v;
    }
    if let Some(v) = payload.simulations {
        args.simulations = v;
    }
    if let Some(v) = payload.failure_threshold {
        args.failure_threshold = v.into();
    }
    if let Some(v) = payload.failure_threshold_multiplier {
        args.failure_threshold_multiplier = Some(v);
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.track_paths {
        args.track_paths = v;
    }
    if let Some(v) = payload.pre_retirement_volatility {
        args.pre_retirement_volatility = Some(v);
    }
    if let Some(v) = payload.post_retirement_volatility {
        args.post_retirement_volatility = Some(v);
    }
    if let Some(v) = payload.seed {
        args.seed = Some(v);
    }
    if let Some(v) = payload.parallelism {
        args.parallelism = Some(v);
    }
}

fn projection_request_from_payload(payload: ProjectionPayload) -> Result<ProjectionRequest, String> {
    let mut args = default_project_args_for_api();
    apply_projection_payload(&mut args, payload);
    build_projection_request(&args)
}

fn solve_request_from_payload(payload: SolvePayload) -> Result<SolveRequest, String> {
    let mut args = default_solve_args_for_api();
    apply_projection_payload(&mut args.projection, payload.projection);

    if let Some(v) = payload.goal_type {
        args.goal_type = v.into();
    }
    if let Some(v) = payload.target_success_rate {
        args.target_success_rate = v;
    }
    if let Some(v) = payload.search_min {
        args.search_min = v;
    }
    if let Some(v) = payload.search_max {
        args.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        args.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        args.max_iterations = v;
    }
    if let Some(v) = payload.simulations_per_iteration {
        args.simulations_per_iteration = v;
    }
    if let Some(v) = payload.final_simulations {
        args.final_simulations = v;
    }
    if let Some(v) = payload.horizon_months {
        args.horizon_months = Some(v);
    }
    if let Some(v) = payload.solver_seed {
        args.solver_seed = v;
    }

    build_solve_request(&args)
}

fn accumulation_request_from_payload(
    payload: AccumulationPayload,
) -> Result<(AccumulationParams, Dispatcher), String> {
    let defaults = AccumulationParams::default();
    let mean_return = finite("meanReturn", payload.mean_return.unwrap_or(defaults.mean_return))?;
    let volatility = optional_volatility("volatility", payload.volatility)?
        .unwrap_or_else(|| volatility_for_return(mean_return));
    let simulations = match payload.simulations {
        Some(v) => simulation_count("simulations", v)?,
        None => defaults.simulation_count,
    };
    let params = AccumulationParams {
        initial_asset: payload.initial_asset.unwrap_or(defaults.initial_asset),
        monthly_investment: payload
            .monthly_investment
            .unwrap_or(defaults.monthly_investment),
        target_asset: payload.target_asset.unwrap_or(defaults.target_asset),
        mean_return,
        volatility,
        simulation_count: simulations,
        max_months: horizon_months(
            "maxMonths",
            payload.max_months.unwrap_or(defaults.max_months),
        )?,
        track_paths: payload.track_paths.unwrap_or(true),
    };
    let dispatcher =
        Dispatcher::configured(payload.parallelism, payload.seed).map_err(|e| e.to_string())?;
    Ok((params, dispatcher))
}

fn decumulation_request_from_payload(
    payload: DecumulationPayload,
) -> Result<(DecumulationParams, Dispatcher), String> {
    let defaults = DecumulationParams::default();
    let annual_return = finite(
        "annualReturn",
        payload.annual_return.unwrap_or(defaults.annual_return),
    )?;
    let volatility = optional_volatility("volatility", payload.volatility)?
        .unwrap_or_else(|| volatility_for_return(annual_return));
    let simulations = match payload.simulations {
        Some(v) => simulation_count("simulations", v)?,
        None => defaults.simulation_count,
    };
    let params = DecumulationParams {
        initial_asset: payload.initial_asset.unwrap_or(defaults.initial_asset),
        monthly_spending: payload.monthly_spending.unwrap_or(defaults.monthly_spending),
        annual_return,
        volatility,
        years: decumulation_years("years", payload.years.unwrap_or(defaults.years))?,
        simulation_count: simulations,
    };
    let dispatcher =
        Dispatcher::configured(payload.parallelism, payload.seed).map_err(|e| e.to_string())?;
    Ok((params, dispatcher))
}

fn default_project_args_for_api() -> ProjectArgs {
    ProjectArgs {
        desired_monthly_income: 3_000_000.0,
        current_net_assets: 0.0,
        monthly_investment: 500_000.0,
        pre_retirement_return_rate: 6.5,
        post_retirement_return_rate: 4.0,
        simulations: 30_000,
        failure_threshold: CliFailureThreshold::Standard,
        failure_threshold_multiplier: None,
        years: 40,
        track_paths: true,
        pre_retirement_volatility: None,
        post_retirement_volatility: None,
        seed: None,
        parallelism: None,
    }
}

fn default_solve_args_for_api() -> SolveArgs {
    SolveArgs {
        projection: default_project_args_for_api(),
        goal_type: CliGoalType::RequiredInvestment,
        target_success_rate: 90.0,
        search_min: 0.0,
        search_max: 10_000_000.0,
        tolerance: 1_000.0,
        max_iterations: 32,
        simulations_per_iteration: 2_000,
        final_simulations: 10_000,
        horizon_months: None,
        solver_seed: 42,
    }
}
