use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

mod cli;
mod debounce;
pub mod format;
mod watch;

pub use cli::{Cli, run};
pub use debounce::Debouncer;

use crate::core::{
    ActiveTable, Advice, AdviceInput, AnnuityResult, CalcError, DebtRate, EmergencyFund,
    RetirementHorizon, TaxTable, WithdrawalReason, WithdrawalResult, advise, compute_tax,
    marginal_rate, parse_number, run_annuity, run_withdrawal,
};
use cli::{AnnuityArgs, CliTaxMode, WithdrawArgs, build_annuity_input, build_withdrawal_input};
use format::{AnnuityDisplay, WithdrawalDisplay, annuity_display, withdrawal_display};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// A form value: either a JSON number or user-typed text such as `"R 30 000"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn value(&self) -> f64 {
        match self {
            Amount::Number(v) if v.is_finite() => *v,
            Amount::Number(_) => 0.0,
            Amount::Text(s) => parse_number(s),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTaxMode {
    Marginal,
    #[serde(alias = "lumpSum", alias = "lump_sum")]
    LumpSum,
}

impl From<ApiTaxMode> for CliTaxMode {
    fn from(value: ApiTaxMode) -> Self {
        match value {
            ApiTaxMode::Marginal => CliTaxMode::Marginal,
            ApiTaxMode::LumpSum => CliTaxMode::LumpSum,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WithdrawalPayload {
    annual_salary: Option<Amount>,
    fund_value: Option<Amount>,
    withdrawal_amount: Option<Amount>,
    years_to_retirement: Option<Amount>,
    growth_rate: Option<Amount>,
    tax_mode: Option<ApiTaxMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnnuityPayload {
    monthly_salary: Option<Amount>,
    current_monthly: Option<Amount>,
    extra_monthly: Option<Amount>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AdvicePayload {
    reason: Option<WithdrawalReason>,
    emergency_fund: Option<EmergencyFund>,
    debt_rate: Option<DebtRate>,
    years_to_retirement: Option<RetirementHorizon>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaxQuery {
    income: Option<Amount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WithdrawalResponse {
    tax_table: String,
    #[serde(flatten)]
    result: WithdrawalResult,
    display: WithdrawalDisplay,
}

impl WithdrawalResponse {
    pub(crate) fn new(table: &TaxTable, result: WithdrawalResult) -> Self {
        Self {
            tax_table: table.label.to_string(),
            display: withdrawal_display(&result),
            result,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnnuityResponse {
    tax_table: String,
    #[serde(flatten)]
    result: AnnuityResult,
    display: AnnuityDisplay,
}

impl AnnuityResponse {
    pub(crate) fn new(table: &TaxTable, result: AnnuityResult) -> Self {
        Self {
            tax_table: table.label.to_string(),
            display: annuity_display(&result),
            result,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdviceResponse {
    #[serde(flatten)]
    advice: Advice,
}

impl From<Advice> for AdviceResponse {
    fn from(advice: Advice) -> Self {
        Self { advice }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    tax_table: String,
    income: f64,
    tax: f64,
    effective_tax_rate: f64,
    marginal_tax_rate: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
struct AppState {
    table: ActiveTable,
}

fn default_withdraw_args_for_api() -> WithdrawArgs {
    WithdrawArgs {
        salary: 0.0,
        fund: 0.0,
        amount: 0.0,
        years: 20.0,
        growth_rate: 10.0,
        tax_mode: CliTaxMode::Marginal,
        json: true,
    }
}

fn withdraw_args_from_payload(payload: WithdrawalPayload) -> WithdrawArgs {
    let mut args = default_withdraw_args_for_api();
    if let Some(v) = payload.annual_salary {
        args.salary = v.value();
    }
    if let Some(v) = payload.fund_value {
        args.fund = v.value();
    }
    if let Some(v) = payload.withdrawal_amount {
        args.amount = v.value();
    }
    if let Some(v) = payload.years_to_retirement {
        args.years = v.value();
    }
    if let Some(v) = payload.growth_rate {
        args.growth_rate = v.value();
    }
    if let Some(v) = payload.tax_mode {
        args.tax_mode = v.into();
    }
    args
}

fn annuity_args_from_payload(payload: AnnuityPayload) -> AnnuityArgs {
    AnnuityArgs {
        monthly_salary: payload.monthly_salary.map_or(0.0, |v| v.value()),
        current: payload.current_monthly.map_or(0.0, |v| v.value()),
        extra: payload.extra_monthly.map_or(0.0, |v| v.value()),
        json: true,
    }
}

fn advice_input_from_payload(payload: AdvicePayload) -> Result<AdviceInput, String> {
    let missing = |field| CalcError::MissingInput { field }.to_string();
    Ok(AdviceInput {
        reason: payload.reason.ok_or_else(|| missing("reason"))?,
        emergency_fund: payload
            .emergency_fund
            .ok_or_else(|| missing("emergencyFund"))?,
        debt_rate: payload.debt_rate.unwrap_or(DebtRate::NotApplicable),
        horizon: payload
            .years_to_retirement
            .ok_or_else(|| missing("yearsToRetirement"))?,
    })
}

fn withdrawal_response(table: &TaxTable, payload: WithdrawalPayload) -> Result<WithdrawalResponse, String> {
    let input = build_withdrawal_input(&withdraw_args_from_payload(payload))?;
    let result = run_withdrawal(&input, table).map_err(|e| e.to_string())?;
    Ok(WithdrawalResponse::new(table, result))
}

fn annuity_response(table: &TaxTable, payload: AnnuityPayload) -> Result<AnnuityResponse, String> {
    let input = build_annuity_input(&annuity_args_from_payload(payload))?;
    let result = run_annuity(&input, table).map_err(|e| e.to_string())?;
    Ok(AnnuityResponse::new(table, result))
}

fn tax_response(table: &TaxTable, query: TaxQuery) -> TaxResponse {
    let income = query.income.map_or(0.0, |v| v.value()).max(0.0);
    let tax = compute_tax(income, table);
    TaxResponse {
        tax_table: table.label.to_string(),
        income,
        tax,
        effective_tax_rate: if income > 0.0 { tax / income } else { 0.0 },
        marginal_tax_rate: marginal_rate(income, table),
    }
}

pub async fn run_http_server(port: u16, table: ActiveTable) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(AppState { table });

    let listener = TcpListener::bind(addr).await?;
    log::info!("two-pot calculator listening on http://{addr}");
    log::info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/withdrawal",
            get(withdrawal_get_handler).post(withdrawal_post_handler),
        )
        .route(
            "/api/annuity",
            get(annuity_get_handler).post(annuity_post_handler),
        )
        .route(
            "/api/advice",
            get(advice_get_handler).post(advice_post_handler),
        )
        .route("/api/tax", get(tax_handler))
        .route(
            "/api/tax-table",
            get(tax_table_get_handler).put(tax_table_put_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn withdrawal_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<WithdrawalPayload>,
) -> Response {
    withdrawal_handler_impl(&state, payload)
}

async fn withdrawal_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<WithdrawalPayload>,
) -> Response {
    withdrawal_handler_impl(&state, payload)
}

fn withdrawal_handler_impl(state: &AppState, payload: WithdrawalPayload) -> Response {
    let table = state.table.current();
    match withdrawal_response(&table, payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => bad_request("withdrawal", &msg),
    }
}

async fn annuity_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<AnnuityPayload>,
) -> Response {
    annuity_handler_impl(&state, payload)
}

async fn annuity_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnnuityPayload>,
) -> Response {
    annuity_handler_impl(&state, payload)
}

fn annuity_handler_impl(state: &AppState, payload: AnnuityPayload) -> Response {
    let table = state.table.current();
    match annuity_response(&table, payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => bad_request("annuity", &msg),
    }
}

async fn advice_get_handler(Query(payload): Query<AdvicePayload>) -> Response {
    advice_handler_impl(payload)
}

async fn advice_post_handler(Json(payload): Json<AdvicePayload>) -> Response {
    advice_handler_impl(payload)
}

fn advice_handler_impl(payload: AdvicePayload) -> Response {
    match advice_input_from_payload(payload) {
        Ok(input) => json_response(StatusCode::OK, AdviceResponse::from(advise(&input))),
        Err(msg) => bad_request("advice", &msg),
    }
}

async fn tax_handler(State(state): State<AppState>, Query(query): Query<TaxQuery>) -> Response {
    let table = state.table.current();
    json_response(StatusCode::OK, tax_response(&table, query))
}

async fn tax_table_get_handler(State(state): State<AppState>) -> Response {
    let table = state.table.current();
    json_response(StatusCode::OK, &*table)
}

async fn tax_table_put_handler(
    State(state): State<AppState>,
    Json(table): Json<TaxTable>,
) -> Response {
    match state.table.replace(table) {
        Ok(table) => json_response(StatusCode::OK, &*table),
        Err(err) => bad_request("tax-table", &err.to_string()),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn bad_request(endpoint: &str, msg: &str) -> Response {
    log::warn!("rejected {endpoint} request: {msg}");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
