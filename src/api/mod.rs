use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    Diagnostic, EmissionInput, HistoricalPoint, LongTermTarget, NearTermTarget, ReductionModel,
    YearPoint, compute_pathway,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliReductionModel {
    Sbti,
    NationalStaged,
    CustomTwoPhase,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiReductionModel {
    #[serde(alias = "SBTi")]
    Sbti,
    #[serde(alias = "nationalStaged", alias = "national_staged", alias = "taiwan")]
    NationalStaged,
    #[serde(alias = "customTwoPhase", alias = "custom_two_phase", alias = "custom")]
    CustomTwoPhase,
}

impl From<ApiReductionModel> for CliReductionModel {
    fn from(value: ApiReductionModel) -> Self {
        match value {
            ApiReductionModel::Sbti => CliReductionModel::Sbti,
            ApiReductionModel::NationalStaged => CliReductionModel::NationalStaged,
            ApiReductionModel::CustomTwoPhase => CliReductionModel::CustomTwoPhase,
        }
    }
}

impl From<CliReductionModel> for ApiReductionModel {
    fn from(value: CliReductionModel) -> Self {
        match value {
            CliReductionModel::Sbti => ApiReductionModel::Sbti,
            CliReductionModel::NationalStaged => ApiReductionModel::NationalStaged,
            CliReductionModel::CustomTwoPhase => ApiReductionModel::CustomTwoPhase,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiHistoricalPoint {
    year: i32,
    emissions: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PathwayPayload {
    scope1: Option<f64>,
    scope2: Option<f64>,
    base_year: Option<i32>,
    target_year: Option<i32>,
    residual_emission_percentage: Option<f64>,
    model: Option<ApiReductionModel>,
    near_term_year: Option<i32>,
    near_term_rate: Option<f64>,
    long_term_year: Option<i32>,
    historical_data: Option<Vec<ApiHistoricalPoint>>,
}

#[derive(Parser, Debug)]
#[command(
    name = "glidepath",
    about = "Carbon reduction pathway engine (SBTi decay, national staged milestones, custom two-phase)"
)]
struct Cli {
    #[arg(long, help = "Scope 1 (direct) emissions in the base year")]
    scope1: f64,
    #[arg(long, help = "Scope 2 (purchased energy) emissions in the base year")]
    scope2: f64,
    #[arg(long, default_value_t = 2024)]
    base_year: i32,
    #[arg(long, default_value_t = 2050, help = "Net-zero target year")]
    target_year: i32,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Share of baseline emissions still emitted at the target year, in percent"
    )]
    residual_emission_percentage: f64,
    #[arg(long, value_enum, default_value_t = CliReductionModel::Sbti)]
    model: CliReductionModel,
    #[arg(
        long,
        help = "Custom model: last year of the near-term decay phase; required when --model=custom-two-phase"
    )]
    near_term_year: Option<i32>,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Custom model: near-term annual reduction rate in percent"
    )]
    near_term_rate: f64,
    #[arg(
        long,
        help = "Custom model: long-term phase end year; defaults to --target-year"
    )]
    long_term_year: Option<i32>,
}

#[derive(Debug)]
struct ApiRequest {
    input: EmissionInput,
    model: ApiReductionModel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PathwayResponse {
    model: ApiReductionModel,
    base_year: i32,
    target_year: i32,
    baseline_emissions: f64,
    residual_target: f64,
    pathway: Vec<YearPoint>,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_input(cli: Cli, historical_data: Vec<HistoricalPoint>) -> Result<EmissionInput, String> {
    let model = match cli.model {
        CliReductionModel::Sbti => ReductionModel::Sbti,
        CliReductionModel::NationalStaged => ReductionModel::NationalStaged,
        CliReductionModel::CustomTwoPhase => {
            let Some(near_term_year) = cli.near_term_year else {
                return Err(
                    "--near-term-year is required when --model=custom-two-phase".to_string()
                );
            };
            ReductionModel::CustomTwoPhase {
                near_term: NearTermTarget {
                    year: near_term_year,
                    annual_reduction_rate: cli.near_term_rate / 100.0,
                },
                long_term: LongTermTarget {
                    year: cli.long_term_year.unwrap_or(cli.target_year),
                },
            }
        }
    };

    let input = EmissionInput {
        scope1: cli.scope1,
        scope2: cli.scope2,
        base_year: cli.base_year,
        target_year: cli.target_year,
        residual_emission_percentage: cli.residual_emission_percentage,
        historical_data,
        model,
    };
    input.validate().map_err(|e| e.to_string())?;
    Ok(input)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/pathway",
            get(pathway_get_handler).post(pathway_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("glidepath HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/pathway");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn pathway_get_handler(Query(payload): Query<PathwayPayload>) -> Response {
    pathway_handler_impl(payload)
}

async fn pathway_post_handler(Json(payload): Json<PathwayPayload>) -> Response {
    pathway_handler_impl(payload)
}

fn pathway_handler_impl(payload: PathwayPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let result = match compute_pathway(&request.input) {
        Ok(result) => result,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let response = PathwayResponse {
        model: request.model,
        base_year: request.input.base_year,
        target_year: request.input.target_year,
        baseline_emissions: request.input.baseline_emissions(),
        residual_target: request.input.residual_emissions().round(),
        pathway: result.pathway,
        diagnostics: result.diagnostics,
    };
    json_response(StatusCode::OK, response)
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<PathwayPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: PathwayPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.scope1 {
        cli.scope1 = v;
    }
    if let Some(v) = payload.scope2 {
        cli.scope2 = v;
    }
    if let Some(v) = payload.base_year {
        cli.base_year = v;
    }
    if let Some(v) = payload.target_year {
        cli.target_year = v;
    }
    if let Some(v) = payload.residual_emission_percentage {
        cli.residual_emission_percentage = v;
    }
    if let Some(v) = payload.model {
        cli.model = v.into();
    }
    if let Some(v) = payload.near_term_year {
        cli.near_term_year = Some(v);
    }
    if let Some(v) = payload.near_term_rate {
        cli.near_term_rate = v;
    }
    if let Some(v) = payload.long_term_year {
        cli.long_term_year = Some(v);
    }

    let historical_data = payload
        .historical_data
        .unwrap_or_default()
        .iter()
        .map(|point| HistoricalPoint {
            year: point.year,
            emissions: point.emissions,
        })
        .collect();

    let model = cli.model.into();
    let input = build_input(cli, historical_data)?;
    Ok(ApiRequest { input, model })
}

fn default_cli_for_api() -> Cli {
    Cli {
        scope1: 1_000.0,
        scope2: 2_000.0,
        base_year: 2024,
        target_year: 2050,
        residual_emission_percentage: 5.0,
        model: CliReductionModel::Sbti,
        near_term_year: None,
        near_term_rate: 2.0,
        long_term_year: None,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
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
mod tests {
    use super::*;
    use crate::core::PathwayResult;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    fn compute(request: &ApiRequest) -> PathwayResult {
        compute_pathway(&request.input).expect("valid request input")
    }

    #[test]
    fn build_input_defaults_long_term_year_to_target_year() {
        let mut cli = sample_cli();
        cli.model = CliReductionModel::CustomTwoPhase;
        cli.near_term_year = Some(2030);

        let input = build_input(cli, Vec::new()).expect("valid input");
        match input.model {
            ReductionModel::CustomTwoPhase { long_term, .. } => {
                assert_eq!(long_term.year, 2050);
            }
            other => panic!("expected custom model, got {other:?}"),
        }
    }

    #[test]
    fn build_input_requires_near_term_year_for_custom_model() {
        let mut cli = sample_cli();
        cli.model = CliReductionModel::CustomTwoPhase;

        let err = build_input(cli, Vec::new()).expect_err("must reject missing near-term year");
        assert!(err.contains("--near-term-year"));
    }

    #[test]
    fn build_input_converts_near_term_rate_from_percent() {
        let mut cli = sample_cli();
        cli.model = CliReductionModel::CustomTwoPhase;
        cli.near_term_year = Some(2029);
        cli.near_term_rate = 2.0;

        let input = build_input(cli, Vec::new()).expect("valid input");
        match input.model {
            ReductionModel::CustomTwoPhase { near_term, .. } => {
                assert_approx(near_term.annual_reduction_rate, 0.02);
            }
            other => panic!("expected custom model, got {other:?}"),
        }
    }

    #[test]
    fn build_input_rejects_invalid_years_via_core_validation() {
        let mut cli = sample_cli();
        cli.target_year = 2024;

        let err = build_input(cli, Vec::new()).expect_err("must reject");
        assert!(err.contains("targetYear"));
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let request = api_request_from_json("{}").expect("defaults are valid");
        assert_eq!(request.model, ApiReductionModel::Sbti);
        assert_approx(request.input.baseline_emissions(), 3_000.0);
        assert_eq!(request.input.base_year, 2024);
        assert_eq!(request.input.target_year, 2050);
    }

    #[test]
    fn payload_accepts_model_aliases() {
        for json in [
            r#"{"model": "national-staged"}"#,
            r#"{"model": "nationalStaged"}"#,
            r#"{"model": "national_staged"}"#,
            r#"{"model": "taiwan"}"#,
        ] {
            let request = api_request_from_json(json).expect("alias must parse");
            assert_eq!(request.model, ApiReductionModel::NationalStaged);
        }
    }

    #[test]
    fn payload_maps_historical_data() {
        let request = api_request_from_json(
            r#"{"historicalData": [{"year": 2021, "emissions": 3150.5}]}"#,
        )
        .expect("valid payload");
        assert_eq!(request.input.historical_data.len(), 1);
        assert_eq!(request.input.historical_data[0].year, 2021);
        assert_approx(request.input.historical_data[0].emissions, 3150.5);
    }

    #[test]
    fn payload_rejects_historical_year_in_planning_window() {
        let err = api_request_from_json(
            r#"{"historicalData": [{"year": 2030, "emissions": 3000}]}"#,
        )
        .expect_err("must reject");
        assert!(err.contains("historical year"));
    }

    #[test]
    fn full_custom_payload_reaches_residual_endpoint() {
        let request = api_request_from_json(
            r#"{
                "scope1": 1000,
                "scope2": 2000,
                "baseYear": 2024,
                "targetYear": 2050,
                "residualEmissionPercentage": 5,
                "model": "custom-two-phase",
                "nearTermYear": 2029,
                "nearTermRate": 2
            }"#,
        )
        .expect("valid payload");
        assert_eq!(request.model, ApiReductionModel::CustomTwoPhase);

        let result = compute(&request);
        let last = result.pathway.last().expect("non-empty pathway");
        assert_eq!(last.year, 2050);
        assert_approx(last.emissions, 150.0);
    }

    #[test]
    fn pathway_rows_serialize_in_camel_case() {
        let request = api_request_from_json("{}").expect("valid payload");
        let result = compute(&request);
        let value = serde_json::to_value(&result.pathway[1]).expect("serializable row");

        let row = value.as_object().expect("row is an object");
        assert!(row.contains_key("annualReduction"));
        assert!(row.contains_key("remainingPercentage"));
        assert!(row.contains_key("reduction"));
        assert!(row.contains_key("target"));
        assert!(!row.contains_key("annual_reduction"));
    }

    #[test]
    fn diagnostics_serialize_with_kind_tag() {
        let request = api_request_from_json(r#"{"residualEmissionPercentage": 90}"#)
            .expect("valid payload");
        let result = compute(&request);
        assert!(!result.diagnostics.is_empty());

        let value = serde_json::to_value(&result.diagnostics[0]).expect("serializable diagnostic");
        assert_eq!(
            value.get("kind").and_then(|k| k.as_str()),
            Some("nonPositiveRemainder")
        );
        assert!(value.get("phaseStartYear").is_some());
    }
}
