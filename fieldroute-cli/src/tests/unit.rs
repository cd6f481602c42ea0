//! Focused unit tests covering plan CLI configuration validation.

use super::helpers::{
    CLI_AGENT, CLI_FEED_URL, CLI_SOLVER_URL, ENV_LAYER_FEED_URL, FILE_AGENT, FILE_FEED_URL,
    FILE_SOLVER_URL,
};
use super::*;
use rstest::rstest;
use std::{path::PathBuf, time::Duration};

#[rstest]
#[case(None, Some(CLI_FEED_URL), Some(CLI_AGENT), ARG_SOLVER_URL, ENV_PLAN_SOLVER_URL)]
#[case(Some(CLI_SOLVER_URL), None, Some(CLI_AGENT), ARG_FEED_URL, ENV_PLAN_FEED_URL)]
#[case(
    Some(CLI_SOLVER_URL),
    Some(CLI_FEED_URL),
    None,
    ARG_AGENT,
    ENV_PLAN_AGENT
)]
fn converting_without_required_fields_errors(
    #[case] solver: Option<&str>,
    #[case] feed: Option<&str>,
    #[case] agent: Option<&str>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let args = PlanArgs {
        solver_url: solver.map(str::to_string),
        feed_url: feed.map(str::to_string),
        agent: agent.map(str::to_string),
        ..PlanArgs::default()
    };
    let err = PlanConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

fn minimal_plan_args() -> PlanArgs {
    PlanArgs {
        solver_url: Some(CLI_SOLVER_URL.to_string()),
        feed_url: Some(CLI_FEED_URL.to_string()),
        agent: Some(CLI_AGENT.to_string()),
        ..PlanArgs::default()
    }
}

#[rstest]
fn plan_config_applies_database_default() {
    let config = PlanConfig::try_from(minimal_plan_args()).expect("config should build");
    assert_eq!(config.db, PathBuf::from(DEFAULT_DB));
    assert!(config.region.is_none());
    assert!(config.depot.is_none());
    assert!(config.timeout.is_none());
}

#[rstest]
fn plan_config_maps_optional_fields() {
    let args = PlanArgs {
        db: Some(PathBuf::from("custom.db")),
        route_tag: Some("tuesday".to_string()),
        select: vec![3, 5],
        bbox: Some("41.0,40.0,-82.0,-83.0".to_string()),
        depot: Some(7),
        timeout_secs: Some(5),
        ..minimal_plan_args()
    };
    let config = PlanConfig::try_from(args).expect("config should build");
    assert_eq!(config.db, PathBuf::from("custom.db"));
    assert_eq!(config.route_tag.as_deref(), Some("tuesday"));
    assert_eq!(config.select, vec![3, 5]);
    assert_eq!(config.depot, Some(7));
    assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    let region = config.region.expect("bbox should resolve to a region");
    assert_eq!(
        region,
        Region::BoundingBox {
            north: 41.0,
            south: 40.0,
            east: -82.0,
            west: -83.0,
        }
    );
}

#[rstest]
fn parse_bbox_accepts_whitespace_padding() {
    let region = parse_bbox(" 41.0 , 40.0 , -82.0 , -83.0 ").expect("bbox should parse");
    assert_eq!(
        region,
        Region::BoundingBox {
            north: 41.0,
            south: 40.0,
            east: -82.0,
            west: -83.0,
        }
    );
}

#[rstest]
#[case::too_few_bounds("41.0,40.0,-82.0")]
#[case::too_many_bounds("41.0,40.0,-82.0,-83.0,1.0")]
#[case::not_numbers("north,south,east,west")]
#[case::empty("")]
fn parse_bbox_rejects_malformed_input(#[case] raw: &str) {
    let err = parse_bbox(raw).expect_err("malformed bbox should error");
    match err {
        CliError::InvalidBoundingBox { value } => assert_eq!(value, raw),
        other => panic!("expected InvalidBoundingBox, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "solver_url": 42 }));

    let err = plan_config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence_and_defaults_database() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "solver_url": FILE_SOLVER_URL,
            "feed_url": FILE_FEED_URL,
            "agent": FILE_AGENT,
        }),
        None,
    );
    composer.push_environment(json!({
        "feed_url": ENV_LAYER_FEED_URL,
    }));
    composer.push_cli(json!({
        "agent": CLI_AGENT,
    }));

    let config =
        plan_config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.solver_url, FILE_SOLVER_URL);
    assert_eq!(config.feed_url, ENV_LAYER_FEED_URL);
    assert_eq!(config.agent, CLI_AGENT);
    assert_eq!(config.db, PathBuf::from(DEFAULT_DB));
}
