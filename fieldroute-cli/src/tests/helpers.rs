//! Test helpers for composing plan CLI arguments and layered overrides.

use super::*;

pub(super) const CLI_SOLVER_URL: &str = "http://solver.cli.test";
pub(super) const CLI_FEED_URL: &str = "http://feed.cli.test";
pub(super) const CLI_AGENT: &str = "cli-agent";
pub(super) const FILE_SOLVER_URL: &str = "http://solver.file.test";
pub(super) const FILE_FEED_URL: &str = "http://feed.file.test";
pub(super) const FILE_AGENT: &str = "file-agent";
pub(super) const ENV_LAYER_FEED_URL: &str = "http://feed.env.test";

#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) solver_url: Option<String>,
    pub(super) feed_url: Option<String>,
    pub(super) agent: Option<String>,
}

pub(super) fn merge_layers(
    mut cli_args: PlanArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<PlanConfig, CliError> {
    merge_field(
        &mut cli_args.solver_url,
        extract_field(&env_layer, |layer| &layer.solver_url),
        extract_field(&file_layer, |layer| &layer.solver_url),
    );
    merge_field(
        &mut cli_args.feed_url,
        extract_field(&env_layer, |layer| &layer.feed_url),
        extract_field(&file_layer, |layer| &layer.feed_url),
    );
    merge_field(
        &mut cli_args.agent,
        extract_field(&env_layer, |layer| &layer.agent),
        extract_field(&file_layer, |layer| &layer.agent),
    );
    PlanConfig::try_from(cli_args)
}

fn merge_field<T: Clone>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none()
        && let Some(value) = env_value.or(file_value)
    {
        *target = Some(value);
    }
}

fn extract_field<T: Clone>(
    layer: &Option<LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.as_ref().and_then(|entry| accessor(entry).clone())
}
