//! Rendering the asset templates with Ruby and `bosh-template`.
//!
//! Every test returns early when the engine is not installed.

use bosh_render_cli::context::RenderInputs;
use bosh_render_cli::core::{ErrorKind, RenderError};
use bosh_render_cli::engine::EngineKind;
use bosh_render_cli::test_utils::erb_engine_available;
use serde_json::json;

use crate::common::{deployment_inputs, render_asset};

const ENGINE: EngineKind = EngineKind::Erb;

#[tokio::test]
async fn test_render_supplied_value() {
    if !erb_engine_available().await {
        return;
    }
    let output = render_asset(ENGINE, "simple_job.MF", "simple_test.erb", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "bar\n");
}

#[tokio::test]
async fn test_render_default_value() {
    if !erb_engine_available().await {
        return;
    }
    let output = render_asset(ENGINE, "simple_job.MF", "simple_test.erb", &RenderInputs::default()).await.unwrap();
    assert_eq!(output, "baz\n");
}

#[tokio::test]
async fn test_render_instance_info() {
    if !erb_engine_available().await {
        return;
    }
    let output =
        render_asset(ENGINE, "simple_job.MF", "instance_info_test.erb", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "foo.deadbeef.com myaz false mydeployment 005443 123 256.256.256.256 foo\n");
}

#[tokio::test]
async fn test_render_numeric_string_index() {
    if !erb_engine_available().await {
        return;
    }
    let mut inputs = deployment_inputs();
    inputs.instance.index = json!("0");

    let output = render_asset(ENGINE, "simple_job.MF", "instance_info_test.erb", &inputs).await.unwrap();
    assert!(output.contains(" myaz true mydeployment 005443 0 "), "{output}");
}

#[tokio::test]
async fn test_render_link_instances() {
    if !erb_engine_available().await {
        return;
    }
    let output = render_asset(ENGINE, "simple_job.MF", "link_test.erb", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "11 link.domain.foo linkaz 11nk1d");
}

#[tokio::test]
async fn test_render_link_property() {
    if !erb_engine_available().await {
        return;
    }
    let output =
        render_asset(ENGINE, "simple_job.MF", "link_property_test.erb", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "toaster");
}

#[tokio::test]
async fn test_render_without_properties_section() {
    if !erb_engine_available().await {
        return;
    }
    let output =
        render_asset(ENGINE, "no_properties_job.MF", "no_properties_test.erb", &RenderInputs::default()).await.unwrap();
    assert_eq!(output, "no_properties\n");
}

#[tokio::test]
async fn test_render_structured_property_as_json() {
    if !erb_engine_available().await {
        return;
    }
    let output = render_asset(ENGINE, "simple_job.MF", "json_test.erb", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "{\"Foo\":\"bar\",\"Bar\":\"baz\"}\n");
}

#[tokio::test]
async fn test_render_bad_template() {
    if !erb_engine_available().await {
        return;
    }
    let err = render_asset(ENGINE, "simple_job.MF", "bad_test.erb", &deployment_inputs()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TemplateExpansion);
    match err {
        RenderError::TemplateExpansion {
            diagnostic,
            line,
            ..
        } => {
            assert!(diagnostic.contains("thisdoesntexist"), "{diagnostic}");
            assert_eq!(line, Some(2));
        }
        other => panic!("unexpected error: {other}"),
    }
}
