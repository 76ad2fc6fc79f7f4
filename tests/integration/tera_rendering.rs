//! Rendering the asset templates with the in-process Tera engine.

use bosh_render_cli::context::RenderInputs;
use bosh_render_cli::core::{ErrorKind, RenderError};
use bosh_render_cli::engine::EngineKind;
use bosh_render_cli::job::{JobRenderer, JobSpec};
use bosh_render_cli::links::LinkResolver;
use bosh_render_cli::render::RenderDriver;
use serde_json::json;
use tempfile::TempDir;

use crate::common::{asset, context_for, deployment_inputs, engine_config, render_asset};

const ENGINE: EngineKind = EngineKind::Tera;

#[tokio::test]
async fn test_render_supplied_value() {
    let output = render_asset(ENGINE, "simple_job.MF", "simple_test.tera", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "bar\n");
}

#[tokio::test]
async fn test_render_default_value() {
    let output = render_asset(ENGINE, "simple_job.MF", "simple_test.tera", &RenderInputs::default()).await.unwrap();
    assert_eq!(output, "baz\n");
}

#[tokio::test]
async fn test_render_instance_info() {
    let output =
        render_asset(ENGINE, "simple_job.MF", "instance_info_test.tera", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "foo.deadbeef.com myaz false mydeployment 005443 123 256.256.256.256 foo\n");
}

#[tokio::test]
async fn test_render_bootstrap_instance() {
    let mut inputs = deployment_inputs();
    inputs.instance.index = json!(0);

    let output = render_asset(ENGINE, "simple_job.MF", "instance_info_test.tera", &inputs).await.unwrap();
    assert!(output.contains(" myaz true mydeployment 005443 0 "), "{output}");
}

#[tokio::test]
async fn test_render_link_instances() {
    let output = render_asset(ENGINE, "simple_job.MF", "link_test.tera", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "11 link.domain.foo linkaz 11nk1d");
}

#[tokio::test]
async fn test_render_link_property() {
    let output =
        render_asset(ENGINE, "simple_job.MF", "link_property_test.tera", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "toaster");
}

#[tokio::test]
async fn test_empty_link_is_absent() {
    let context = context_for("simple_job.MF", &deployment_inputs()).unwrap();
    assert!(context.links().contains("myprovider"));
    assert!(!context.links().contains("emptyprovider"));
}

#[tokio::test]
async fn test_render_without_properties_section() {
    let output =
        render_asset(ENGINE, "no_properties_job.MF", "no_properties_test.tera", &RenderInputs::default()).await.unwrap();
    assert_eq!(output, "no_properties\n");
}

#[tokio::test]
async fn test_render_structured_property_as_json() {
    let output = render_asset(ENGINE, "simple_job.MF", "json_test.tera", &deployment_inputs()).await.unwrap();
    assert_eq!(output, "{\"Foo\":\"bar\",\"Bar\":\"baz\"}\n");
}

#[tokio::test]
async fn test_render_bad_template() {
    let err = render_asset(ENGINE, "simple_job.MF", "bad_test.tera", &deployment_inputs()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TemplateExpansion);
    match err {
        RenderError::TemplateExpansion {
            diagnostic,
            template,
            ..
        } => {
            assert!(diagnostic.contains("thisdoesntexist"), "{diagnostic}");
            assert!(template.ends_with("bad_test.tera"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_render_whole_job() {
    let temp = TempDir::new().unwrap();
    let job_dir = temp.path().join("job");
    let templates = job_dir.join("templates");
    std::fs::create_dir_all(&templates).unwrap();
    for name in ["simple_test.tera", "instance_info_test.tera", "link_test.tera"] {
        std::fs::copy(asset(name), templates.join(name)).unwrap();
    }

    let job = JobSpec {
        templates: [
            ("simple_test.tera", "config/simple"),
            ("instance_info_test.tera", "config/instance"),
            ("link_test.tera", "bin/link"),
        ]
        .into_iter()
        .map(|(src, dst)| (src.to_string(), dst.to_string()))
        .collect(),
        ..JobSpec::load(&asset("simple_job.MF")).unwrap()
    };
    let out = temp.path().join("out");

    let report = JobRenderer::new(RenderDriver::from_config(&engine_config(ENGINE)))
        .with_max_parallel(2)
        .render_job(&job, &templates, &deployment_inputs(), &LinkResolver::new(), &out)
        .await
        .unwrap();

    assert!(report.is_success(), "{:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(std::fs::read_to_string(out.join("config/simple")).unwrap(), "bar\n");
    assert_eq!(std::fs::read_to_string(out.join("bin/link")).unwrap(), "11 link.domain.foo linkaz 11nk1d");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(out.join("bin/link")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
