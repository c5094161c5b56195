//! Output directory resolution and the release-config sidecar.

mod common;

use chrono::NaiveDate;
use choreo_gitops::config::ReleaseConfig;
use choreo_gitops::generator::ReleaseOptions;
use choreo_gitops::output::{render_documents, ArtifactKind, OutputDirSource, WriteOptions};
use choreo_gitops::{ChoreoError, ConfigError, GitOpsRepository};
use common::fixture::{COMPONENT, PROJECT};
use common::*;
use serde_json::json;

const SIDECAR: &str = "apiVersion: openchoreo.dev/v1alpha1
kind: ReleaseConfig
componentReleaseDefaults:
  defaultOutputDir: ./all-releases
  projects:
    demo:
      defaultOutputDir: ./demo-releases
      components:
        greeter: ./greeter-releases
releaseBindingDefaults:
  defaultOutputDir: ./all-bindings
";

fn greeter_options() -> ReleaseOptions {
    ReleaseOptions::new(COMPONENT, PROJECT, NAMESPACE)
        .with_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
}

#[test]
fn test_sidecar_tiers_pick_most_specific_dir() {
    let repo = RepoFixture::standard();
    repo.write("release-config.yaml", SIDECAR);
    repo.write_docs(
        "projects/demo/components/worker/component.yaml",
        &[component("worker", PROJECT, &[])],
    );
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    assert!(gitops.config().is_some());
    // the sidecar is configuration, not a resource
    assert!(gitops
        .index()
        .get_by_file(&repo.path("release-config.yaml"))
        .is_empty());

    let writer = gitops.writer();
    let opts = WriteOptions::default();
    let cases = [
        (ArtifactKind::Release, PROJECT, COMPONENT, "greeter-releases", OutputDirSource::ComponentOverride),
        (ArtifactKind::Release, PROJECT, "worker", "demo-releases", OutputDirSource::ProjectDefault),
        (ArtifactKind::Release, "other", "api", "all-releases", OutputDirSource::GlobalDefault),
        (ArtifactKind::Binding, PROJECT, COMPONENT, "all-bindings", OutputDirSource::GlobalDefault),
    ];
    for (kind, project, component, dir, source) in cases {
        let resolved = writer.output_dir(kind, project, component, &opts);
        assert_eq!(resolved.source, source, "{}/{}", project, component);
        assert_eq!(resolved.dir, repo.path(dir));
    }

    let (_, outcome) = gitops.create_release(&greeter_options(), &opts).unwrap();
    assert_eq!(
        outcome.path(),
        repo.path("greeter-releases/greeter-20250301-0.yaml")
    );
}

#[test]
fn test_resolver_and_convention_without_sidecar() {
    let repo = RepoFixture::standard();
    repo.write_docs(
        "history/greeter-20250101-0.yaml",
        &[release("greeter-20250101-0", PROJECT, COMPONENT)],
    );
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    let writer = gitops.writer();
    let opts = WriteOptions::default();

    let resolved = writer.output_dir(ArtifactKind::Release, PROJECT, COMPONENT, &opts);
    assert_eq!(resolved.source, OutputDirSource::Resolver);
    assert_eq!(resolved.dir, repo.path("history"));

    // nothing in the index knows this component
    let resolved = writer.output_dir(ArtifactKind::Release, "other", "api", &opts);
    assert_eq!(resolved.source, OutputDirSource::Convention);
    assert_eq!(
        resolved.dir,
        repo.path("projects/other/components/api/releases")
    );

    let explicit = WriteOptions::default().with_output_dir("out");
    let resolved = writer.output_dir(ArtifactKind::Release, PROJECT, COMPONENT, &explicit);
    assert_eq!(resolved.source, OutputDirSource::Explicit);
    assert_eq!(resolved.dir, repo.path("out"));
}

#[test]
fn test_invalid_sidecar_fails_open() {
    let repo = RepoFixture::standard();
    repo.write(
        "release-config.yaml",
        "apiVersion: openchoreo.dev/v1alpha1\nkind: Settings\n",
    );
    let err = GitOpsRepository::open(repo.root()).unwrap_err();
    assert!(matches!(
        err,
        ChoreoError::Config(ConfigError::Validation { .. })
    ));

    repo.write("release-config.yaml", "kind: [broken\n");
    let err = GitOpsRepository::open(repo.root()).unwrap_err();
    assert!(matches!(err, ChoreoError::Config(ConfigError::Parse { .. })));
}

#[test]
fn test_sidecar_loads_standalone() {
    let repo = RepoFixture::new();
    let path = repo.write("release-config.yaml", SIDECAR);
    let config = ReleaseConfig::load(&path).unwrap();
    assert_eq!(
        config.release_output_dir("demo", "greeter").map(|(_, dir)| dir),
        Some("./greeter-releases")
    );
    assert_eq!(
        config.binding_output_dir("demo", "greeter").map(|(_, dir)| dir),
        Some("./all-bindings")
    );
}

#[test]
fn test_dry_run_rendering() {
    let repo = RepoFixture::standard();
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    let info = gitops
        .release_generator()
        .generate_release(&greeter_options())
        .unwrap();

    let rendered = render_documents(&[info.release.clone()]).unwrap();
    assert!(rendered.starts_with("---\napiVersion: openchoreo.dev/v1alpha1\n"));
    assert!(rendered.contains("name: greeter-20250301-0"));

    let parsed: serde_json::Value = serde_yaml::from_str(&rendered).unwrap();
    assert_eq!(
        parsed["spec"]["owner"],
        json!({ "projectName": "demo", "componentName": "greeter" })
    );
}
