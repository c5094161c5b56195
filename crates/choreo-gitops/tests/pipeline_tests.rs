//! Promotion topology read from DeploymentPipeline documents.

mod common;

use choreo_gitops::domain::LookupError;
use choreo_gitops::pipeline::PipelineError;
use choreo_gitops::{ChoreoError, GitOpsRepository};
use common::*;
use serde_json::json;

fn repo_with_pipeline(edges: &[(&str, &str)]) -> RepoFixture {
    let repo = RepoFixture::new();
    repo.write_docs(
        "platform.yaml",
        &[pipeline("default", edges), project("demo", "default")],
    );
    repo
}

#[test]
fn test_linear_pipeline() {
    let repo = repo_with_pipeline(&[("dev", "staging"), ("staging", "prod")]);
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    let pipeline = gitops.pipeline_for_project(NAMESPACE, "demo").unwrap();

    assert_eq!(pipeline.name, "default");
    assert_eq!(pipeline.root_environment, "dev");
    assert_eq!(pipeline.environments, vec!["dev", "prod", "staging"]);
    assert_eq!(pipeline.environment_position("dev").unwrap(), 0);
    assert_eq!(pipeline.environment_position("staging").unwrap(), 1);
    assert_eq!(pipeline.environment_position("prod").unwrap(), 2);
    assert!(pipeline.is_root_environment("dev"));
    assert_eq!(pipeline.previous_environment("dev").unwrap(), None);
    assert_eq!(
        pipeline.previous_environment("prod").unwrap(),
        Some("staging".to_string())
    );
    assert!(matches!(
        pipeline.validate_environment("qa"),
        Err(PipelineError::UnknownEnvironment { .. })
    ));
    assert!(matches!(
        pipeline.validate_environment(""),
        Err(PipelineError::EmptyEnvironment)
    ));
}

#[test]
fn test_fan_out_and_fan_in() {
    let repo = repo_with_pipeline(&[
        ("dev", "qa"),
        ("dev", "staging"),
        ("qa", "prod"),
        ("staging", "prod"),
    ]);
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    let pipeline = gitops.pipeline_for_project(NAMESPACE, "demo").unwrap();

    assert_eq!(pipeline.promotion_paths["dev"], vec!["qa", "staging"]);
    assert_eq!(pipeline.environment_position("qa").unwrap(), 1);
    assert_eq!(pipeline.environment_position("prod").unwrap(), 2);
    assert_eq!(
        pipeline.previous_environment("staging").unwrap(),
        Some("dev".to_string())
    );
    assert!(matches!(
        pipeline.previous_environment("prod"),
        Err(PipelineError::AmbiguousPredecessor { .. })
    ));
}

#[test]
fn test_invalid_topologies() {
    let repo = repo_with_pipeline(&[("dev", "staging"), ("staging", "dev")]);
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    let err = gitops.pipeline_for_project(NAMESPACE, "demo").unwrap_err();
    assert!(matches!(
        err,
        ChoreoError::Lookup(LookupError::Pipeline(PipelineError::NoRootEnvironment(_)))
    ));

    let repo = repo_with_pipeline(&[("dev", "prod"), ("hotfix", "prod")]);
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    let err = gitops.pipeline_for_project(NAMESPACE, "demo").unwrap_err();
    assert!(matches!(
        err,
        ChoreoError::Lookup(LookupError::Pipeline(PipelineError::MultipleRoots { .. }))
    ));

    let repo = repo_with_pipeline(&[]);
    let gitops = GitOpsRepository::open(repo.root()).unwrap();
    let err = gitops.pipeline_for_project(NAMESPACE, "demo").unwrap_err();
    assert!(matches!(
        err,
        ChoreoError::Lookup(LookupError::Pipeline(PipelineError::NoPromotionPaths(_)))
    ));
}

#[test]
fn test_project_pipeline_references() {
    let repo = RepoFixture::new();
    repo.write_docs(
        "platform.yaml",
        &[
            resource("Project", "bare", json!({})),
            project("orphan", "missing"),
            project("nested", "default"),
            pipeline("default", &[("dev", "prod")]),
        ],
    );
    let gitops = GitOpsRepository::open(repo.root()).unwrap();

    assert!(matches!(
        gitops.pipeline_for_project(NAMESPACE, "bare"),
        Err(ChoreoError::Lookup(LookupError::MissingPipelineRef(_)))
    ));
    assert!(matches!(
        gitops.pipeline_for_project(NAMESPACE, "orphan"),
        Err(ChoreoError::Lookup(LookupError::PipelineNotFound(_)))
    ));
    assert!(matches!(
        gitops.pipeline_for_project(NAMESPACE, "ghost"),
        Err(ChoreoError::Lookup(LookupError::ProjectNotFound { .. }))
    ));
    assert_eq!(
        gitops
            .pipeline_for_project(NAMESPACE, "nested")
            .unwrap()
            .root_environment,
        "dev"
    );
}
