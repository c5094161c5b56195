//! Promotion topology of a DeploymentPipeline.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use thiserror::Error;

use crate::domain::typed::{ConversionError, DeploymentPipelineSpec};
use crate::index::ResourceEntry;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Deployment pipeline '{0}' has no promotion paths defined")]
    NoPromotionPaths(String),

    #[error("Deployment pipeline '{0}' has no root environment (all sources are also targets)")]
    NoRootEnvironment(String),

    #[error("Deployment pipeline '{pipeline}' has more than one root environment: {roots:?}")]
    MultipleRoots {
        pipeline: String,
        roots: Vec<String>,
    },

    #[error("Environment name is empty")]
    EmptyEnvironment,

    #[error("Environment '{environment}' does not exist in deployment pipeline '{pipeline}'")]
    UnknownEnvironment {
        environment: String,
        pipeline: String,
    },

    #[error(
        "Environment '{environment}' in deployment pipeline '{pipeline}' is promoted from several environments: {sources:?}"
    )]
    AmbiguousPredecessor {
        environment: String,
        pipeline: String,
        sources: Vec<String>,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Parsed promotion graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInfo {
    pub name: String,
    /// The single environment that is never a promotion target.
    pub root_environment: String,
    /// Every environment mentioned by a promotion path, sorted.
    pub environments: Vec<String>,
    /// Source environment to its targets, in document order.
    pub promotion_paths: BTreeMap<String, Vec<String>>,
    /// Breadth-first distance from the root. Unreachable environments are absent.
    pub env_position: HashMap<String, usize>,
}

impl PipelineInfo {
    /// Reads the topology out of a DeploymentPipeline document.
    pub fn parse(entry: &ResourceEntry) -> Result<Self, PipelineError> {
        let spec = DeploymentPipelineSpec::try_from(entry)?;
        let paths = spec.promotion_paths.iter().map(|path| {
            (
                path.source_environment_ref.as_str(),
                path.target_environment_refs
                    .iter()
                    .map(|target| target.as_str())
                    .collect::<Vec<_>>(),
            )
        });
        Self::from_paths(entry.name(), paths)
    }

    /// Builds the topology from `(source, targets)` pairs.
    ///
    /// Empty source or target names are ignored; a source listed twice has
    /// its targets merged.
    pub fn from_paths<'a, I, T>(name: &str, paths: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (&'a str, T)>,
        T: IntoIterator<Item = &'a str>,
    {
        let mut promotion_paths: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut environments: BTreeSet<String> = BTreeSet::new();
        let mut sources_in_order: Vec<String> = Vec::new();

        for (source, targets) in paths {
            if source.is_empty() {
                continue;
            }
            environments.insert(source.to_string());
            if !promotion_paths.contains_key(source) {
                sources_in_order.push(source.to_string());
            }
            let entry = promotion_paths.entry(source.to_string()).or_default();
            for target in targets.into_iter().filter(|t| !t.is_empty()) {
                environments.insert(target.to_string());
                if !entry.iter().any(|existing| existing == target) {
                    entry.push(target.to_string());
                }
            }
        }

        if promotion_paths.is_empty() {
            return Err(PipelineError::NoPromotionPaths(name.to_string()));
        }

        let root_environment = find_root(name, &sources_in_order, &promotion_paths)?;
        let env_position = assign_positions(&root_environment, &promotion_paths);

        Ok(Self {
            name: name.to_string(),
            root_environment,
            environments: environments.into_iter().collect(),
            promotion_paths,
            env_position,
        })
    }

    /// Fails for an empty name or an environment without a position.
    pub fn validate_environment(&self, environment: &str) -> Result<(), PipelineError> {
        if environment.is_empty() {
            return Err(PipelineError::EmptyEnvironment);
        }
        if !self.env_position.contains_key(environment) {
            return Err(self.unknown(environment));
        }
        Ok(())
    }

    pub fn is_root_environment(&self, environment: &str) -> bool {
        self.root_environment == environment
    }

    pub fn environment_position(&self, environment: &str) -> Result<usize, PipelineError> {
        self.env_position
            .get(environment)
            .copied()
            .ok_or_else(|| self.unknown(environment))
    }

    /// The environment promoting into `environment`, or `None` for the root.
    ///
    /// An environment targeted by more than one source has no single
    /// predecessor and is rejected.
    pub fn previous_environment(&self, environment: &str) -> Result<Option<String>, PipelineError> {
        self.validate_environment(environment)?;
        if self.is_root_environment(environment) {
            return Ok(None);
        }

        let sources: Vec<String> = self
            .promotion_paths
            .iter()
            .filter(|(_, targets)| targets.iter().any(|t| t == environment))
            .map(|(source, _)| source.clone())
            .collect();

        match sources.as_slice() {
            [] => Err(self.unknown(environment)),
            [source] => Ok(Some(source.clone())),
            _ => Err(PipelineError::AmbiguousPredecessor {
                environment: environment.to_string(),
                pipeline: self.name.clone(),
                sources,
            }),
        }
    }

    fn unknown(&self, environment: &str) -> PipelineError {
        PipelineError::UnknownEnvironment {
            environment: environment.to_string(),
            pipeline: self.name.clone(),
        }
    }
}

fn find_root(
    name: &str,
    sources_in_order: &[String],
    promotion_paths: &BTreeMap<String, Vec<String>>,
) -> Result<String, PipelineError> {
    let targets: BTreeSet<&str> = promotion_paths
        .values()
        .flatten()
        .map(String::as_str)
        .collect();

    let roots: Vec<String> = sources_in_order
        .iter()
        .filter(|source| !targets.contains(source.as_str()))
        .cloned()
        .collect();

    match roots.len() {
        0 => Err(PipelineError::NoRootEnvironment(name.to_string())),
        1 => Ok(roots.into_iter().next().unwrap_or_default()),
        _ => Err(PipelineError::MultipleRoots {
            pipeline: name.to_string(),
            roots,
        }),
    }
}

fn assign_positions(
    root: &str,
    promotion_paths: &BTreeMap<String, Vec<String>>,
) -> HashMap<String, usize> {
    let mut positions = HashMap::from([(root.to_string(), 0)]);
    let mut queue = VecDeque::from([root.to_string()]);

    while let Some(current) = queue.pop_front() {
        let position = positions.get(&current).copied().unwrap_or_default();
        for target in promotion_paths.get(&current).into_iter().flatten() {
            if !positions.contains_key(target) {
                positions.insert(target.clone(), position + 1);
                queue.push_back(target.clone());
            }
        }
    }

    positions
}
