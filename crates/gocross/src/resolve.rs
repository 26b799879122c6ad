//! Expanding target specifiers into concrete targets.
//!
//! A specifier is one of:
//! - `all`: every platform the Go toolchain supports
//! - a group name (`desktop`, `mobile`, ...), see `data/platforms.json`
//! - a literal `os/arch` pair
//! - a bare OS name (`freebsd`), built for the host architecture
//!
//! Comma-separated lists are split, so `"linux/amd64, web"` is two specifiers.

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::Result;

use crate::error::ValidationError;
use crate::host::HostPlatform;
use crate::platform::{self, TargetDescriptor};

/// Something that can list the supported `os/arch` matrix.
pub trait PlatformSource: Send + Sync {
    fn platforms(&self) -> Result<Vec<(String, String)>>;
}

/// The built-in matrix from `data/platforms.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPlatforms;

impl PlatformSource for StaticPlatforms {
    fn platforms(&self) -> Result<Vec<(String, String)>> {
        Ok(static_matrix())
    }
}

fn static_matrix() -> Vec<(String, String)> {
    platform::known_platforms()
        .iter()
        .map(|(os, arch)| (os.to_string(), arch.to_string()))
        .collect()
}

/// The supported matrix, fetched at most once.
pub struct PlatformCatalog {
    source: Box<dyn PlatformSource>,
    cache: OnceLock<Vec<(String, String)>>,
}

impl PlatformCatalog {
    pub fn new(source: impl PlatformSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: OnceLock::new(),
        }
    }

    /// A catalog that never runs anything.
    pub fn builtin() -> Self {
        Self::new(StaticPlatforms)
    }

    pub fn supported(&self) -> &[(String, String)] {
        self.cache.get_or_init(|| match self.source.platforms() {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::warn!(
                    error = %format!("{e:#}"),
                    "Could not list platforms from the Go toolchain, using built-in list"
                );
                static_matrix()
            }
        })
    }

    pub fn is_supported(&self, os: &str, arch: &str) -> bool {
        self.supported().iter().any(|(o, a)| o == os && a == arch)
    }

    /// Architectures supported for `os`, in catalog order.
    pub fn archs_for(&self, os: &str) -> Vec<&str> {
        self.supported()
            .iter()
            .filter(|(o, _)| o == os)
            .map(|(_, a)| a.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Expand a bare OS name to every architecture instead of the host's.
    pub all_arches: bool,
}

/// Turns specifiers into a deduplicated, ordered target list.
pub struct TargetResolver {
    catalog: PlatformCatalog,
    host: HostPlatform,
    options: ResolveOptions,
}

impl TargetResolver {
    pub fn new(catalog: PlatformCatalog, host: HostPlatform) -> Self {
        Self {
            catalog,
            host,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &PlatformCatalog {
        &self.catalog
    }

    /// Resolve every specifier. Any bad specifier fails the whole call.
    pub fn resolve<S: AsRef<str>>(
        &self,
        specifiers: &[S],
    ) -> Result<Vec<TargetDescriptor>, ValidationError> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        let items = specifiers
            .iter()
            .flat_map(|s| s.as_ref().split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        for item in items {
            for target in self.expand(item)? {
                if seen.insert(target.clone()) {
                    targets.push(target);
                }
            }
        }

        if targets.is_empty() {
            return Err(ValidationError::Empty);
        }
        tracing::debug!(count = targets.len(), "Resolved targets");
        Ok(targets)
    }

    fn expand(&self, spec: &str) -> Result<Vec<TargetDescriptor>, ValidationError> {
        if spec == "all" {
            return Ok(self
                .catalog
                .supported()
                .iter()
                .map(|(os, arch)| TargetDescriptor::new(os.as_str(), arch.as_str()))
                .collect());
        }

        if let Some(members) = platform::group(spec) {
            return Ok(members
                .iter()
                .map(|(os, arch)| TargetDescriptor::new(*os, *arch))
                .collect());
        }

        if spec.contains('/') {
            let target = TargetDescriptor::parse(spec)?;
            if !self.catalog.is_supported(target.os(), target.arch()) {
                return Err(ValidationError::Unsupported(spec.to_string()));
            }
            return Ok(vec![target]);
        }

        let archs = self.catalog.archs_for(spec);
        if archs.is_empty() {
            return Err(ValidationError::UnknownSpecifier(spec.to_string()));
        }
        if self.options.all_arches {
            return Ok(archs.into_iter().map(|a| TargetDescriptor::new(spec, a)).collect());
        }
        if archs.contains(&self.host.arch.as_str()) {
            return Ok(vec![TargetDescriptor::new(spec, self.host.arch.as_str())]);
        }
        Err(ValidationError::HostArchUnsupported {
            os: spec.to_string(),
            arch: self.host.arch.clone(),
        })
    }
}
