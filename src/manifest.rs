//! Graph manifests: declarative format plugins in YAML or JSON.
//!
//! A manifest lists object types, formats with their extensions, converters
//! built from the [`Transform`] set, data detectors built from the
//! [`Matcher`] set, and format aliases. Each manifest file is loaded as one
//! [`FormatPlugin`], so a converter may reference formats declared by a
//! different file.
//!
//! ```yaml
//! formats:
//!   - { name: plain, objtype: data }
//!   - { name: vcard21, objtype: contact }
//! converters:
//!   - { from: plain, to: vcard21, kind: conv, detect_first: true }
//! detectors:
//!   - { from: plain, to: vcard21, matcher: starts_with, pattern: "BEGIN:VCARD" }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::converter::{Conversion, ConverterFlags, ConverterKind};
use crate::env::FormatEnv;
use crate::error::ConvGraphError;
use crate::plugin::FormatPlugin;
use crate::transform::{Matcher, Transform};

/// Top-level manifest document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphManifest {
    #[serde(default)]
    pub objtypes: Vec<ObjTypeEntry>,
    #[serde(default)]
    pub formats: Vec<FormatEntry>,
    #[serde(default)]
    pub converters: Vec<ConverterEntry>,
    #[serde(default)]
    pub detectors: Vec<DetectorEntry>,
    #[serde(default)]
    pub like: Vec<LikeEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjTypeEntry {
    pub name: String,
    /// Format used as the sync hub for this object type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_format: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatEntry {
    pub name: String,
    pub objtype: String,
    /// Rules tried in order; the first match names the format the data
    /// really is.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub report_as: Vec<ReportAsRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionEntry>,
}

/// Transforms run on data converted into (`to`) and out of (`from`) a
/// format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionEntry {
    #[serde(default = "default_transform")]
    pub to: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_arg: Option<String>,
    #[serde(default = "default_transform")]
    pub from: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_arg: Option<String>,
}

fn default_transform() -> Transform {
    Transform::Identity
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportAsRule {
    pub matcher: Matcher,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub format: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterEntry {
    pub from: String,
    pub to: String,
    #[serde(default = "default_kind")]
    pub kind: ConverterKind,
    /// Byte transform of conversion edges. Defaults to `identity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Predicate of detector edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<Matcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lossy: Option<bool>,
    #[serde(default)]
    pub detect_first: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

fn default_kind() -> ConverterKind {
    ConverterKind::Conv
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorEntry {
    pub from: String,
    pub to: String,
    pub matcher: Matcher,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Declares `format` an alias of `base`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikeEntry {
    pub format: String,
    pub base: String,
    #[serde(default)]
    pub lossy_to_base: bool,
    #[serde(default)]
    pub lossy_from_base: bool,
}

impl ConverterEntry {
    /// Builds the edge payload, checking that the entry is complete.
    pub fn conversion(&self) -> Result<Conversion, ConvGraphError> {
        let edge = || format!("converter {} -> {}", self.from, self.to);

        if self.kind == ConverterKind::Detector {
            if self.transform.is_some() || self.arg.is_some() {
                return Err(ConvGraphError::InvalidManifest(format!(
                    "{}: detector edges take a matcher, not a transform",
                    edge()
                )));
            }
            return match self.matcher {
                Some(matcher) => {
                    check_pattern(matcher, self.pattern.as_deref(), &edge())?;
                    Ok(Conversion::Detector(matcher.into_fn(self.pattern.clone())))
                }
                // Traversed only when the source format reports the target.
                None => Ok(Conversion::with_kind(
                    ConverterKind::Detector,
                    Transform::Identity.into_fn(None),
                )),
            };
        }

        if self.matcher.is_some() || self.pattern.is_some() {
            return Err(ConvGraphError::InvalidManifest(format!(
                "{}: only detector edges take a matcher",
                edge()
            )));
        }
        let transform = self.transform.unwrap_or(Transform::Identity);
        check_arg(transform, self.arg.as_deref(), &edge())?;
        Ok(Conversion::with_kind(
            self.kind,
            transform.into_fn(self.arg.clone()),
        ))
    }

    pub fn flags(&self) -> ConverterFlags {
        ConverterFlags {
            detect_first: self.detect_first,
            lossy: self.lossy,
            config: self.config.clone(),
        }
    }
}

fn check_arg(transform: Transform, arg: Option<&str>, what: &str) -> Result<(), ConvGraphError> {
    if transform.requires_arg() && arg.is_none() {
        return Err(ConvGraphError::InvalidManifest(format!(
            "{what}: transform '{}' requires an arg",
            transform.name()
        )));
    }
    Ok(())
}

fn check_pattern(matcher: Matcher, pattern: Option<&str>, what: &str) -> Result<(), ConvGraphError> {
    if matcher.requires_pattern() && pattern.is_none() {
        return Err(ConvGraphError::InvalidManifest(format!(
            "{what}: matcher '{}' requires a pattern",
            matcher.name()
        )));
    }
    Ok(())
}

impl GraphManifest {
    /// Checks every entry without touching an environment.
    pub fn validate(&self) -> Result<(), ConvGraphError> {
        for format in &self.formats {
            for rule in &format.report_as {
                check_pattern(
                    rule.matcher,
                    rule.pattern.as_deref(),
                    &format!("report_as of format {}", format.name),
                )?;
            }
            for extension in &format.extensions {
                let what = format!("extension of format {}", format.name);
                check_arg(extension.to, extension.to_arg.as_deref(), &what)?;
                check_arg(extension.from, extension.from_arg.as_deref(), &what)?;
            }
        }
        for converter in &self.converters {
            converter.conversion()?;
        }
        for detector in &self.detectors {
            check_pattern(
                detector.matcher,
                detector.pattern.as_deref(),
                &format!("detector {} -> {}", detector.from, detector.to),
            )?;
        }
        for like in &self.like {
            if like.format == like.base {
                return Err(ConvGraphError::InvalidManifest(format!(
                    "format {} cannot be like itself",
                    like.format
                )));
            }
        }
        Ok(())
    }
}

/// Reads a manifest, choosing YAML or JSON by file extension.
///
/// `.json` files are parsed as JSON, everything else as YAML.
pub fn read_manifest(path: &Path) -> Result<GraphManifest, ConvGraphError> {
    let file = File::open(path).map_err(ConvGraphError::Io)?;
    let reader = BufReader::new(file);

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let manifest: GraphManifest = if is_json {
        serde_json::from_reader(reader).map_err(|source| ConvGraphError::ManifestJsonParse {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_yaml::from_reader(reader).map_err(|source| ConvGraphError::ManifestYamlParse {
            path: path.to_path_buf(),
            source,
        })?
    };

    manifest.validate()?;
    Ok(manifest)
}

/// Parses a YAML manifest from a string. Entries are not validated.
pub fn from_yaml_str(yaml: &str) -> Result<GraphManifest, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

/// Parses a JSON manifest from a string. Entries are not validated.
pub fn from_json_str(json: &str) -> Result<GraphManifest, serde_json::Error> {
    serde_json::from_str(json)
}

/// Fuzz-only entrypoint: parses, validates and loads a YAML manifest.
#[cfg(feature = "fuzzing")]
pub fn fuzz_load_manifest(input: &str) -> Result<FormatEnv, ConvGraphError> {
    let manifest = from_yaml_str(input).map_err(|source| ConvGraphError::ManifestYamlParse {
        path: PathBuf::from("<fuzz>"),
        source,
    })?;
    manifest.validate()?;

    let plugins: Vec<Box<dyn FormatPlugin>> = vec![Box::new(ManifestPlugin::new("fuzz", manifest))];
    let mut env = FormatEnv::new();
    let report = env.load_plugins(&plugins);
    match report.disabled.into_iter().next() {
        Some(disabled) => Err(ConvGraphError::Plugin {
            plugin: disabled.name,
            message: disabled.error.to_string(),
        }),
        None => Ok(env),
    }
}

/// A manifest acting as a format plugin.
#[derive(Clone, Debug)]
pub struct ManifestPlugin {
    name: String,
    manifest: GraphManifest,
}

impl ManifestPlugin {
    pub fn new(name: impl Into<String>, manifest: GraphManifest) -> Self {
        Self {
            name: name.into(),
            manifest,
        }
    }

    /// Reads a manifest file; the plugin is named after the file stem.
    pub fn from_path(path: &Path) -> Result<Self, ConvGraphError> {
        let manifest = read_manifest(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, manifest))
    }

    pub fn manifest(&self) -> &GraphManifest {
        &self.manifest
    }
}

impl FormatPlugin for ManifestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn format_info(&self, env: &mut FormatEnv) -> Result<(), ConvGraphError> {
        for objtype in &self.manifest.objtypes {
            env.register_objtype(&objtype.name);
        }
        for format in &self.manifest.formats {
            env.register_objformat(&format.objtype, &format.name)?;
            if !format.report_as.is_empty() {
                let rules: Vec<(Matcher, Vec<u8>, String)> = format
                    .report_as
                    .iter()
                    .map(|rule| {
                        (
                            rule.matcher,
                            rule.pattern.clone().unwrap_or_default().into_bytes(),
                            rule.format.clone(),
                        )
                    })
                    .collect();
                env.set_report_as(&format.name, move |data: &[u8]| {
                    rules
                        .iter()
                        .find(|(matcher, pattern, _)| matcher.matches(data, pattern))
                        .map(|(_, _, format)| format.clone())
                })?;
            }
            for extension in &format.extensions {
                let to = extension.to.into_fn(extension.to_arg.clone());
                let from = extension.from.into_fn(extension.from_arg.clone());
                env.register_extension(
                    &format.name,
                    move |input: &[u8], config: Option<&str>| to(input, config),
                    move |input: &[u8], config: Option<&str>| from(input, config),
                )?;
            }
        }
        Ok(())
    }

    fn conversion_info(&self, env: &mut FormatEnv) -> Result<(), ConvGraphError> {
        // Common formats may live in another plugin, so they are set once
        // every plugin declared its formats.
        for objtype in &self.manifest.objtypes {
            if let Some(common) = &objtype.common_format {
                env.set_common_format(&objtype.name, common)?;
            }
        }

        for entry in &self.manifest.converters {
            let registration =
                env.register_converter(&entry.from, &entry.to, entry.conversion()?, entry.flags())?;
            debug!(
                plugin = %self.name,
                from = %entry.from,
                to = %entry.to,
                ?registration,
                "registered manifest converter"
            );
        }

        for entry in &self.manifest.detectors {
            check_pattern(
                entry.matcher,
                entry.pattern.as_deref(),
                &format!("detector {} -> {}", entry.from, entry.to),
            )?;
            let matcher = entry.matcher;
            let pattern = entry.pattern.clone().unwrap_or_default().into_bytes();
            let resolved = env.register_data_detector(&entry.from, &entry.to, move |data: &[u8]| {
                matcher.matches(data, &pattern)
            });
            if !resolved {
                debug!(
                    plugin = %self.name,
                    from = %entry.from,
                    to = %entry.to,
                    "detector pending until both formats are known"
                );
            }
        }

        for like in &self.manifest.like {
            let mut to_flags = ConverterFlags::default();
            let mut from_flags = ConverterFlags::default();
            if like.lossy_to_base {
                to_flags = to_flags.lossy();
            }
            if like.lossy_from_base {
                from_flags = from_flags.lossy();
            }
            env.set_like(&like.format, &like.base, to_flags, from_flags)?;
        }

        Ok(())
    }
}

/// Builds an environment from manifest files, one plugin per file.
///
/// Any plugin that fails to load makes the whole graph an error.
pub fn load_graph(paths: &[PathBuf]) -> Result<FormatEnv, ConvGraphError> {
    let plugins: Vec<Box<dyn FormatPlugin>> = paths
        .iter()
        .map(|path| ManifestPlugin::from_path(path).map(|p| Box::new(p) as Box<dyn FormatPlugin>))
        .collect::<Result<_, _>>()?;

    let mut env = FormatEnv::new();
    let report = env.load_plugins(&plugins);
    if let Some(disabled) = report.disabled.into_iter().next() {
        return Err(ConvGraphError::Plugin {
            plugin: disabled.name,
            message: disabled.error.to_string(),
        });
    }
    Ok(env)
}
