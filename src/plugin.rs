//! Format plugins and their two-phase loading.
//!
//! A plugin first declares its object types and formats, then its
//! converters and detectors. All `format_info` calls run before any
//! `conversion_info` call, so plugins may be loaded in any order and still
//! reference each other's formats.

use tracing::{debug, warn};

use crate::env::FormatEnv;
use crate::error::ConvGraphError;

/// A bundle of formats and converters registered into a [`FormatEnv`].
pub trait FormatPlugin {
    fn name(&self) -> &str;

    /// Registers object types and formats.
    fn format_info(&self, env: &mut FormatEnv) -> Result<(), ConvGraphError>;

    /// Registers converters, detectors and format aliases.
    fn conversion_info(&self, _env: &mut FormatEnv) -> Result<(), ConvGraphError> {
        Ok(())
    }
}

/// A plugin whose registration failed.
#[derive(Debug)]
pub struct DisabledPlugin {
    pub name: String,
    pub error: ConvGraphError,
}

/// Outcome of [`FormatEnv::load_plugins`].
#[derive(Debug, Default)]
pub struct PluginLoadReport {
    /// Plugins that registered everything, in load order.
    pub loaded: Vec<String>,
    pub disabled: Vec<DisabledPlugin>,
}

impl PluginLoadReport {
    pub fn is_complete(&self) -> bool {
        self.disabled.is_empty()
    }
}

impl FormatEnv {
    /// Loads plugins in two phases.
    ///
    /// A plugin failing in either phase is reported as disabled and skipped
    /// from then on; the others keep loading. Whatever a failing plugin
    /// registered before its error stays registered.
    pub fn load_plugins<P>(&mut self, plugins: &[P]) -> PluginLoadReport
    where
        P: AsRef<dyn FormatPlugin>,
    {
        let mut report = PluginLoadReport::default();
        let mut enabled = vec![true; plugins.len()];

        for (plugin, enabled) in plugins.iter().zip(enabled.iter_mut()) {
            let plugin = plugin.as_ref();
            if let Err(error) = plugin.format_info(self) {
                disable(&mut report, plugin, error);
                *enabled = false;
            }
        }

        for (plugin, enabled) in plugins.iter().zip(&enabled) {
            let plugin = plugin.as_ref();
            if !*enabled {
                continue;
            }
            match plugin.conversion_info(self) {
                Ok(()) => {
                    debug!(plugin = plugin.name(), "loaded format plugin");
                    report.loaded.push(plugin.name().to_string());
                }
                Err(error) => disable(&mut report, plugin, error),
            }
        }

        report
    }
}

fn disable(report: &mut PluginLoadReport, plugin: &dyn FormatPlugin, error: ConvGraphError) {
    warn!(plugin = plugin.name(), error = %error, "disabling format plugin");
    report.disabled.push(DisabledPlugin {
        name: plugin.name().to_string(),
        error,
    });
}
