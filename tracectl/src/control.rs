// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::OrderMap;
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::targets::TRACING_TARGETS;
use crate::trace_target;

trace_target!("tracectl", LevelFilter::INFO, &[]);

/// Errors in a textual tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceCtlError {
    #[error("invalid syntax '{0}': expected tag=level")]
    Syntax(String),
    #[error("invalid level '{0}'")]
    Level(String),
    #[error("unknown tag '{0}'")]
    UnknownTag(String),
}

#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
}

impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        // a target is always reachable by its own name
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>40} │ {:>6} │ {}",
            self.target,
            self.level,
            self.tags.join(",")
        )
    }
}

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, HashSet<&'static str>>,
}

impl TargetCfgDb {
    fn new(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for target in TRACING_TARGETS {
            db.register(target.target, target.name, target.level, target.tags);
        }
        db
    }

    fn register(
        &mut self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) {
        let tconfig = TargetCfg::new(target, name, level, tags);
        let tags = tconfig.tags.clone();
        if let Some(exist) = self.targets.insert(target, tconfig) {
            warn!("Target {} has been multiply defined!", exist.target);
        }
        for tag in tags {
            self.tags.entry(tag).or_default().insert(target);
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for target in self.targets.values() {
            match format!("{}={}", target.target, target.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => error!("Bad directive for target {}: {e}", target.target),
            }
        }
        filter
    }

    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> Result<usize, TraceCtlError> {
        let Some(members) = self.tags.get(tag) else {
            return Err(TraceCtlError::UnknownTag(tag.to_string()));
        };
        let mut changed = 0;
        for target in self.targets.values_mut() {
            if members.contains(target.target) && target.level != level {
                target.level = level;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{:>40} │ {:>6} │ TAGS", "TARGET", "LEVEL")?;
        for target in self.targets.values() {
            writeln!(f, "{target}")?;
        }
        write!(f, "{:>40} │ {:>6} │ --", "(default)", self.level)
    }
}

/// Owner of the installed subscriber and of the per-target levels.
#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: Option<reload::Handle<EnvFilter, Registry>>,
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the process wide [`TracingControl`], installing the subscriber on first use.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetCfgDb::new(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_level(true);

        // another subscriber (e.g. from a test harness) may already be installed
        let reload_filter = match tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            Ok(()) => Some(reload_filter),
            Err(e) => {
                warn!("Tracing subscriber not installed: {e}");
                None
            }
        };

        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }

    fn db(&self) -> MutexGuard<'_, TargetCfgDb> {
        match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn reload(&self, db: &TargetCfgDb) {
        if let Some(handle) = &self.reload_filter
            && let Err(e) = handle.reload(db.env_filter())
        {
            error!("Failed to reload tracing filter: {e}");
        }
    }

    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db();
        if db.level != level {
            db.level = level;
            self.reload(&db);
        }
    }

    #[must_use]
    pub fn get_default_level(&self) -> LevelFilter {
        self.db().level
    }

    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db();
        for target in db.targets.values_mut() {
            target.level = level;
        }
        self.reload(&db);
    }

    /// Set the level of every target carrying `tag`.
    ///
    /// # Errors
    ///
    /// Fails if no target carries `tag`.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        let mut db = self.db();
        let changed = db.set_tag_level(tag, level)?;
        if changed > 0 {
            self.reload(&db);
        }
        info!("Changed log level for tag '{tag}' to {level}. Targets changed: {changed}");
        Ok(())
    }

    /// Parse comma separated `tag=level` items.
    fn parse_tracing_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
        let mut result = OrderMap::new();
        for item in input.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let Some((tag, level)) = item.split_once('=') else {
                return Err(TraceCtlError::Syntax(item.to_string()));
            };
            let level = LevelFilter::from_str(level.trim())
                .map_err(|_| TraceCtlError::Level(level.trim().to_string()))?;
            result.insert(tag.trim().to_string(), level);
        }
        Ok(result)
    }

    /// Apply a configuration such as `default=warn,all=info,graph=debug`.
    ///
    /// `default` sets the level of events from unregistered targets, `all` sets every registered
    /// target; any other key is a tag. Later items override earlier ones.
    ///
    /// # Errors
    ///
    /// Fails on malformed input or unknown tags. Nothing is applied in that case.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = Self::parse_tracing_config(input)?;
        {
            let db = self.db();
            if let Some(tag) = config
                .keys()
                .find(|tag| !matches!(tag.as_str(), "default" | "all") && !db.tags.contains_key(tag.as_str()))
            {
                return Err(TraceCtlError::UnknownTag(tag.clone()));
            }
        }
        for (tag, level) in &config {
            match tag.as_str() {
                "default" => self.set_default_level(*level),
                "all" => self.set_level_all(*level),
                tag => self.set_tag_level(tag, *level)?,
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db().targets.get(target).cloned()
    }

    pub fn get_targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        let db = self.db();
        let Some(members) = db.tags.get(tag) else {
            return vec![];
        };
        db.targets
            .values()
            .filter(|t| members.contains(t.target))
            .cloned()
            .collect()
    }

    /// Log the current configuration of all targets.
    pub fn dump(&self) {
        let db = self.db();
        info!("{db}");
    }
}

#[cfg(test)]
mod tests {
    use super::{TraceCtlError, TracingControl, get_trace_ctl};
    use crate::LevelFilter;
    use serial_test::serial;

    #[test]
    fn parse_accepts_tag_level_pairs() {
        let parsed = TracingControl::parse_tracing_config("default=warn, tracectl=debug,").unwrap();
        assert_eq!(parsed.get("default"), Some(&LevelFilter::WARN));
        assert_eq!(parsed.get("tracectl"), Some(&LevelFilter::DEBUG));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            TracingControl::parse_tracing_config("tracectl"),
            Err(TraceCtlError::Syntax("tracectl".to_string()))
        );
        assert_eq!(
            TracingControl::parse_tracing_config("tracectl=loud"),
            Err(TraceCtlError::Level("loud".to_string()))
        );
    }

    #[test]
    #[serial]
    fn registered_targets_are_controllable() {
        let tctl = get_trace_ctl();
        let targets = tctl.get_targets_by_tag("tracectl");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name(), "tracectl");

        tctl.setup_from_string("tracectl=debug").unwrap();
        assert_eq!(
            tctl.get_targets_by_tag("tracectl")[0].level(),
            LevelFilter::DEBUG
        );
        tctl.setup_from_string("all=info").unwrap();
        assert_eq!(
            tctl.get_targets_by_tag("tracectl")[0].level(),
            LevelFilter::INFO
        );
        tctl.dump();
    }

    #[test]
    #[serial]
    fn unknown_tags_are_rejected_before_applying() {
        let tctl = get_trace_ctl();
        let before = tctl.get_default_level();
        let result = tctl.setup_from_string("default=trace,no-such-tag=debug");
        assert_eq!(result, Err(TraceCtlError::UnknownTag("no-such-tag".to_string())));
        assert_eq!(tctl.get_default_level(), before);
    }
}
