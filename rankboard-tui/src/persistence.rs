//! App state persistence: JSON save/load across restarts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rankboard_core::config::QueryDefaults;
use rankboard_core::domain::{lookback_start, MAX_TOP_N, MIN_TOP_N};
use rankboard_core::{Column, Frequency, SortDirection};

use crate::app::{AppState, Overlay, Panel};

/// Serializable subset of app state that persists across restarts.
///
/// Dates are not stored; the query window is rebuilt from `lookback_days`
/// ending today on each start.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub frequency: Frequency,
    pub top_n: usize,
    pub include_negative: bool,
    pub lookback_days: i64,
    pub sort: Option<(Column, SortDirection)>,
    pub auto_refresh: bool,
    pub active_panel: Panel,
    pub last_export: Option<PathBuf>,
    pub welcome_dismissed: bool,
}

impl Default for PersistedState {
    fn default() -> Self {
        let query = QueryDefaults::default();
        Self {
            frequency: query.frequency,
            top_n: query.top_n,
            include_negative: query.include_negative,
            lookback_days: query.lookback_days,
            sort: None,
            auto_refresh: false,
            active_panel: Panel::Query,
            last_export: None,
            welcome_dismissed: false,
        }
    }
}

/// Load persisted state from disk. Returns `None` if the file is missing or
/// corrupt, in which case the config file's query defaults stand.
pub fn load(path: &Path) -> Option<PersistedState> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt state file");
            None
        }
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Extract persisted state from AppState.
pub fn extract(app: &AppState) -> PersistedState {
    let params = &app.query.params;
    PersistedState {
        frequency: params.frequency,
        top_n: params.top_n,
        include_negative: params.include_negative,
        lookback_days: (params.end_date - params.start_date).num_days(),
        sort: app.results.table.sort_state(),
        auto_refresh: app.refresh.enabled,
        active_panel: app.active_panel,
        last_export: app.last_export.clone(),
        welcome_dismissed: app.overlay != Overlay::Welcome,
    }
}

/// Apply persisted state to AppState.
pub fn apply(app: &mut AppState, state: PersistedState) {
    let params = &mut app.query.params;
    params.frequency = state.frequency;
    params.top_n = state.top_n.clamp(MIN_TOP_N, MAX_TOP_N);
    params.include_negative = state.include_negative;
    params.start_date = lookback_start(params.end_date, state.lookback_days);

    if let Some((column, direction)) = state.sort {
        app.results.table.sort_by(column, direction);
    }
    app.refresh.enabled = state.auto_refresh;
    app.active_panel = state.active_panel;
    app.last_export = state.last_export;
    if !state.welcome_dismissed {
        app.overlay = Overlay::Welcome;
    }
}
