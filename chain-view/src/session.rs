//! Per-query tabs.
//!
//! Each symbol lookup fetches its records once and keeps them in its own tab
//! for as long as the tab is open. Tabs never share record storage, and a
//! failed fetch leaves every existing tab, and the active selection, as it
//! was.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::ChainConfig;
use crate::data::{expiring_within, normalize_all, OptionRecord, RecordSource, SourceError};
use crate::pipeline::{derive, DerivedView, ViewState};

pub type TabId = u64;

/// Records fetched for one symbol.
#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub symbol: String,
    pub fetched_at: DateTime<Utc>,
    pub records: Arc<[OptionRecord]>,
}

/// Open tabs, in the order they were opened, and the active one.
#[derive(Debug, Default)]
pub struct Workspace {
    tabs: Vec<Tab>,
    active: Option<TabId>,
    next_id: TabId,
    horizon_days: Option<i64>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep records expiring within `days` of the fetch date.
    pub fn with_horizon(mut self, days: Option<i64>) -> Self {
        self.horizon_days = days;
        self
    }

    /// Fetch `symbol` from `source` into a new active tab.
    pub fn open<S: RecordSource + ?Sized>(&mut self, source: &S, symbol: &str) -> Result<TabId, SourceError> {
        let raw = source.fetch_symbol(symbol).map_err(|e| {
            warn!("Fetch for {} failed: {}", symbol, e);
            e
        })?;

        let fetched_at = Utc::now();
        let mut records = normalize_all(&raw);
        if let Some(days) = self.horizon_days {
            records = expiring_within(&records, fetched_at.date_naive(), days);
        }
        Ok(self.insert_at(symbol.trim(), records, fetched_at))
    }

    /// Add already-resolved records as a new active tab.
    pub fn insert(&mut self, symbol: &str, records: Vec<OptionRecord>) -> TabId {
        self.insert_at(symbol, records, Utc::now())
    }

    fn insert_at(&mut self, symbol: &str, records: Vec<OptionRecord>, fetched_at: DateTime<Utc>) -> TabId {
        let id = self.next_id;
        self.next_id += 1;

        info!("Opened tab {} for {} ({} records)", id, symbol, records.len());
        self.tabs.push(Tab {
            id,
            symbol: symbol.to_string(),
            fetched_at,
            records: records.into(),
        });
        self.active = Some(id);
        id
    }

    /// Close a tab. Closing the active tab activates the last remaining one.
    /// Returns `false` when no such tab exists.
    pub fn close(&mut self, id: TabId) -> bool {
        let Some(pos) = self.tabs.iter().position(|t| t.id == id) else {
            return false;
        };
        self.tabs.remove(pos);
        if self.active == Some(id) {
            self.active = self.tabs.last().map(|t| t.id);
        }
        true
    }

    /// Make `id` the active tab. Returns `false` when no such tab exists.
    pub fn activate(&mut self, id: TabId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active = Some(id);
        true
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn active(&self) -> Option<&Tab> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    /// Derive the active tab's views, if a tab is open.
    pub fn derive(&self, state: &ViewState, config: &ChainConfig) -> Option<DerivedView> {
        self.active().map(|tab| derive(&tab.records, state, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OptionType, RawRecord};
    use serde_json::json;

    struct FakeSource {
        rows: Vec<RawRecord>,
    }

    impl RecordSource for FakeSource {
        fn symbols(&self) -> Result<Vec<String>, SourceError> {
            Ok(vec!["BN".to_string()])
        }

        fn fetch_symbol(&self, symbol: &str) -> Result<Vec<RawRecord>, SourceError> {
            if symbol == "DOWN" {
                return Err(SourceError::InvalidData("upstream unavailable".to_string()));
            }
            Ok(self.rows.clone())
        }

        fn fetch_all(&self) -> Result<Vec<RawRecord>, SourceError> {
            Ok(self.rows.clone())
        }
    }

    fn source() -> FakeSource {
        let row = json!({"Symbol": "BN 240119C50", "Quotes": "Call", "Date": "2024-01-19", "Strike_price": "50"});
        FakeSource {
            rows: vec![row.as_object().unwrap().clone()],
        }
    }

    #[test]
    fn test_open_normalizes_and_activates() {
        let mut workspace = Workspace::new();
        let id = workspace.open(&source(), "BN").unwrap();
        let tab = workspace.active().unwrap();
        assert_eq!(tab.id, id);
        assert_eq!(tab.symbol, "BN");
        assert_eq!(tab.records[0].quote_type, OptionType::Call);
    }

    #[test]
    fn test_open_with_unbounded_horizon() {
        let row = json!({"Symbol": "BN 990119C50", "Quotes": "Call", "Date": "2099-01-19", "Strike_price": "50"});
        let far = FakeSource {
            rows: vec![row.as_object().unwrap().clone()],
        };

        let mut workspace = Workspace::new().with_horizon(Some(9_223_372_036_854_775));
        workspace.open(&far, "BN").unwrap();
        assert_eq!(workspace.active().unwrap().records.len(), 1);
    }

    #[test]
    fn test_failed_fetch_leaves_state_untouched() {
        let mut workspace = Workspace::new();
        let id = workspace.open(&source(), "BN").unwrap();
        assert!(workspace.open(&source(), "DOWN").is_err());
        assert_eq!(workspace.tabs().len(), 1);
        assert_eq!(workspace.active().map(|t| t.id), Some(id));
    }

    #[test]
    fn test_close_active_falls_back_to_last_tab() {
        let mut workspace = Workspace::new();
        let a = workspace.insert("A", Vec::new());
        let b = workspace.insert("B", Vec::new());
        let c = workspace.insert("C", Vec::new());

        assert!(workspace.activate(a));
        assert!(workspace.close(a));
        assert_eq!(workspace.active().map(|t| t.id), Some(c));

        assert!(workspace.close(b));
        assert_eq!(workspace.active().map(|t| t.id), Some(c));

        assert!(workspace.close(c));
        assert!(workspace.active().is_none());
        assert!(!workspace.close(c));
    }

    #[test]
    fn test_tabs_are_isolated() {
        let mut workspace = Workspace::new();
        let a = workspace.insert("A", vec![OptionRecord::new(OptionType::Call, None, 1.into())]);
        workspace.insert("B", Vec::new());

        assert_eq!(workspace.get(a).unwrap().records.len(), 1);
        let view = workspace.derive(&ViewState::default(), &ChainConfig::default()).unwrap();
        assert!(view.rows.is_empty());
    }

    #[test]
    fn test_derive_without_tabs() {
        let workspace = Workspace::new();
        assert!(workspace.derive(&ViewState::default(), &ChainConfig::default()).is_none());
        assert!(!Workspace::new().activate(0));
    }
}
