//! Unit registration and lookup.
//!
//! # Responsibility
//! - Register units and run global-event propagation for each new unit.
//! - Resolve units by id or name and build share links.
//!
//! # Invariants
//! - Registration always runs propagation before returning; a unit is never
//!   handed back without having inherited the current global events.
//! - Duplicate names are tolerated unless strict naming is configured.

use crate::config::CoreConfig;
use crate::error::{CalendarError, CalendarResult};
use crate::model::unit::{Unit, UnitId};
use crate::repo::event_repo::EventRepository;
use crate::repo::unit_repo::UnitRepository;
use crate::service::sync_engine::{SyncEngine, SyncReport};
use log::{info, warn};

/// A freshly registered unit and its propagation summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRegistration {
    pub unit: Unit,
    pub sync: SyncReport,
}

pub struct UnitRegistry<'cfg, U: UnitRepository, E: EventRepository> {
    units: U,
    events: E,
    config: &'cfg CoreConfig,
}

impl<'cfg, U: UnitRepository, E: EventRepository> UnitRegistry<'cfg, U, E> {
    pub fn new(units: U, events: E, config: &'cfg CoreConfig) -> Self {
        Self {
            units,
            events,
            config,
        }
    }

    /// Registers a unit and copies the current global events into it.
    ///
    /// # Errors
    /// - `InvalidUnit` for a blank name.
    /// - `DuplicateUnitName` in strict naming mode when the name is taken.
    /// - `StorageUnavailable` when propagation cannot reach storage. The
    ///   unit stays registered; `SyncEngine::on_unit_created` can be re-run.
    pub fn create_unit(&self, name: &str) -> CalendarResult<UnitRegistration> {
        let unit = Unit::new(name)?;

        if self.config.strict_unit_names {
            if !self.units.insert_unit_if_name_free(&unit)? {
                warn!("event=unit_create module=registry status=rejected error_code=duplicate_name");
                return Err(CalendarError::DuplicateUnitName(unit.name));
            }
        } else {
            self.units.insert_unit(&unit)?;
        }
        info!(
            "event=unit_create module=registry status=ok unit_id={}",
            unit.id
        );

        let sync = SyncEngine::new(&self.events).on_unit_created(&unit)?;
        Ok(UnitRegistration { unit, sync })
    }

    pub fn find_unit(&self, id: UnitId) -> CalendarResult<Unit> {
        self.units
            .get_unit(id)?
            .ok_or(CalendarError::UnitNotFound(id))
    }

    /// Exact name lookup. With duplicate names, the oldest unit wins.
    pub fn find_unit_by_name(&self, name: &str) -> CalendarResult<Unit> {
        self.units
            .find_unit_by_name(name)?
            .ok_or_else(|| CalendarError::UnknownUnitName(name.to_string()))
    }

    pub fn list_units(&self) -> CalendarResult<Vec<Unit>> {
        Ok(self.units.list_units()?)
    }

    /// Public calendar link for a unit: `<frontend_url>/school/<id>`.
    pub fn share_link(&self, id: UnitId) -> CalendarResult<String> {
        let base = self
            .config
            .frontend_url
            .as_deref()
            .ok_or(CalendarError::MissingFrontendUrl)?;
        let unit = self.find_unit(id)?;
        Ok(format!("{}/school/{}", base.trim_end_matches('/'), unit.id))
    }
}
