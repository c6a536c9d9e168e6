//! Area Banks
//!
//! An `AreaBank` builds every area of an `AreaManifest` once and owns them for
//! its whole lifetime. Areas are grouped in named banks; banks are activated
//! and deactivated by name to control which areas take part in
//! `active_areas()` and exclusive starts.
//!
//! The bank is an ordinary value: create it with `initialize`, hand it out by
//! reference, and `teardown` it when the game is done with its areas.

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::{Rc, Weak};

use super::area::{Area, AreaState};
use super::creator::{AreaObjectCreator, ObjectConstructor};
use super::descriptor::{self, AreaDescriptor, AreaManifest};
use super::event::{AreaEvent, AreaEventSelector};
use super::listener::{AreaListener, AreaListening};
use crate::error::{ConfigError, DispatchError};
use crate::game::{Capabilities, Handled, HandlerRelay, HandlingOperators, SimpleHandled, StateOperator};

// ============================================================================
// Collaborators
// ============================================================================

/// Supplies what each area is built with.
pub trait AreaFactory {
    /// The handler relay the area owns.
    fn construct_relay(&self, descriptor: &AreaDescriptor) -> HandlerRelay;

    /// The constructor that populates the area on start, if any.
    ///
    /// Only asked for areas whose descriptor names an object constructor file.
    fn object_constructor(&self, _descriptor: &AreaDescriptor) -> Option<Rc<dyn ObjectConstructor>> {
        None
    }
}

impl<F> AreaFactory for F
where
    F: Fn(&AreaDescriptor) -> HandlerRelay,
{
    fn construct_relay(&self, descriptor: &AreaDescriptor) -> HandlerRelay {
        self(descriptor)
    }
}

/// Starts and ends game phases as areas come and go.
pub trait PhaseActivator {
    fn start_phase(&self, phase_bank: Option<&str>, phase: &str);
    fn end_phase(&self, phase_bank: Option<&str>, phase: &str);
}

// ============================================================================
// Bank
// ============================================================================

struct Bank {
    name: String,
    areas: Vec<Rc<Area>>,
}

/// Registry of constructed areas, grouped by bank.
pub struct AreaBank {
    banks: RefCell<Vec<Bank>>,
    /// Active bank names, in activation order
    active: RefCell<Vec<String>>,
}

impl AreaBank {
    /// Bank receiving area lines declared before any bank scope.
    pub const DEFAULT_BANK: &'static str = descriptor::DEFAULT_BANK;

    /// Build every area described by `manifest`.
    ///
    /// Areas are created INACTIVE. An area whose descriptor names an object
    /// constructor file gets an `AreaObjectCreator` when the factory provides
    /// a constructor for it. No bank starts out active.
    pub fn initialize(manifest: &AreaManifest, factory: &dyn AreaFactory) -> Result<Rc<Self>, ConfigError> {
        manifest.validate()?;

        let mut banks = Vec::with_capacity(manifest.banks.len());
        for bank in &manifest.banks {
            let areas = bank
                .areas
                .iter()
                .map(|descriptor| Self::build_area(descriptor, factory))
                .collect();
            banks.push(Bank {
                name: bank.name.clone(),
                areas,
            });
        }

        let area_count: usize = banks.iter().map(|b| b.areas.len()).sum();
        tracing::debug!(banks = banks.len(), areas = area_count, "area banks initialized");

        Ok(Rc::new(Self {
            banks: RefCell::new(banks),
            active: RefCell::new(Vec::new()),
        }))
    }

    /// `initialize` from the line format.
    pub fn initialize_from_lines(text: &str, factory: &dyn AreaFactory) -> Result<Rc<Self>, ConfigError> {
        Self::initialize(&AreaManifest::parse_lines(text)?, factory)
    }

    /// `initialize` from a manifest file (see `AreaManifest::load`).
    pub fn initialize_from_file<P: AsRef<Path>>(path: P, factory: &dyn AreaFactory) -> Result<Rc<Self>, ConfigError> {
        Self::initialize(&AreaManifest::load(path)?, factory)
    }

    fn build_area(descriptor: &AreaDescriptor, factory: &dyn AreaFactory) -> Rc<Area> {
        let area = Area::with_descriptor(descriptor.clone(), factory.construct_relay(descriptor));

        if descriptor.object_constructor_file.is_some() {
            if let Some(constructor) = factory.object_constructor(descriptor) {
                AreaObjectCreator::attach(&area, constructor);
            }
        }
        area
    }

    /// Start and end game phases along with the areas naming them.
    pub fn attach_phase_activator(self: &Rc<Self>, activator: Rc<dyn PhaseActivator>) {
        let link = Rc::new(PhaseLink {
            bank: Rc::downgrade(self),
            activator,
            selector: AreaEventSelector::AnyOf(vec![
                AreaEventSelector::Entering(AreaState::Active),
                AreaEventSelector::Leaving(AreaState::Active),
            ]),
            base: SimpleHandled::new(),
            running: RefCell::new(Vec::new()),
        });

        for area in self.all_areas() {
            if area.descriptor().phase.is_some() {
                area.add_listener(link.clone());
            }
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// The area `name` of bank `bank`.
    pub fn area(&self, bank: &str, name: &str) -> Option<Rc<Area>> {
        self.banks
            .borrow()
            .iter()
            .find(|b| b.name == bank)
            .and_then(|b| b.areas.iter().find(|a| a.name() == name).cloned())
    }

    /// Every area of `bank`, in declaration order.
    pub fn areas(&self, bank: &str) -> Option<Vec<Rc<Area>>> {
        self.banks
            .borrow()
            .iter()
            .find(|b| b.name == bank)
            .map(|b| b.areas.clone())
    }

    pub fn area_names(&self, bank: &str) -> Option<Vec<String>> {
        self.areas(bank)
            .map(|areas| areas.iter().map(|a| a.name().to_string()).collect())
    }

    pub fn bank_names(&self) -> Vec<String> {
        self.banks.borrow().iter().map(|b| b.name.clone()).collect()
    }

    pub fn contains_bank(&self, bank: &str) -> bool {
        self.banks.borrow().iter().any(|b| b.name == bank)
    }

    fn all_areas(&self) -> Vec<Rc<Area>> {
        self.banks
            .borrow()
            .iter()
            .flat_map(|b| b.areas.iter().cloned())
            .collect()
    }

    // ========================================================================
    // Activation
    // ========================================================================

    /// Let `bank` take part in `active_areas()`. Returns false if the bank is
    /// unknown or already active.
    pub fn activate(&self, bank: &str) -> bool {
        if !self.contains_bank(bank) || self.is_active_bank(bank) {
            return false;
        }
        self.active.borrow_mut().push(bank.to_string());
        tracing::debug!(bank, "area bank activated");
        true
    }

    /// Remove `bank` from the active set. Area states are left untouched.
    pub fn deactivate(&self, bank: &str) -> bool {
        let removed = {
            let mut active = self.active.borrow_mut();
            let before = active.len();
            active.retain(|name| name != bank);
            active.len() < before
        };
        if !removed {
            return false;
        }

        let still_active = self
            .areas(bank)
            .map(|areas| areas.iter().filter(|a| a.is_active()).count())
            .unwrap_or(0);
        if still_active > 0 {
            tracing::warn!(bank, areas = still_active, "deactivated a bank with active areas");
        } else {
            tracing::debug!(bank, "area bank deactivated");
        }
        true
    }

    pub fn is_active_bank(&self, bank: &str) -> bool {
        self.active.borrow().iter().any(|name| name == bank)
    }

    pub fn active_bank_names(&self) -> Vec<String> {
        self.active.borrow().clone()
    }

    /// ACTIVE areas of every active bank, by bank activation order then
    /// declaration order.
    pub fn active_areas(&self) -> Vec<Rc<Area>> {
        let active = self.active.borrow().clone();
        active
            .iter()
            .filter_map(|bank| self.areas(bank))
            .flatten()
            .filter(|area| area.is_active())
            .collect()
    }

    /// Start the area `name` of `bank`. With `end_others`, every other active
    /// area of the active banks is ended once this one is running.
    ///
    /// Returns false if no such area exists.
    pub fn start_area(&self, bank: &str, name: &str, end_others: bool) -> bool {
        let Some(area) = self.area(bank, name) else {
            return false;
        };

        area.start();
        if end_others {
            self.end_other_active_areas(&area);
        }
        true
    }

    /// End every active area of the active banks except `keep`. Returns how
    /// many were ended.
    pub fn end_other_active_areas(&self, keep: &Rc<Area>) -> usize {
        let mut ended = 0;
        for area in self.active_areas() {
            if !Rc::ptr_eq(&area, keep) && area.end() {
                ended += 1;
            }
        }
        ended
    }

    /// Retire every area and forget all banks.
    pub fn teardown(&self) {
        let banks = std::mem::take(&mut *self.banks.borrow_mut());
        self.active.borrow_mut().clear();

        for bank in banks {
            for area in bank.areas {
                area.retire();
            }
        }
        tracing::debug!("area banks torn down");
    }

    /// True if some ACTIVE area other than `area` names the same phase.
    fn phase_shared(&self, area: &Area) -> bool {
        let descriptor = area.descriptor();
        self.all_areas().iter().any(|other| {
            !std::ptr::eq(Rc::as_ptr(other), area)
                && other.is_active()
                && other.descriptor().phase == descriptor.phase
                && other.descriptor().phase_bank == descriptor.phase_bank
        })
    }
}

impl fmt::Debug for AreaBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaBank")
            .field("banks", &self.bank_names())
            .field("active", &self.active_bank_names())
            .finish()
    }
}

// ============================================================================
// Phases
// ============================================================================

/// Phase identity: optional phase bank plus phase name.
type PhaseKey = (Option<String>, String);

/// Forwards area activity to a `PhaseActivator`.
///
/// Events are applied only while they still describe the area's current
/// state. A listener may move the area again from inside an announcement, in
/// which case the nested event is delivered first and the outer one is stale.
struct PhaseLink {
    bank: Weak<AreaBank>,
    activator: Rc<dyn PhaseActivator>,
    selector: AreaEventSelector,
    base: SimpleHandled,
    /// Phases this link started and has not ended yet
    running: RefCell<Vec<PhaseKey>>,
}

impl Handled for PhaseLink {
    fn dead_operator(&self) -> &StateOperator {
        self.base.dead()
    }

    fn handling_operators(&self) -> &HandlingOperators {
        self.base.handling()
    }

    fn provide_capabilities(self: Rc<Self>, caps: &mut Capabilities) {
        caps.provide::<AreaListening>(self as Rc<dyn AreaListener>);
    }
}

impl AreaListener for PhaseLink {
    fn area_event_selector(&self) -> &AreaEventSelector {
        &self.selector
    }

    fn on_area_event(&self, event: &AreaEvent) -> Result<(), DispatchError> {
        let area = event.area();
        let change = event.change();
        if area.state() != change.new {
            tracing::trace!(area = %area.name(), %change, "stale area event, phase left alone");
            return Ok(());
        }

        let descriptor = area.descriptor();
        let Some(phase) = descriptor.phase.as_deref() else {
            return Ok(());
        };
        let phase_bank = descriptor.phase_bank.as_deref();
        let key: PhaseKey = (descriptor.phase_bank.clone(), phase.to_string());

        if change.enters(AreaState::Active) {
            self.activator.start_phase(phase_bank, phase);
            let mut running = self.running.borrow_mut();
            if !running.contains(&key) {
                running.push(key);
            }
        } else if change.leaves(AreaState::Active) {
            if !self.running.borrow().contains(&key) {
                return Ok(());
            }
            let shared = self
                .bank
                .upgrade()
                .map(|bank| bank.phase_shared(area))
                .unwrap_or(false);
            if !shared {
                self.running.borrow_mut().retain(|running| *running != key);
                self.activator.end_phase(phase_bank, phase);
            }
        }
        Ok(())
    }
}
