//! Store-backed stowage operations.
//!
//! [`Stowage`] wires the pure planners to an [`ItemStore`] and a [`LogSink`]. Every
//! operation checks that the identifiers it is given resolve before it mutates
//! anything.

use crate::collision::OccupiedSpace;
use crate::recommend::Recommendation;
use crate::retrieval::RetrievalPlan;
use crate::search::{validate_position, ContainerMatch, PlacementSearch};
use crate::simulation::{AdvanceOutcome, AdvanceRequest, Simulation};
use crate::waste::{
    self, ReturnPlan, ReturnSchedule, ScheduledReturnDetails, UndockingReport, WasteItem,
    SYSTEM_ACTOR,
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use stowage_core::geometry::Position;
use stowage_core::{
    Container, EngineConfig, Error, Item, ItemFilter, ItemStore, LogEntry, LogKind,
    LogSink, Result,
};

/// Result of [`Stowage::search`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    /// Exactly one item matched; its retrieval plan.
    Found(RetrievalPlan),
    /// Several items matched by name.
    Multiple(Vec<Item>),
}

/// A recorded retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveRequest {
    /// Item taken out.
    pub item_id: String,
    /// Who took it.
    pub actor: String,
    /// Container it must currently be in.
    pub from_container: String,
    /// Container it is moved to, if any. Moving clears its position.
    pub new_container: Option<String>,
}

impl RetrieveRequest {
    /// Retrieval of `item_id` from `from_container` by `actor`.
    pub fn new(
        item_id: impl Into<String>,
        actor: impl Into<String>,
        from_container: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            actor: actor.into(),
            from_container: from_container.into(),
            new_container: None,
        }
    }

    /// Moves the item to another container after retrieval.
    pub fn moving_to(mut self, container_id: impl Into<String>) -> Self {
        self.new_container = Some(container_id.into());
        self
    }
}

/// Stowage operations over a store and an activity log.
#[derive(Debug)]
pub struct Stowage<S, L> {
    store: S,
    log: L,
    search: PlacementSearch,
}

impl<S: ItemStore, L: LogSink> Stowage<S, L> {
    /// Creates a facade with default configuration.
    pub fn new(store: S, log: L) -> Self {
        Self {
            store,
            log,
            search: PlacementSearch::default_config(),
        }
    }

    /// Creates a facade with a validated configuration.
    pub fn with_config(store: S, log: L, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            log,
            search: PlacementSearch::new(config),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        self.search.config()
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The activity log.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Splits the facade back into its store and log.
    pub fn into_parts(self) -> (S, L) {
        (self.store, self.log)
    }

    /// Registers a new container.
    pub fn add_container(&mut self, container: Container) -> Result<()> {
        container.validate()?;
        if self.store.get_container(container.id())?.is_some() {
            return Err(Error::StateConflict(format!(
                "Container with ID {} already exists",
                container.id()
            )));
        }
        info!("Adding container '{}' in zone '{}'", container.id(), container.zone());
        self.store.upsert_container(container)
    }

    /// Registers a new item.
    ///
    /// An explicit position is checked against the container and its occupants. An
    /// unplaced item is auto-placed; if no free box exists it is stored unplaced.
    pub fn add_item(&mut self, mut item: Item) -> Result<Item> {
        if self.store.get_item(item.id())?.is_some() {
            return Err(Error::StateConflict(format!(
                "Item with ID {} already exists",
                item.id()
            )));
        }
        let container = self.store.require_container(item.container_id())?;
        item.validate()?;

        let occupied = self.occupied_space(container.id(), Some(item.id()))?;
        match item.position() {
            Some(position) => validate_position(item.dimensions(), position, &container, &occupied)?,
            None => match self.search.find_position_for(&item, &container, &occupied) {
                Ok(position) => item.set_position(Some(position)),
                Err(err) if err.is_search_exhausted() => {
                    warn!("Storing '{}' unplaced: {}", item.id(), err);
                }
                Err(err) => return Err(err),
            },
        }

        self.store.upsert_item(item.clone())?;
        debug!("Added item '{}' to '{}'", item.id(), container.id());
        Ok(item)
    }

    /// Moves an item to a new position inside its current container.
    ///
    /// Fails with `StateConflict` if the position is unchanged or overlaps another item.
    pub fn update_item_position(&mut self, item_id: &str, position: Position) -> Result<Item> {
        let mut item = self.store.require_item(item_id)?;
        let container = self.store.require_container(item.container_id())?;
        let occupied = self.occupied_space(container.id(), Some(item_id))?;
        validate_position(item.dimensions(), &position, &container, &occupied)?;

        item.set_position(Some(position));
        if !self.store.upsert_item(item.clone())? {
            return Err(Error::StateConflict(
                "No changes made to item position".to_string(),
            ));
        }
        Ok(item)
    }

    /// Puts an item at `position` in `container_id` and logs the placement.
    pub fn place_item(
        &mut self,
        item_id: &str,
        container_id: &str,
        position: Position,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Item> {
        let mut item = self.store.require_item(item_id)?;
        let container = self.store.require_container(container_id)?;
        let occupied = self.occupied_space(container_id, Some(item_id))?;
        validate_position(item.dimensions(), &position, &container, &occupied)?;

        let from_container = item.container_id().to_string();
        item.set_container_id(container_id);
        item.set_position(Some(position));
        if !self.store.upsert_item(item.clone())? {
            return Err(Error::StateConflict("No changes made to item".to_string()));
        }

        self.log.append(
            LogEntry::new(
                LogKind::Placement,
                item_id,
                actor,
                at,
                from_container,
                format!("Placed {} in {}", item.name(), container_id),
            )
            .with_destination(container_id),
        );
        Ok(item)
    }

    /// Records that an item was taken out.
    ///
    /// Items with a usage limit use up one use; reaching the limit is logged once as
    /// depleted. If a new container is given the item moves there, unplaced.
    pub fn retrieve_item(&mut self, request: &RetrieveRequest, at: DateTime<Utc>) -> Result<Item> {
        let mut item = self.store.require_item(&request.item_id)?;
        if item.container_id() != request.from_container {
            return Err(Error::StateConflict(format!(
                "Item {} is not in container {}",
                item.id(),
                request.from_container
            )));
        }
        if let Some(new_container) = &request.new_container {
            self.store.require_container(new_container)?;
        }

        let mut entry = LogEntry::new(
            LogKind::Retrieval,
            item.id(),
            request.actor.as_str(),
            at,
            request.from_container.as_str(),
            format!("Retrieved {}", item.name()),
        );
        if let Some(new_container) = &request.new_container {
            entry = entry.with_destination(new_container.as_str());
        }
        self.log.append(entry);

        if let Some(limit) = item.usage_limit() {
            let before = item.usage_count();
            if before < limit {
                item.set_usage_count(before + 1);
                if before + 1 >= limit {
                    self.log.append(
                        LogEntry::new(
                            LogKind::Depleted,
                            item.id(),
                            request.actor.as_str(),
                            at,
                            request.from_container.as_str(),
                            format!("{} has reached usage limit", item.name()),
                        )
                        .with_description("Item should be considered for waste return"),
                    );
                }
            }
        }

        if let Some(new_container) = &request.new_container {
            item.set_container_id(new_container.as_str());
            item.set_position(None);
        }

        self.store.upsert_item(item.clone())?;
        Ok(item)
    }

    /// Looks an item up by identifier, then by case-insensitive name substring.
    pub fn search(&self, query: &str) -> Result<SearchResult> {
        let item = match self.store.get_item(query)? {
            Some(item) => item,
            None => {
                let mut matches = self
                    .store
                    .get_items(&ItemFilter::all().name_contains(query))?;
                match matches.len() {
                    0 => return Err(Error::item_not_found(query)),
                    1 => matches.remove(0),
                    n => {
                        debug!("Query '{}' matched {} items", query, n);
                        return Ok(SearchResult::Multiple(matches));
                    }
                }
            }
        };
        self.plan_for(item).map(SearchResult::Found)
    }

    /// Builds the retrieval plan for an item.
    pub fn retrieval_plan(&self, item_id: &str) -> Result<RetrievalPlan> {
        let item = self.store.require_item(item_id)?;
        self.plan_for(item)
    }

    /// Recommends positions for a batch of items in one container.
    pub fn recommend(
        &self,
        container_id: &str,
        items: &[Item],
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>> {
        let container = self.store.require_container(container_id)?;
        let existing = self.occupied_space(container_id, None)?;
        Ok(self.search.place_batch(items, &container, &existing, as_of))
    }

    /// Finds a container with room for `item`, trying its preferred zone first.
    pub fn suggest_container(&self, item: &Item) -> Result<ContainerMatch> {
        let (mut candidates, others): (Vec<Container>, Vec<Container>) = self
            .store
            .containers()?
            .into_iter()
            .partition(|c| item.preferred_zone() == Some(c.zone()));
        candidates.extend(others);

        let spaces = candidates
            .into_iter()
            .map(|container| -> Result<(Container, OccupiedSpace)> {
                let occupied = self.occupied_space(container.id(), Some(item.id()))?;
                Ok((container, occupied))
            })
            .collect::<Result<Vec<_>>>()?;

        self.search.find_in_containers(item, &spaces)
    }

    /// Every stored item that counts as waste at `as_of`.
    pub fn identify_waste(&self, as_of: DateTime<Utc>) -> Result<Vec<WasteItem>> {
        let items = self.store.get_items(&ItemFilter::all())?;
        Ok(waste::identify_waste(&items, as_of, self.config()))
    }

    /// Plans the return of the given items to an undocking container.
    pub fn return_plan(
        &self,
        item_ids: &[String],
        max_weight: f64,
        undocking_container_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<ReturnPlan> {
        waste::plan_return(
            &self.store,
            item_ids,
            max_weight,
            undocking_container_id,
            as_of,
            self.config(),
        )
    }

    /// Booked returns in date order, with their items looked up in this store.
    pub fn scheduled_returns(&self, schedule: &ReturnSchedule) -> Result<Vec<ScheduledReturnDetails>> {
        schedule.details(&self.store)
    }

    /// Removes every item in the undocking container.
    pub fn complete_undocking(
        &mut self,
        container_id: &str,
        at: DateTime<Utc>,
    ) -> Result<UndockingReport> {
        waste::complete_undocking(&mut self.store, &mut self.log, container_id, at)
    }

    /// Advances the clock against this store and logs depletions.
    pub fn advance_clock(
        &mut self,
        simulation: &mut Simulation,
        request: &AdvanceRequest,
    ) -> Result<AdvanceOutcome> {
        let outcome = simulation.advance(&mut self.store, request)?;

        for depleted in &outcome.changes.items_depleted_today {
            let from_container = self
                .store
                .get_item(&depleted.item_id)?
                .map(|item| item.container_id().to_string())
                .unwrap_or_default();
            self.log.append(
                LogEntry::new(
                    LogKind::Depleted,
                    depleted.item_id.as_str(),
                    SYSTEM_ACTOR,
                    outcome.new_date,
                    from_container,
                    format!("{} has reached usage limit", depleted.name),
                )
                .with_description("Item should be considered for waste return"),
            );
        }

        Ok(outcome)
    }

    /// Resets the clock and every item's usage count.
    pub fn reset_clock(&mut self, simulation: &mut Simulation, now: DateTime<Utc>) -> Result<usize> {
        simulation.reset(&mut self.store, now)
    }

    fn plan_for(&self, item: Item) -> Result<RetrievalPlan> {
        let container = self.store.require_container(item.container_id())?;
        let others = self.store.get_items(
            &ItemFilter::all()
                .in_container(container.id())
                .placed()
                .excluding(item.id()),
        )?;
        Ok(RetrievalPlan::build(item, container, &others))
    }

    fn occupied_space(&self, container_id: &str, exclude_id: Option<&str>) -> Result<OccupiedSpace> {
        let items = self
            .store
            .get_items(&ItemFilter::all().in_container(container_id).placed())?;
        Ok(OccupiedSpace::from_items(&items, exclude_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use stowage_core::{coords, MemoryLog, MemoryStore};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn stowage() -> Stowage<MemoryStore, MemoryLog> {
        let mut stowage = Stowage::new(MemoryStore::new(), MemoryLog::new());
        stowage
            .add_container(Container::new("C1", "Crew Quarters", 100, 80, 60))
            .unwrap();
        stowage
            .add_container(Container::new("C2", "Lab", 50, 50, 50))
            .unwrap();
        stowage
    }

    #[test]
    fn test_add_container_rejects_duplicates() {
        let mut stowage = stowage();
        let err = stowage
            .add_container(Container::new("C1", "Lab", 10, 10, 10))
            .unwrap_err();
        assert!(matches!(err, Error::StateConflict(_)));
        assert!(stowage
            .add_container(Container::new("C3", "Lab", 0, 10, 10))
            .is_err());
    }

    #[test]
    fn test_add_item_auto_places() {
        let mut stowage = stowage();
        let first = stowage
            .add_item(Item::new("I1", "Water", "C1", 20, 15, 5))
            .unwrap();
        let second = stowage
            .add_item(Item::new("I2", "Water", "C1", 20, 15, 5))
            .unwrap();
        assert_eq!(first.position().unwrap().start, coords(0, 0, 0));
        assert_eq!(second.position().unwrap().start, coords(0, 0, 5));

        assert!(stowage
            .add_item(Item::new("I1", "Again", "C1", 1, 1, 1))
            .is_err());
        assert!(stowage
            .add_item(Item::new("I3", "Lost", "C9", 1, 1, 1))
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            stowage.add_item(Item::new("I4", "Huge", "C2", 60, 1, 1)),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_add_item_stores_unplaced_when_full() {
        let mut stowage = stowage();
        stowage
            .add_item(Item::new("fill", "Filler", "C2", 50, 50, 50))
            .unwrap();
        let item = stowage
            .add_item(Item::new("late", "Late", "C2", 5, 5, 5))
            .unwrap();
        assert!(!item.is_placed());
        assert_eq!(stowage.store().item_count(), 2);
    }

    #[test]
    fn test_update_item_position() {
        let mut stowage = stowage();
        stowage
            .add_item(Item::new("I1", "Box", "C1", 10, 10, 10))
            .unwrap();
        stowage
            .add_item(Item::new("I2", "Box", "C1", 10, 10, 10))
            .unwrap();

        let target = Position::from_origin(coords(50, 0, 0), coords(10, 10, 10));
        let moved = stowage.update_item_position("I1", target).unwrap();
        assert_eq!(moved.position(), Some(&target));

        assert!(matches!(
            stowage.update_item_position("I1", target),
            Err(Error::StateConflict(_))
        ));
        let onto_i2 = *stowage.store().require_item("I2").unwrap().position().unwrap();
        assert!(matches!(
            stowage.update_item_position("I1", onto_i2),
            Err(Error::StateConflict(_))
        ));
    }

    #[test]
    fn test_update_item_position_rejects_extreme_coordinates() {
        let mut stowage = stowage();
        let original = stowage
            .add_item(Item::new("I1", "Box", "C1", 10, 10, 10))
            .unwrap();

        let err = stowage
            .update_item_position("I1", Position::new(coords(i32::MIN, 0, 0), coords(10, 10, 10)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
        assert_eq!(stowage.store().require_item("I1").unwrap(), original);
    }

    #[test]
    fn test_place_item_logs() {
        let mut stowage = stowage();
        stowage
            .add_item(Item::new("I1", "Box", "C1", 10, 10, 10))
            .unwrap();
        let target = Position::from_origin(coords(0, 0, 0), coords(10, 10, 10));

        let placed = stowage.place_item("I1", "C2", target, "astro", now()).unwrap();
        assert_eq!(placed.container_id(), "C2");

        let entry = &stowage.log().entries()[0];
        assert_eq!(entry.kind, LogKind::Placement);
        assert_eq!(entry.from_container, "C1");
        assert_eq!(entry.to_container.as_deref(), Some("C2"));
        assert_eq!(entry.title, "Placed Box in C2");

        assert!(matches!(
            stowage.place_item("I1", "C2", target, "astro", now()),
            Err(Error::StateConflict(_))
        ));
    }

    #[test]
    fn test_retrieve_item_counts_usage() {
        let mut stowage = stowage();
        stowage
            .add_item(Item::new("K", "Kit", "C1", 10, 10, 10).with_usage_limit(2))
            .unwrap();
        let request = RetrieveRequest::new("K", "astro", "C1");

        stowage.retrieve_item(&request, now()).unwrap();
        let item = stowage.retrieve_item(&request, now()).unwrap();
        assert_eq!(item.usage_count(), 2);
        stowage.retrieve_item(&request, now()).unwrap();
        assert_eq!(stowage.store().require_item("K").unwrap().usage_count(), 2);

        let kinds: Vec<LogKind> = stowage.log().entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LogKind::Retrieval,
                LogKind::Retrieval,
                LogKind::Depleted,
                LogKind::Retrieval
            ]
        );
    }

    #[test]
    fn test_retrieve_item_checks_before_mutating() {
        let mut stowage = stowage();
        stowage
            .add_item(Item::new("I1", "Box", "C1", 10, 10, 10))
            .unwrap();

        let wrong = RetrieveRequest::new("I1", "astro", "C2");
        assert!(matches!(
            stowage.retrieve_item(&wrong, now()),
            Err(Error::StateConflict(_))
        ));
        let ghost = RetrieveRequest::new("I1", "astro", "C1").moving_to("C9");
        assert!(stowage.retrieve_item(&ghost, now()).unwrap_err().is_not_found());
        assert!(stowage.log().is_empty());

        let moved = stowage
            .retrieve_item(&RetrieveRequest::new("I1", "astro", "C1").moving_to("C2"), now())
            .unwrap();
        assert_eq!(moved.container_id(), "C2");
        assert!(!moved.is_placed());
    }

    #[test]
    fn test_search_by_id_and_name() {
        let mut stowage = stowage();
        for (id, name) in [("F1", "Food Packet"), ("F2", "Food Tray"), ("O1", "Oxygen")] {
            stowage
                .add_item(Item::new(id, name, "C1", 10, 10, 10))
                .unwrap();
        }

        match stowage.search("O1").unwrap() {
            SearchResult::Found(plan) => assert_eq!(plan.item.id(), "O1"),
            other => panic!("unexpected {:?}", other),
        }
        match stowage.search("oxy").unwrap() {
            SearchResult::Found(plan) => assert_eq!(plan.item.id(), "O1"),
            other => panic!("unexpected {:?}", other),
        }
        match stowage.search("FOOD").unwrap() {
            SearchResult::Multiple(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(stowage.search("nothing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_suggest_container_prefers_zone() {
        let stowage = stowage();
        let item = Item::new("I1", "Box", "", 10, 10, 10).with_preferred_zone("Lab");
        let found = stowage.suggest_container(&item).unwrap();
        assert_eq!(found.container_id, "C2");

        let anywhere = Item::new("I2", "Box", "", 10, 10, 10);
        assert_eq!(stowage.suggest_container(&anywhere).unwrap().container_id, "C1");
    }

    #[test]
    fn test_scheduled_returns_skip_removed_items() {
        let mut stowage = stowage();
        stowage
            .add_item(Item::new("W1", "Used Filter", "C1", 10, 10, 10).with_mass(1.5))
            .unwrap();
        stowage
            .add_item(Item::new("W2", "Old Wipes", "C1", 10, 10, 10))
            .unwrap();

        let mut schedule = ReturnSchedule::new();
        schedule
            .schedule(["W1", "W2"], now() + Duration::days(7), "next resupply", now())
            .unwrap();
        stowage.store_mut().delete_item("W2").unwrap();

        let details = stowage.scheduled_returns(&schedule).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].items.len(), 1);
        assert_eq!(details[0].items[0].name, "Used Filter");
    }

    #[test]
    fn test_advance_clock_logs_depletion() {
        let mut stowage = stowage();
        stowage
            .add_item(Item::new("K", "Kit", "C1", 10, 10, 10).with_usage_limit(2))
            .unwrap();
        let mut sim = Simulation::new(now());

        let outcome = stowage
            .advance_clock(&mut sim, &AdvanceRequest::days(2).with_used_items(["K"]))
            .unwrap();
        assert_eq!(outcome.changes.items_depleted_today.len(), 1);

        let entry = &stowage.log().entries()[0];
        assert_eq!(entry.kind, LogKind::Depleted);
        assert_eq!(entry.actor, "system");
        assert_eq!(entry.from_container, "C1");
        assert_eq!(entry.timestamp, now() + Duration::days(2));

        assert_eq!(stowage.identify_waste(sim.current_date()).unwrap().len(), 1);
        assert_eq!(stowage.reset_clock(&mut sim, now()).unwrap(), 1);
        assert!(stowage.identify_waste(now()).unwrap().is_empty());
    }
}
