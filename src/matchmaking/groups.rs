//! Private-code group registry: two seats per code, ready flags, capacity

use std::collections::HashMap;

use uuid::Uuid;

use crate::ws::protocol::GroupView;

/// Longest accepted group code
pub const MAX_CODE_LEN: usize = 32;

/// One of the two roles within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Controller,
    Viewer,
}

/// Occupant of a seat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatState {
    pub identity: Option<Uuid>,
    pub name: Option<String>,
    pub ready: bool,
}

impl SeatState {
    fn is_empty(&self) -> bool {
        self.identity.is_none()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A two-seat session identified by a player-chosen code
#[derive(Debug, Clone)]
pub struct Group {
    pub code: String,
    pub controller: SeatState,
    pub viewer: SeatState,
    /// True iff both seats are filled
    pub occupied: bool,
    /// True while the group is admitted into the running round
    pub round_active: bool,
}

impl Group {
    fn new(code: String) -> Self {
        Self {
            code,
            controller: SeatState::default(),
            viewer: SeatState::default(),
            occupied: false,
            round_active: false,
        }
    }

    pub fn seat(&self, seat: Seat) -> &SeatState {
        match seat {
            Seat::Controller => &self.controller,
            Seat::Viewer => &self.viewer,
        }
    }

    fn seat_mut(&mut self, seat: Seat) -> &mut SeatState {
        match seat {
            Seat::Controller => &mut self.controller,
            Seat::Viewer => &mut self.viewer,
        }
    }

    /// Which seat an identity holds, if any
    pub fn seat_of(&self, identity: Uuid) -> Option<Seat> {
        if self.controller.identity == Some(identity) {
            Some(Seat::Controller)
        } else if self.viewer.identity == Some(identity) {
            Some(Seat::Viewer)
        } else {
            None
        }
    }

    /// Both seats filled and both ready
    pub fn is_ready_to_admit(&self) -> bool {
        self.occupied && self.controller.ready && self.viewer.ready
    }

    /// Identities currently seated
    pub fn members(&self) -> Vec<Uuid> {
        self.controller
            .identity
            .iter()
            .chain(self.viewer.identity.iter())
            .copied()
            .collect()
    }

    /// "<controller> and <viewer>" as shown on the scoreboard
    pub fn pair_name(&self) -> String {
        format!(
            "{} and {}",
            self.controller.name.as_deref().unwrap_or("?"),
            self.viewer.name.as_deref().unwrap_or("?")
        )
    }

    pub fn view(&self) -> GroupView {
        GroupView {
            code: self.code.clone(),
            controller_name: self.controller.name.clone(),
            viewer_name: self.viewer.name.clone(),
            controller_ready: self.controller.ready,
            viewer_ready: self.viewer.ready,
            occupied: self.occupied,
        }
    }

    fn refresh_occupied(&mut self) {
        self.occupied = !self.controller.is_empty() && !self.viewer.is_empty();
    }
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("Group {0} is full")]
    Full(String),

    #[error("Group code must be 1-{MAX_CODE_LEN} characters")]
    InvalidCode,
}

/// Result of a seat being vacated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub code: String,
    pub seat: Seat,
    /// The group had no seats left and was deleted
    pub group_deleted: bool,
}

/// Maps private codes to groups and identities to their code
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<String, Group>,
    memberships: HashMap<Uuid, String>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<&Group> {
        self.groups.get(code)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Code of the group an identity is seated in
    pub fn code_of(&self, identity: Uuid) -> Option<&str> {
        self.memberships.get(&identity).map(String::as_str)
    }

    /// Whether `identity` would get a seat in `code`, without changing anything
    pub fn can_join(&self, code: &str, identity: Uuid) -> Result<(), GroupError> {
        let code = normalize_code(code)?;
        match self.groups.get(&code) {
            Some(group) if group.seat_of(identity).is_none() && group.occupied => {
                Err(GroupError::Full(code))
            }
            _ => Ok(()),
        }
    }

    /// Seat `identity` in the group `code`, creating the group if unknown.
    ///
    /// An identity seated elsewhere must leave first; re-joining the same
    /// code returns the seat already held.
    pub fn join_or_create(
        &mut self,
        code: &str,
        identity: Uuid,
        display_name: &str,
    ) -> Result<Seat, GroupError> {
        let code = normalize_code(code)?;

        if let Some(group) = self.groups.get(&code) {
            if let Some(seat) = group.seat_of(identity) {
                return Ok(seat);
            }
        }

        let group = self
            .groups
            .entry(code.clone())
            .or_insert_with(|| Group::new(code.clone()));

        let seat = if group.controller.is_empty() {
            Seat::Controller
        } else if group.viewer.is_empty() {
            Seat::Viewer
        } else {
            return Err(GroupError::Full(code));
        };

        let state = group.seat_mut(seat);
        state.identity = Some(identity);
        state.name = Some(display_name.to_string());
        state.ready = false;
        group.refresh_occupied();

        self.memberships.insert(identity, code);
        Ok(seat)
    }

    /// Flip the caller's ready flag. Returns whether both seats are now ready.
    ///
    /// Readiness requires a full group: toggling alone in a group keeps the
    /// flag but never reports ready.
    pub fn toggle_ready(&mut self, code: &str, identity: Uuid) -> bool {
        let Some(group) = self.groups.get_mut(code) else {
            return false;
        };
        let Some(seat) = group.seat_of(identity) else {
            return false;
        };
        let state = group.seat_mut(seat);
        state.ready = !state.ready;
        group.is_ready_to_admit()
    }

    /// Exchange controller and viewer assignments and ready flags
    pub fn swap_seats(&mut self, code: &str) -> bool {
        let Some(group) = self.groups.get_mut(code) else {
            return false;
        };
        std::mem::swap(&mut group.controller, &mut group.viewer);
        true
    }

    /// Vacate `identity`'s seat and reset the group's ready flags
    pub fn leave(&mut self, identity: Uuid) -> Option<Departure> {
        let code = self.memberships.remove(&identity)?;
        let group = self.groups.get_mut(&code)?;
        let seat = group.seat_of(identity)?;

        group.seat_mut(seat).clear();
        group.controller.ready = false;
        group.viewer.ready = false;
        group.round_active = false;
        group.refresh_occupied();

        let group_deleted = group.controller.is_empty() && group.viewer.is_empty();
        if group_deleted {
            self.groups.remove(&code);
        }

        Some(Departure {
            code,
            seat,
            group_deleted,
        })
    }

    pub fn set_round_active(&mut self, code: &str, active: bool) {
        if let Some(group) = self.groups.get_mut(code) {
            group.round_active = active;
        }
    }

    /// Clear both ready flags (after a round finishes)
    pub fn reset_ready(&mut self, code: &str) {
        if let Some(group) = self.groups.get_mut(code) {
            group.controller.ready = false;
            group.viewer.ready = false;
        }
    }
}

fn normalize_code(code: &str) -> Result<String, GroupError> {
    let code = code.trim();
    if code.is_empty() || code.chars().count() > MAX_CODE_LEN {
        return Err(GroupError::InvalidCode);
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(registry: &mut GroupRegistry, code: &str) -> (Uuid, Uuid) {
        let c = Uuid::new_v4();
        let v = Uuid::new_v4();
        registry.join_or_create(code, c, "ann").unwrap();
        registry.join_or_create(code, v, "bob").unwrap();
        (c, v)
    }

    fn assert_no_orphan_seats(registry: &GroupRegistry) {
        for group in registry.groups.values() {
            let both = group.controller.identity.is_some() && group.viewer.identity.is_some();
            assert_eq!(group.occupied, both, "group {}", group.code);
        }
    }

    #[test]
    fn first_joiner_creates_group_as_controller() {
        let mut registry = GroupRegistry::new();
        let id = Uuid::new_v4();
        assert_eq!(registry.join_or_create("ABCD", id, "ann"), Ok(Seat::Controller));

        let group = registry.get("ABCD").unwrap();
        assert!(!group.occupied);
        assert_eq!(registry.code_of(id), Some("ABCD"));
        assert_no_orphan_seats(&registry);
    }

    #[test]
    fn second_joiner_fills_viewer_and_occupies() {
        let mut registry = GroupRegistry::new();
        let (_, v) = filled(&mut registry, "ABCD");
        let group = registry.get("ABCD").unwrap();
        assert_eq!(group.seat_of(v), Some(Seat::Viewer));
        assert!(group.occupied);
        assert_eq!(group.pair_name(), "ann and bob");
    }

    #[test]
    fn can_join_checks_without_seating() {
        let mut registry = GroupRegistry::new();
        let (c, _) = filled(&mut registry, "ABCD");
        let other = Uuid::new_v4();

        assert_eq!(registry.can_join(" ABCD ", other), Err(GroupError::Full("ABCD".into())));
        assert_eq!(registry.can_join("ABCD", c), Ok(()));
        assert_eq!(registry.can_join("", other), Err(GroupError::InvalidCode));
        assert_eq!(registry.can_join("NEW", other), Ok(()));
        assert!(registry.get("NEW").is_none());
        assert_eq!(registry.code_of(other), None);
    }

    #[test]
    fn third_joiner_is_rejected_without_state_change() {
        let mut registry = GroupRegistry::new();
        filled(&mut registry, "ABCD");
        let before = registry.get("ABCD").unwrap().view();

        let intruder = Uuid::new_v4();
        assert_eq!(
            registry.join_or_create("ABCD", intruder, "eve"),
            Err(GroupError::Full("ABCD".into()))
        );
        assert_eq!(registry.get("ABCD").unwrap().view(), before);
        assert_eq!(registry.code_of(intruder), None);
    }

    #[test]
    fn rejoining_returns_existing_seat() {
        let mut registry = GroupRegistry::new();
        let (c, _) = filled(&mut registry, "ABCD");
        assert_eq!(registry.join_or_create("ABCD", c, "ann"), Ok(Seat::Controller));
    }

    #[test]
    fn invalid_codes_are_rejected() {
        let mut registry = GroupRegistry::new();
        let id = Uuid::new_v4();
        assert_eq!(registry.join_or_create("   ", id, "ann"), Err(GroupError::InvalidCode));
        let long = "x".repeat(MAX_CODE_LEN + 1);
        assert_eq!(registry.join_or_create(&long, id, "ann"), Err(GroupError::InvalidCode));
        assert_eq!(registry.join_or_create(" AB ", id, "ann"), Ok(Seat::Controller));
        assert!(registry.get("AB").is_some());
    }

    #[test]
    fn toggle_ready_reports_both_ready() {
        let mut registry = GroupRegistry::new();
        let (c, v) = filled(&mut registry, "ABCD");
        assert!(!registry.toggle_ready("ABCD", c));
        assert!(registry.toggle_ready("ABCD", v));
    }

    #[test]
    fn toggling_twice_restores_ready_flag() {
        let mut registry = GroupRegistry::new();
        let (c, _) = filled(&mut registry, "ABCD");
        let before = registry.get("ABCD").unwrap().controller.ready;
        registry.toggle_ready("ABCD", c);
        registry.toggle_ready("ABCD", c);
        assert_eq!(registry.get("ABCD").unwrap().controller.ready, before);
    }

    #[test]
    fn lone_seat_never_reports_ready() {
        let mut registry = GroupRegistry::new();
        let c = Uuid::new_v4();
        registry.join_or_create("ABCD", c, "ann").unwrap();
        assert!(!registry.toggle_ready("ABCD", c));
        assert!(!registry.toggle_ready("ABCD", Uuid::new_v4()));
        assert!(!registry.toggle_ready("NOPE", c));
    }

    #[test]
    fn swap_exchanges_seats_and_ready_flags() {
        let mut registry = GroupRegistry::new();
        let (c, v) = filled(&mut registry, "ABCD");
        registry.toggle_ready("ABCD", c);

        assert!(registry.swap_seats("ABCD"));
        let group = registry.get("ABCD").unwrap();
        assert_eq!(group.seat_of(v), Some(Seat::Controller));
        assert_eq!(group.seat_of(c), Some(Seat::Viewer));
        assert!(group.viewer.ready);
        assert!(!group.controller.ready);
        assert!(group.occupied);
        assert!(!registry.swap_seats("NOPE"));
    }

    #[test]
    fn leave_clears_seat_and_resets_ready() {
        let mut registry = GroupRegistry::new();
        let (c, v) = filled(&mut registry, "ABCD");
        registry.toggle_ready("ABCD", c);
        registry.toggle_ready("ABCD", v);

        let departure = registry.leave(v).unwrap();
        assert_eq!(departure.seat, Seat::Viewer);
        assert!(!departure.group_deleted);

        let group = registry.get("ABCD").unwrap();
        assert_eq!(group.seat_of(c), Some(Seat::Controller));
        assert!(!group.controller.ready);
        assert!(!group.occupied);
        assert_no_orphan_seats(&registry);
    }

    #[test]
    fn vacated_controller_seat_fills_first() {
        let mut registry = GroupRegistry::new();
        let (c, _) = filled(&mut registry, "ABCD");
        registry.leave(c);
        let newcomer = Uuid::new_v4();
        assert_eq!(
            registry.join_or_create("ABCD", newcomer, "cat"),
            Ok(Seat::Controller)
        );
        assert!(registry.get("ABCD").unwrap().occupied);
    }

    #[test]
    fn group_deleted_when_both_seats_empty() {
        let mut registry = GroupRegistry::new();
        let (c, v) = filled(&mut registry, "ABCD");
        registry.leave(c);
        let departure = registry.leave(v).unwrap();
        assert!(departure.group_deleted);
        assert!(registry.get("ABCD").is_none());
        assert_eq!(registry.len(), 0);
        assert!(registry.leave(v).is_none());
    }
}
