//! Shared target acquisition.
//!
//! Once per tick the policy picks a single enemy position for its offensive
//! units. Teams are scanned in snapshot order and the first other team that
//! still has a base provides the target: its first listed base. There is no
//! distance or threat weighting and nothing carries over between ticks.

use crate::engine::{BaseHandle, Snapshot, World};
use crate::math::Vec2Fixed;

/// Pick this tick's shared target for team `own_team`.
///
/// Returns `None` when the snapshot holds no other team with a base.
#[must_use]
pub fn acquire_target<W: World>(snapshot: &Snapshot<W>, own_team: &str) -> Option<Vec2Fixed> {
    if snapshot.len() <= 1 {
        return None;
    }
    snapshot
        .teams()
        .filter(|team| team.name != own_team)
        .find_map(|team| team.bases.first().map(BaseHandle::position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildKind, BuildOrder};
    use crate::engine::{ShipHandle, TeamContext, Uid, VehicleHandle};
    use crate::math::Heading;

    struct PinBase(Vec2Fixed);

    impl BaseHandle for PinBase {
        fn uid(&self) -> Uid {
            Uid::new(0)
        }
        fn position(&self) -> Vec2Fixed {
            self.0
        }
        fn crystal(&self) -> i32 {
            0
        }
        fn mines(&self) -> u32 {
            0
        }
        fn cost(&self, _kind: BuildKind) -> i32 {
            0
        }
        fn build(&mut self, _order: BuildOrder) {}
    }

    struct Idle;

    impl VehicleHandle for Idle {
        fn uid(&self) -> Uid {
            Uid::new(0)
        }
        fn position(&self) -> Vec2Fixed {
            Vec2Fixed::ZERO
        }
        fn is_stopped(&self) -> bool {
            true
        }
        fn is_stuck(&self) -> bool {
            false
        }
        fn set_heading(&mut self, _heading: Heading) {}
        fn goto(&mut self, _destination: Vec2Fixed) {}
    }

    impl ShipHandle for Idle {
        fn owner(&self) -> Uid {
            Uid::new(0)
        }
        fn convert_to_base(&mut self) {}
    }

    struct PinWorld;

    impl World for PinWorld {
        type Base = PinBase;
        type Vehicle = Idle;
        type Ship = Idle;
    }

    fn team(name: &str, bases: &[(i32, i32)]) -> TeamContext<PinWorld> {
        let mut team = TeamContext::new(name);
        team.bases = bases
            .iter()
            .map(|&(x, y)| PinBase(Vec2Fixed::from_num(x, y)))
            .collect();
        team
    }

    #[test]
    fn test_lone_team_has_no_target() {
        let snapshot = Snapshot::new().with_team(team("Farmers", &[(1, 1)]));
        assert_eq!(acquire_target(&snapshot, "Farmers"), None);
    }

    #[test]
    fn test_skips_teams_without_bases() {
        let snapshot = Snapshot::new()
            .with_team(team("Farmers", &[(1, 1)]))
            .with_team(team("A", &[]))
            .with_team(team("B", &[(30, 40), (5, 5)]));

        assert_eq!(
            acquire_target(&snapshot, "Farmers"),
            Some(Vec2Fixed::from_num(30, 40))
        );
    }

    #[test]
    fn test_first_team_in_order_wins() {
        let snapshot = Snapshot::new()
            .with_team(team("A", &[(100, 0)]))
            .with_team(team("Farmers", &[(1, 1)]))
            .with_team(team("B", &[(2, 2)]));

        assert_eq!(
            acquire_target(&snapshot, "Farmers"),
            Some(Vec2Fixed::from_num(100, 0))
        );
    }

    #[test]
    fn test_no_enemy_bases_no_target() {
        let snapshot = Snapshot::new()
            .with_team(team("Farmers", &[(1, 1)]))
            .with_team(team("A", &[]))
            .with_team(team("B", &[]));

        assert_eq!(acquire_target(&snapshot, "Farmers"), None);
    }
}
