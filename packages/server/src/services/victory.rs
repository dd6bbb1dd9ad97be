use crate::models::{
    game::{Outcome, VictoryReason},
    player::Player,
    role::Faction,
};

/// Living head counts the win conditions are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Census {
    pub werewolves: usize,
    pub villagers: usize,
    pub specials: usize,
}

impl Census {
    pub fn of<'a>(players: impl IntoIterator<Item = &'a Player>) -> Self {
        let mut census = Census::default();
        for player in players.into_iter().filter(|p| p.is_alive()) {
            match player.faction() {
                Some(Faction::Werewolves) => census.werewolves += 1,
                Some(Faction::Villagers) => {
                    census.villagers += 1;
                    if player.is_special() {
                        census.specials += 1;
                    }
                }
                None => {}
            }
        }
        census
    }
}

/// `None` while the game continues.
pub fn evaluate<'a>(players: impl IntoIterator<Item = &'a Player>) -> Option<Outcome> {
    decide(Census::of(players))
}

pub fn decide(census: Census) -> Option<Outcome> {
    if census.werewolves == 0 {
        return Some(Outcome {
            winner: Faction::Villagers,
            reason: VictoryReason::AllWerewolvesEliminated,
        });
    }
    if census.villagers <= census.werewolves {
        return Some(Outcome {
            winner: Faction::Werewolves,
            reason: VictoryReason::WerewolvesReachParity,
        });
    }
    if census.specials == 0 {
        return Some(Outcome {
            winner: Faction::Werewolves,
            reason: VictoryReason::SpecialRolesEliminated,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;

    fn roster(roles: &[(Role, bool)]) -> Vec<Player> {
        roles
            .iter()
            .enumerate()
            .map(|(i, (role, alive))| {
                let mut p = Player::new(format!("p{}", i), format!("P{}", i));
                p.assign_role(*role);
                if !alive {
                    p.kill();
                }
                p
            })
            .collect()
    }

    #[test]
    fn no_living_werewolves_means_village_wins() {
        let players = roster(&[
            (Role::Werewolf, false),
            (Role::Seer, true),
            (Role::Villager, true),
        ]);
        let outcome = evaluate(&players).unwrap();
        assert_eq!(outcome.winner, Faction::Villagers);
        assert_eq!(outcome.reason, VictoryReason::AllWerewolvesEliminated);
    }

    #[test]
    fn parity_hands_the_game_to_the_werewolves() {
        let players = roster(&[
            (Role::Werewolf, true),
            (Role::Werewolf, true),
            (Role::Seer, true),
            (Role::Villager, true),
        ]);
        let outcome = evaluate(&players).unwrap();
        assert_eq!(outcome.winner, Faction::Werewolves);
        assert_eq!(outcome.reason, VictoryReason::WerewolvesReachParity);
    }

    #[test]
    fn losing_every_special_role_loses_the_game() {
        let players = roster(&[
            (Role::Werewolf, true),
            (Role::Seer, false),
            (Role::Witch, false),
            (Role::Hunter, false),
            (Role::Villager, true),
            (Role::Villager, true),
        ]);
        let outcome = evaluate(&players).unwrap();
        assert_eq!(outcome.reason, VictoryReason::SpecialRolesEliminated);
    }

    #[test]
    fn balanced_roster_continues() {
        let players = roster(&[
            (Role::Werewolf, true),
            (Role::Seer, true),
            (Role::Villager, true),
        ]);
        assert_eq!(evaluate(&players), None);
    }
}
