use serde::{Deserialize, Serialize};

use super::role::{Faction, Role};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    /// Seat number, 0 until the game starts.
    pub seat: u32,
    pub role: Option<Role>,
    pub is_dead: bool,
    /// Driven by an automated agent instead of a human.
    pub automated: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            seat: 0,
            role: None,
            is_dead: false,
            automated: false,
        }
    }

    pub fn automated(mut self) -> Self {
        self.automated = true;
        self
    }

    pub fn display_name(&self) -> String {
        format!("{}. {}", self.seat, self.name)
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    pub fn is_werewolf(&self) -> bool {
        self.role == Some(Role::Werewolf)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn faction(&self) -> Option<Faction> {
        self.role.map(|r| r.faction())
    }

    pub fn is_special(&self) -> bool {
        self.role.map(|r| r.is_special()).unwrap_or(false)
    }

    pub fn kill(&mut self) {
        self.is_dead = true;
    }

    pub fn assign_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    pub fn assign_seat(&mut self, seat: u32) {
        self.seat = seat;
    }
}
