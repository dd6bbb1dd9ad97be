use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::models::game::GamePhase;

/// Identifies one arming of a room's timer. A fired ticket is only honoured
/// while it is still the room's current arming and the room is still in
/// the phase that armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub generation: u64,
    pub phase: GamePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Reminder,
    Deadline,
}

/// The single timer handle a room owns. Arming cancels whatever was armed before.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    token: Option<CancellationToken>,
    generation: u64,
}

impl PhaseTimer {
    pub fn arm(&mut self, phase: GamePhase) -> (TimerTicket, CancellationToken) {
        self.cancel();
        self.generation += 1;
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        (
            TimerTicket {
                generation: self.generation,
                phase,
            },
            token,
        )
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_current(&self, ticket: &TimerTicket) -> bool {
        self.token.is_some() && self.generation == ticket.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// 復元したルームはタイマーを持たない
impl Clone for PhaseTimer {
    fn clone(&self) -> Self {
        Self {
            token: None,
            generation: self.generation,
        }
    }
}

// タイマーは実行時の状態なのでルームの比較には含めない
impl PartialEq for PhaseTimer {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Sleeps for `duration` unless `token` is cancelled first. Returns true when the full duration elapsed.
pub async fn sleep_unless_cancelled(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
