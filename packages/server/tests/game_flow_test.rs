use std::sync::Arc;
use std::time::Duration;

use werewolf_server::{
    error::GameError,
    models::{
        config::GameConfig,
        game::{GamePhase, PlayerAction, VictoryReason},
        player::Player,
        role::{Faction, Role},
        room::Room,
    },
    phases::{self, GameContext, Transition},
    services::{
        agent::RandomAgent, channels::ModerationAction, collaborators::Collaborators,
        game_service::GameManager,
    },
    utils::test_setup::{quiet_config, standard_roles, Failing, Harness},
};

const ROOM: &str = "r";

async fn phase(manager: &Arc<GameManager>) -> GamePhase {
    manager.snapshot(ROOM).await.unwrap().phase
}

async fn state(manager: &Arc<GameManager>) -> Room {
    manager.room_state(ROOM).await.unwrap()
}

async fn act(manager: &Arc<GameManager>, actor: &str, action: PlayerAction) {
    manager.submit(ROOM, actor, action).await.unwrap();
}

fn kill(target: &str) -> PlayerAction {
    PlayerAction::NightKill {
        target: target.into(),
    }
}

fn vote(target: &str) -> PlayerAction {
    PlayerAction::Vote {
        target: target.into(),
    }
}

async fn sleep_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Nine players, standard seats; the wolves kill `victim` and the seer checks seat 1.
async fn start_and_kill(victim: &str) -> Harness {
    let h = Harness::new(quiet_config());
    h.fill_room(ROOM, 9).await;
    h.manager
        .start_game_with_roles(ROOM, "p1", standard_roles())
        .await
        .unwrap();
    for wolf in ["p1", "p2", "p3"] {
        act(&h.manager, wolf, kill(victim)).await;
    }
    act(
        &h.manager,
        "p4",
        PlayerAction::Investigate {
            target: "p1".into(),
        },
    )
    .await;
    h
}

/// Seat 4 dies on night one, gives last words, and the creator opens the vote.
async fn day_vote_after_seat_four_dies() -> Harness {
    let h = start_and_kill("p4").await;
    act(&h.manager, "p5", PlayerAction::Pass).await;
    act(&h.manager, "p4", PlayerAction::FinishLastWords).await;
    act(&h.manager, "p1", PlayerAction::StartVote).await;
    assert_eq!(phase(&h.manager).await, GamePhase::DayVoting);
    h
}

async fn cast(manager: &Arc<GameManager>, ballots: &[(&str, &str)]) {
    for (voter, target) in ballots {
        act(manager, voter, vote(target)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn first_night_kill_leads_to_last_words_then_day() {
    let h = start_and_kill("p4").await;
    let m = &h.manager;

    assert!(h
        .messenger
        .direct_to("p4")
        .iter()
        .any(|t| t.contains("is a werewolf")));
    assert_eq!(phase(m).await, GamePhase::NightProtection);

    act(m, "p5", PlayerAction::Pass).await;
    assert_eq!(phase(m).await, GamePhase::LastWords);
    let room = state(m).await;
    assert!(room.players["p4"].is_dead);
    assert_eq!(room.last_killed.as_deref(), Some("p4"));
    assert_eq!(room.alive_count(), 8);
    assert!(h.messenger.group_contains("Died last night: 4. Player4"));

    assert!(m.capture_speech(ROOM, "p4", "I was the seer").await.unwrap());
    assert!(!m.capture_speech(ROOM, "p5", "not my turn").await.unwrap());
    act(m, "p4", PlayerAction::FinishLastWords).await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::DaySpeaking);
    assert!(!room.is_first_round);
    assert_eq!(room.last_killed, None);
    assert_eq!(room.speaking.current_speaker_id.as_deref(), Some("p1"));
    assert!(room.log.contains("💀 Last words: 4. Player4 - I was the seer"));
    assert!(h
        .moderator
        .calls_for("p4")
        .iter()
        .any(|a| matches!(a, ModerationAction::Mute { .. })));
}

#[tokio::test(start_paused = true)]
async fn speeches_are_logged_as_each_speaker_finishes() {
    let h = start_and_kill("p4").await;
    let m = &h.manager;
    act(m, "p5", PlayerAction::Pass).await;
    act(m, "p4", PlayerAction::FinishLastWords).await;

    assert!(m.capture_speech(ROOM, "p1", "hello").await.unwrap());
    assert_eq!(
        m.submit(ROOM, "p2", PlayerAction::FinishSpeaking).await,
        Err(GameError::NotYourTurn)
    );
    act(m, "p1", PlayerAction::FinishSpeaking).await;

    let room = state(m).await;
    assert_eq!(room.speaking.current_speaker_id.as_deref(), Some("p2"));
    assert!(room.log.contains("💬 Speech: 1. Player1 - hello"));
}

#[tokio::test(start_paused = true)]
async fn day_vote_exiles_the_plurality() {
    let h = day_vote_after_seat_four_dies().await;
    let m = &h.manager;

    cast(
        m,
        &[
            ("p5", "p3"),
            ("p6", "p3"),
            ("p7", "p3"),
            ("p8", "p3"),
            ("p9", "p3"),
            ("p2", "p1"),
            ("p3", "p1"),
        ],
    )
    .await;
    assert_eq!(phase(m).await, GamePhase::DayVoting);
    act(m, "p1", vote("p2")).await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::LastWords);
    assert!(room.players["p3"].is_dead);
    assert_eq!(room.last_killed.as_deref(), Some("p3"));
    assert!(room.last_words_from_vote);
    assert!(h.messenger.group_contains("📊 Vote result"));
    assert!(h.messenger.group_contains("3. Player3: 5"));

    act(m, "p3", PlayerAction::FinishLastWords).await;
    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::NightKill);
    assert_eq!(room.round, 2);
    assert!(!room.last_words_from_vote);
}

#[tokio::test(start_paused = true)]
async fn tied_vote_goes_to_a_runoff_limited_to_the_tied() {
    let h = day_vote_after_seat_four_dies().await;
    let m = &h.manager;

    cast(
        m,
        &[
            ("p5", "p1"),
            ("p6", "p1"),
            ("p7", "p1"),
            ("p1", "p2"),
            ("p8", "p2"),
            ("p9", "p2"),
            ("p2", "p5"),
            ("p3", "p5"),
        ],
    )
    .await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::PkSpeaking);
    assert_eq!(room.day_votes.pk_players, vec!["p1", "p2"]);
    assert_eq!(room.speaking.current_speaker_id.as_deref(), Some("p1"));

    act(m, "p1", PlayerAction::FinishSpeaking).await;
    act(m, "p2", PlayerAction::FinishSpeaking).await;
    assert_eq!(phase(m).await, GamePhase::PkVoting);

    let before = state(m).await;
    assert_eq!(
        m.submit(ROOM, "p5", vote("p7")).await,
        Err(GameError::OutsideRunoff)
    );
    assert_eq!(state(m).await, before);

    cast(
        m,
        &[
            ("p2", "p1"),
            ("p3", "p1"),
            ("p5", "p1"),
            ("p6", "p1"),
            ("p7", "p1"),
            ("p1", "p2"),
            ("p8", "p2"),
            ("p9", "p2"),
        ],
    )
    .await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::LastWords);
    assert!(room.players["p1"].is_dead);
    assert!(room.day_votes.pk_players.is_empty());
}

#[tokio::test(start_paused = true)]
async fn runoff_tied_again_exiles_nobody() {
    let h = day_vote_after_seat_four_dies().await;
    let m = &h.manager;

    cast(
        m,
        &[
            ("p5", "p1"),
            ("p6", "p1"),
            ("p7", "p1"),
            ("p1", "p2"),
            ("p8", "p2"),
            ("p9", "p2"),
            ("p2", "p5"),
            ("p3", "p5"),
        ],
    )
    .await;
    act(m, "p1", PlayerAction::StartVote).await;
    assert_eq!(phase(m).await, GamePhase::PkVoting);

    cast(
        m,
        &[
            ("p2", "p1"),
            ("p3", "p1"),
            ("p5", "p1"),
            ("p6", "p1"),
            ("p1", "p2"),
            ("p7", "p2"),
            ("p8", "p2"),
            ("p9", "p2"),
        ],
    )
    .await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::NightKill);
    assert_eq!(room.round, 2);
    assert_eq!(room.alive_count(), 8);
    assert!(h.messenger.group_contains("Nobody is exiled today"));
}

#[tokio::test(start_paused = true)]
async fn cancelled_timer_never_fires_into_a_later_phase() {
    let h = Harness::new(quiet_config());
    h.fill_room(ROOM, 9).await;
    let m = &h.manager;
    m.start_game_with_roles(ROOM, "p1", standard_roles())
        .await
        .unwrap();

    sleep_secs(60).await;
    for wolf in ["p1", "p2", "p3"] {
        act(m, wolf, kill("p7")).await;
    }
    assert_eq!(phase(m).await, GamePhase::NightInvestigation);

    // past the original night-kill deadline
    sleep_secs(70).await;
    assert_eq!(phase(m).await, GamePhase::NightInvestigation);
    assert!(!h.messenger.group_contains("werewolves ran out of time"));

    sleep_secs(60).await;
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    assert!(state(m).await.seer_checked);
}

#[tokio::test(start_paused = true)]
async fn idle_night_times_out_into_a_peaceful_day() {
    let h = Harness::new(quiet_config());
    h.fill_room(ROOM, 9).await;
    let m = &h.manager;
    m.start_game_with_roles(ROOM, "p1", standard_roles())
        .await
        .unwrap();

    sleep_secs(121).await;
    assert_eq!(phase(m).await, GamePhase::NightInvestigation);
    assert_eq!(state(m).await.last_killed, None);
    sleep_secs(121).await;
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    sleep_secs(121).await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::DaySpeaking);
    assert_eq!(room.alive_count(), 9);
    assert!(h.messenger.group_contains("Last night was peaceful"));
    assert!(room.log.contains("A peaceful night"));
}

#[tokio::test(start_paused = true)]
async fn vote_reminder_then_empty_vote_moves_to_night() {
    let h = day_vote_after_seat_four_dies().await;
    let m = &h.manager;

    sleep_secs(91).await;
    assert!(h.messenger.group_contains("30 seconds left to vote! 0/8"));
    assert_eq!(phase(m).await, GamePhase::DayVoting);

    sleep_secs(30).await;
    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::NightKill);
    assert_eq!(room.round, 2);
    assert_eq!(room.alive_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn hunter_killed_at_night_shoots_before_last_words() {
    let h = start_and_kill("p6").await;
    let m = &h.manager;
    act(m, "p5", PlayerAction::Pass).await;

    assert_eq!(phase(m).await, GamePhase::Retaliation);
    assert!(h
        .messenger
        .direct_to("p6")
        .iter()
        .any(|t| t.contains("You were killed by the werewolves")));

    assert_eq!(
        m.submit(
            ROOM,
            "p6",
            PlayerAction::Retaliate {
                target: "p6".into()
            }
        )
        .await,
        Err(GameError::SelfTarget)
    );
    act(
        m,
        "p6",
        PlayerAction::Retaliate {
            target: "p1".into(),
        },
    )
    .await;

    let room = state(m).await;
    assert!(room.players["p1"].is_dead);
    assert!(room.hunter.has_shot);
    assert_eq!(room.phase, GamePhase::LastWords);
    assert_eq!(room.last_killed.as_deref(), Some("p6"));
}

#[tokio::test(start_paused = true)]
async fn poisoned_hunter_gets_no_shot() {
    let h = start_and_kill("p7").await;
    let m = &h.manager;
    act(
        m,
        "p5",
        PlayerAction::Poison {
            target: "p6".into(),
        },
    )
    .await;

    let room = state(m).await;
    assert!(room.players["p6"].is_dead);
    assert!(room.players["p7"].is_dead);
    assert_eq!(room.phase, GamePhase::LastWords);
    assert_eq!(room.hunter.pending_shot_player_id, None);
    assert_eq!(
        m.submit(
            ROOM,
            "p6",
            PlayerAction::Retaliate {
                target: "p1".into()
            }
        )
        .await,
        Err(GameError::WrongPhase(GamePhase::LastWords))
    );
}

#[tokio::test(start_paused = true)]
async fn witch_antidote_saves_tonights_victim() {
    let h = start_and_kill("p7").await;
    let m = &h.manager;
    act(m, "p5", PlayerAction::Save).await;

    let room = state(m).await;
    assert!(!room.players["p7"].is_dead);
    assert!(room.witch.antidote_used);
    assert_eq!(room.phase, GamePhase::DaySpeaking);
    assert!(h.messenger.group_contains("Last night was peaceful"));
}

#[tokio::test(start_paused = true)]
async fn exiled_hunter_shoots_then_gives_last_words() {
    let h = day_vote_after_seat_four_dies().await;
    let m = &h.manager;

    let mut ballots: Vec<(&str, &str)> = ["p1", "p2", "p3", "p5", "p7", "p8", "p9"]
        .iter()
        .map(|voter| (*voter, "p6"))
        .collect();
    ballots.push(("p6", "p1"));
    cast(m, &ballots).await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::Retaliation);
    assert_eq!(room.last_killed.as_deref(), Some("p6"));

    act(
        m,
        "p6",
        PlayerAction::Retaliate {
            target: "p2".into(),
        },
    )
    .await;
    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::LastWords);
    assert!(room.players["p2"].is_dead);
    assert_eq!(room.last_killed.as_deref(), Some("p6"));

    act(m, "p6", PlayerAction::FinishLastWords).await;
    assert_eq!(phase(m).await, GamePhase::NightKill);
}

#[tokio::test(start_paused = true)]
async fn werewolves_win_at_parity_without_special_roles() {
    let config = GameConfig {
        total_players: 3,
        werewolf_count: 1,
        seer_count: 0,
        witch_count: 0,
        hunter_count: 0,
        villager_count: 2,
        ..quiet_config()
    };
    let h = Harness::new(config.clone());
    h.manager.create_room(ROOM, "p1", None).await.unwrap();
    for n in 1..=3 {
        h.manager
            .join_room(ROOM, Player::new(format!("p{}", n), format!("Player{}", n)))
            .await
            .unwrap();
    }
    h.manager
        .start_game_with_roles(ROOM, "p1", config.roles_pool())
        .await
        .unwrap();

    act(&h.manager, "p1", kill("p2")).await;

    assert_eq!(
        h.manager.snapshot(ROOM).await,
        Err(GameError::RoomNotFound(ROOM.into()))
    );
    let outcome = h.manager.outcome(ROOM).await.unwrap();
    assert_eq!(outcome.winner, Faction::Werewolves);
    assert_eq!(outcome.reason, VictoryReason::WerewolvesReachParity);
    assert!(h.messenger.group_contains("Game over"));

    for id in ["p1", "p2", "p3"] {
        assert!(h
            .moderator
            .calls_for(id)
            .contains(&ModerationAction::RestoreName {
                name: id.replace('p', "Player"),
            }));
    }
    assert!(h
        .moderator
        .calls()
        .iter()
        .any(|(_, a)| *a == ModerationAction::GroupMute { enabled: false }));
    assert!(h.manager.find_room_by_player("p1").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn villagers_win_even_when_the_summary_service_fails() {
    let config = GameConfig {
        total_players: 4,
        werewolf_count: 1,
        seer_count: 1,
        witch_count: 0,
        hunter_count: 0,
        villager_count: 2,
        enable_summary: true,
        ..GameConfig::default()
    };
    let h = Harness::with_collaborators(
        config.clone(),
        Collaborators::silent().with_summarizer(Arc::new(Failing)),
    );
    let m = &h.manager;
    m.create_room(ROOM, "p1", None).await.unwrap();
    for n in 1..=4 {
        m.join_room(ROOM, Player::new(format!("p{}", n), format!("Player{}", n)))
            .await
            .unwrap();
    }
    m.start_game_with_roles(ROOM, "p1", config.roles_pool())
        .await
        .unwrap();

    act(m, "p1", kill("p3")).await;
    act(
        m,
        "p2",
        PlayerAction::Investigate {
            target: "p1".into(),
        },
    )
    .await;
    assert_eq!(phase(m).await, GamePhase::LastWords);
    act(m, "p3", PlayerAction::FinishLastWords).await;
    act(m, "p1", PlayerAction::StartVote).await;
    cast(m, &[("p2", "p1"), ("p4", "p1"), ("p1", "p2")]).await;

    let outcome = m.outcome(ROOM).await.unwrap();
    assert_eq!(outcome.winner, Faction::Villagers);
    assert_eq!(outcome.reason, VictoryReason::AllWerewolvesEliminated);
    assert!(h.messenger.group_contains("📜 Roles"));
}

#[tokio::test(start_paused = true)]
async fn failing_collaborators_never_block_the_game() {
    let collaborators = Collaborators::silent()
        .with_messenger(Arc::new(Failing))
        .with_moderator(Arc::new(Failing))
        .with_agents(Arc::new(Failing))
        .with_summarizer(Arc::new(Failing));
    let m = GameManager::new(quiet_config(), collaborators, Some(11));
    m.create_room(ROOM, "p1", None).await.unwrap();
    for n in 1..=9 {
        m.join_room(ROOM, Player::new(format!("p{}", n), format!("Player{}", n)))
            .await
            .unwrap();
    }
    m.start_game_with_roles(ROOM, "p1", standard_roles())
        .await
        .unwrap();
    for wolf in ["p1", "p2", "p3"] {
        act(&m, wolf, kill("p9")).await;
    }
    sleep_secs(121).await;
    act(&m, "p5", PlayerAction::Pass).await;

    let room = state(&m).await;
    assert_eq!(room.phase, GamePhase::LastWords);
    assert!(room.players["p9"].is_dead);
    // moderation bookkeeping still tracks what should be undone
    assert!(room.group_muted);
}

#[tokio::test(start_paused = true)]
async fn rejected_actions_leave_the_room_untouched() {
    let h = Harness::new(quiet_config());
    h.fill_room(ROOM, 9).await;
    let m = &h.manager;
    m.start_game_with_roles(ROOM, "p1", standard_roles())
        .await
        .unwrap();

    let before = state(m).await;
    assert_eq!(
        m.submit(ROOM, "p4", kill("p5")).await,
        Err(GameError::WrongRole)
    );
    assert_eq!(
        m.submit(ROOM, "p1", vote("p5")).await,
        Err(GameError::WrongPhase(GamePhase::NightKill))
    );
    assert_eq!(
        m.submit(ROOM, "p1", kill("nobody")).await,
        Err(GameError::UnknownTarget("nobody".into()))
    );
    assert_eq!(
        m.submit(ROOM, "stranger", kill("p5")).await,
        Err(GameError::NotInRoom("stranger".into()))
    );
    assert_eq!(state(m).await, before);
}

#[tokio::test(start_paused = true)]
async fn werewolves_can_whisper_to_each_other() {
    let h = Harness::new(quiet_config());
    h.fill_room(ROOM, 9).await;
    let m = &h.manager;
    m.start_game_with_roles(ROOM, "p1", standard_roles())
        .await
        .unwrap();

    act(
        m,
        "p1",
        PlayerAction::Conspire {
            message: "go for seat 5".into(),
        },
    )
    .await;
    for mate in ["p2", "p3"] {
        assert!(h
            .messenger
            .direct_to(mate)
            .iter()
            .any(|t| t.contains("go for seat 5")));
    }
    assert!(h.messenger.direct_to("p4").iter().all(|t| !t.contains("go for seat 5")));
    assert_eq!(
        m.submit(
            ROOM,
            "p4",
            PlayerAction::Conspire {
                message: "hi".into()
            }
        )
        .await,
        Err(GameError::WrongRole)
    );
}

#[tokio::test(start_paused = true)]
async fn room_membership_rules() {
    let h = Harness::new(quiet_config());
    let m = &h.manager;
    h.fill_room(ROOM, 8).await;

    assert_eq!(
        m.join_room(ROOM, Player::new("p1", "Again")).await,
        Err(GameError::AlreadyJoined("p1".into()))
    );
    m.create_room("other", "p1", None).await.unwrap();
    assert_eq!(
        m.join_room("other", Player::new("p2", "Player2")).await,
        Err(GameError::InAnotherRoom("p2".into(), ROOM.into()))
    );
    assert_eq!(
        m.create_room(ROOM, "p1", None).await.err(),
        Some(GameError::RoomExists(ROOM.into()))
    );
    assert_eq!(
        m.start_game(ROOM, "p1").await,
        Err(GameError::NotEnoughPlayers {
            needed: 9,
            actual: 8
        })
    );

    m.join_room(ROOM, Player::new("p9", "Player9")).await.unwrap();
    assert_eq!(
        m.join_room(ROOM, Player::new("p10", "Player10")).await,
        Err(GameError::RoomFull(9))
    );
    assert_eq!(m.start_game(ROOM, "p2").await, Err(GameError::NotCreator));
    m.start_game(ROOM, "p1").await.unwrap();
    assert_eq!(m.start_game(ROOM, "p1").await, Err(GameError::AlreadyStarted));
    assert_eq!(
        m.eject(ROOM, "p1", "p9").await,
        Err(GameError::AlreadyStarted)
    );
    assert_eq!(m.find_room_by_player("p5").await.as_deref(), Some(ROOM));
}

#[tokio::test(start_paused = true)]
async fn ending_a_room_undoes_moderation() {
    let h = start_and_kill("p4").await;
    let m = &h.manager;
    act(m, "p5", PlayerAction::Pass).await;
    act(m, "p4", PlayerAction::FinishLastWords).await;
    assert_eq!(phase(m).await, GamePhase::DaySpeaking);

    assert_eq!(m.end_room(ROOM, "p2").await, Err(GameError::NotCreator));
    m.end_room(ROOM, "p1").await.unwrap();

    assert!(m.snapshot(ROOM).await.is_err());
    assert!(h.moderator.calls_for("p4").contains(&ModerationAction::Unmute));
    assert!(h
        .moderator
        .calls_for("p1")
        .contains(&ModerationAction::RevokeSpeaking));
    assert!(h
        .moderator
        .calls_for("p1")
        .contains(&ModerationAction::RestoreName {
            name: "Player1".into()
        }));

    // the speaking timer was cancelled with the room
    sleep_secs(600).await;
    assert!(m.list_rooms().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn room_state_survives_a_json_round_trip() {
    let h = day_vote_after_seat_four_dies().await;
    act(&h.manager, "p5", vote("p3")).await;

    let room = state(&h.manager).await;
    let json = serde_json::to_string(&room).unwrap();
    let restored: Room = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, room);
    assert!(!restored.timer.is_armed());
    assert_eq!(restored.day_votes.votes.get("p5").map(String::as_str), Some("p3"));
}

#[tokio::test(start_paused = true)]
async fn automated_players_play_a_whole_game() {
    let h = Harness::with_collaborators(
        quiet_config(),
        Collaborators::silent().with_agents(Arc::new(RandomAgent::seeded(42))),
    );
    let m = &h.manager;
    m.create_room(ROOM, "p1", None).await.unwrap();
    for n in 1..=9 {
        m.join_room(
            ROOM,
            Player::new(format!("p{}", n), format!("Bot{}", n)).automated(),
        )
        .await
        .unwrap();
    }
    m.start_game(ROOM, "p1").await.unwrap();

    for _ in 0..200 {
        if m.outcome(ROOM).await.is_some() {
            break;
        }
        sleep_secs(60).await;
    }
    assert!(m.outcome(ROOM).await.is_some());
    assert!(m.list_rooms().await.is_empty());
}

/// Night one with `victim` killed and saved, then an idle day vote into night two.
async fn second_night_after_a_save(victim: &str) -> Harness {
    let h = start_and_kill(victim).await;
    let m = &h.manager;
    act(m, "p5", PlayerAction::Save).await;
    act(m, "p1", PlayerAction::StartVote).await;
    sleep_secs(121).await;
    assert_eq!(phase(m).await, GamePhase::NightKill);
    h
}

async fn idle_day_into_night(manager: &Arc<GameManager>) {
    act(manager, "p1", PlayerAction::StartVote).await;
    sleep_secs(121).await;
    assert_eq!(phase(manager).await, GamePhase::NightKill);
}

#[tokio::test(start_paused = true)]
async fn night_commands_follow_the_role_table() {
    let h = start_and_kill("p7").await;
    let m = &h.manager;
    assert_eq!(phase(m).await, GamePhase::NightProtection);

    let before = state(m).await;
    assert_eq!(
        m.submit(ROOM, "p8", PlayerAction::Pass).await,
        Err(GameError::WrongRole)
    );
    assert_eq!(
        m.submit(ROOM, "p1", PlayerAction::Save).await,
        Err(GameError::WrongRole)
    );
    assert_eq!(
        m.submit(ROOM, "p1", kill("p8")).await,
        Err(GameError::WrongPhase(GamePhase::NightProtection))
    );
    assert_eq!(
        m.submit(
            ROOM,
            "p6",
            PlayerAction::Retaliate {
                target: "p1".into()
            }
        )
        .await,
        Err(GameError::WrongPhase(GamePhase::NightProtection))
    );
    assert_eq!(state(m).await, before);
}

#[tokio::test(start_paused = true)]
async fn witch_cannot_poison_herself_but_may_save_herself() {
    let h = start_and_kill("p5").await;
    let m = &h.manager;

    assert_eq!(
        m.submit(
            ROOM,
            "p5",
            PlayerAction::Poison {
                target: "p5".into()
            }
        )
        .await,
        Err(GameError::SelfTarget)
    );
    act(m, "p5", PlayerAction::Save).await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::DaySpeaking);
    assert!(!room.players["p5"].is_dead);
    assert!(!room.witch.poison_used);
}

#[tokio::test(start_paused = true)]
async fn witch_uses_one_potion_per_night() {
    let h = start_and_kill("p7").await;
    let m = &h.manager;

    let mut room = state(m).await;
    let ctx = GameContext::new(Collaborators::silent(), Some(3));
    assert!(phases::handle_action(&mut room, &ctx, "p5", PlayerAction::Save)
        .await
        .is_ok());
    assert_eq!(
        phases::handle_action(
            &mut room,
            &ctx,
            "p5",
            PlayerAction::Poison {
                target: "p1".into()
            }
        )
        .await,
        Err(GameError::AlreadyActed)
    );

    // 実際のルームでは解毒でその夜が終わる
    act(m, "p5", PlayerAction::Save).await;
    assert_eq!(
        m.submit(
            ROOM,
            "p5",
            PlayerAction::Poison {
                target: "p1".into()
            }
        )
        .await,
        Err(GameError::WrongPhase(GamePhase::DaySpeaking))
    );
    assert!(!state(m).await.witch.poison_used);
}

#[tokio::test(start_paused = true)]
async fn witch_potions_do_not_come_back_on_later_nights() {
    let h = second_night_after_a_save("p7").await;
    let m = &h.manager;

    for wolf in ["p1", "p2", "p3"] {
        act(m, wolf, kill("p8")).await;
    }
    act(
        m,
        "p4",
        PlayerAction::Investigate {
            target: "p2".into(),
        },
    )
    .await;
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    assert_eq!(
        m.submit(ROOM, "p5", PlayerAction::Save).await,
        Err(GameError::PotionUsed("antidote"))
    );
    act(
        m,
        "p5",
        PlayerAction::Poison {
            target: "p9".into(),
        },
    )
    .await;
    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::DaySpeaking);
    assert!(room.players["p8"].is_dead);
    assert!(room.players["p9"].is_dead);

    idle_day_into_night(m).await;
    for wolf in ["p1", "p2", "p3"] {
        act(m, wolf, kill("p7")).await;
    }
    act(
        m,
        "p4",
        PlayerAction::Investigate {
            target: "p3".into(),
        },
    )
    .await;
    assert_eq!(
        m.submit(
            ROOM,
            "p5",
            PlayerAction::Poison {
                target: "p2".into()
            }
        )
        .await,
        Err(GameError::PotionUsed("poison"))
    );
    assert_eq!(
        m.submit(ROOM, "p5", PlayerAction::Save).await,
        Err(GameError::PotionUsed("antidote"))
    );
    act(m, "p5", PlayerAction::Pass).await;
    let outcome = m.outcome(ROOM).await.unwrap();
    assert_eq!(outcome.winner, Faction::Werewolves);
}

#[tokio::test(start_paused = true)]
async fn antidote_needs_a_kill_to_undo() {
    let h = Harness::new(quiet_config());
    h.fill_room(ROOM, 9).await;
    let m = &h.manager;
    m.start_game_with_roles(ROOM, "p1", standard_roles())
        .await
        .unwrap();

    sleep_secs(121).await;
    act(
        m,
        "p4",
        PlayerAction::Investigate {
            target: "p1".into(),
        },
    )
    .await;
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    assert_eq!(
        m.submit(ROOM, "p5", PlayerAction::Save).await,
        Err(GameError::NoKillTonight)
    );
    assert!(!state(m).await.witch.antidote_used);
}

#[tokio::test(start_paused = true)]
async fn dead_seer_turn_passes_after_a_short_wait() {
    let h = start_and_kill("p4").await;
    let m = &h.manager;
    act(m, "p5", PlayerAction::Pass).await;
    act(m, "p4", PlayerAction::FinishLastWords).await;
    idle_day_into_night(m).await;

    for wolf in ["p1", "p2", "p3"] {
        act(m, wolf, kill("p7")).await;
    }
    assert_eq!(phase(m).await, GamePhase::NightInvestigation);
    sleep_secs(9).await;
    assert_eq!(phase(m).await, GamePhase::NightInvestigation);
    sleep_secs(7).await;
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    assert!(!h.messenger.group_contains("The seer ran out of time"));
}

#[tokio::test(start_paused = true)]
async fn dead_witch_turn_passes_after_a_short_wait() {
    let h = start_and_kill("p5").await;
    let m = &h.manager;
    act(m, "p5", PlayerAction::Pass).await;
    act(m, "p5", PlayerAction::FinishLastWords).await;
    idle_day_into_night(m).await;

    for wolf in ["p1", "p2", "p3"] {
        act(m, wolf, kill("p7")).await;
    }
    act(
        m,
        "p4",
        PlayerAction::Investigate {
            target: "p2".into(),
        },
    )
    .await;
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    sleep_secs(9).await;
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    sleep_secs(7).await;

    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::DaySpeaking);
    assert!(room.players["p7"].is_dead);
    assert!(!h.messenger.group_contains("The witch ran out of time"));
}

#[tokio::test(start_paused = true)]
async fn game_without_a_seer_skips_investigation() {
    let config = GameConfig {
        seer_count: 0,
        villager_count: 4,
        ..quiet_config()
    };
    let h = Harness::new(config);
    h.fill_room(ROOM, 9).await;
    let m = &h.manager;
    let roles = vec![
        Role::Werewolf,
        Role::Werewolf,
        Role::Werewolf,
        Role::Villager,
        Role::Witch,
        Role::Hunter,
        Role::Villager,
        Role::Villager,
        Role::Villager,
    ];
    m.start_game_with_roles(ROOM, "p1", roles).await.unwrap();

    for wolf in ["p1", "p2", "p3"] {
        act(m, wolf, kill("p4")).await;
    }
    assert_eq!(phase(m).await, GamePhase::NightProtection);
    assert_eq!(state(m).await.last_killed.as_deref(), Some("p4"));
    assert!(!h.messenger.group_contains("Seer, open your eyes"));

    act(m, "p5", PlayerAction::Pass).await;
    let room = state(m).await;
    assert_eq!(room.phase, GamePhase::LastWords);
    assert!(room.players["p4"].is_dead);
    assert_eq!(room.last_killed.as_deref(), Some("p4"));
}

enum Step {
    Act(&'static str, PlayerAction),
    Timeout,
}

/// Runs one input and follows `Enter` transitions the way the manager does.
async fn replay(room: &mut Room, ctx: &GameContext, step: &Step) -> Vec<Result<Transition, GameError>> {
    let first = match step {
        Step::Act(actor, action) => phases::handle_action(room, ctx, actor, action.clone()).await,
        Step::Timeout => Ok(phases::timeout(room, ctx).await),
    };
    let mut seen = Vec::new();
    let mut next = first;
    loop {
        let entering = match &next {
            Ok(Transition::Enter(phase)) => Some(*phase),
            _ => None,
        };
        seen.push(next);
        match entering {
            Some(phase) => next = Ok(phases::enter(room, ctx, phase).await),
            None => return seen,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn restored_room_replays_the_same_transitions() {
    let h = day_vote_after_seat_four_dies().await;
    let mut original = state(&h.manager).await;
    let json = serde_json::to_string(&original).unwrap();
    let mut restored: Room = serde_json::from_str(&json).unwrap();

    let mut steps: Vec<Step> = ["p1", "p2", "p3", "p5", "p6", "p8", "p9"]
        .iter()
        .map(|voter| Step::Act(*voter, vote("p7")))
        .collect();
    steps.push(Step::Act("p7", vote("p1")));
    steps.push(Step::Act("p7", PlayerAction::FinishLastWords));
    steps.push(Step::Act("p6", kill("p8")));
    for wolf in ["p1", "p2", "p3"] {
        steps.push(Step::Act(wolf, kill("p8")));
    }
    steps.push(Step::Timeout);
    steps.push(Step::Act("p5", PlayerAction::Save));
    steps.push(Step::Timeout);

    let left = GameContext::new(Collaborators::silent(), Some(11));
    let right = GameContext::new(Collaborators::silent(), Some(11));
    for step in &steps {
        let expected = replay(&mut original, &left, step).await;
        let actual = replay(&mut restored, &right, step).await;
        assert_eq!(actual, expected);
    }
    assert_eq!(restored, original);
    assert_eq!(restored.phase, GamePhase::DaySpeaking);
    assert!(restored.players["p7"].is_dead);
    assert!(!restored.players["p8"].is_dead);
}
