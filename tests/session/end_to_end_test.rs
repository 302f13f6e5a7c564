//! Runner, controller and supervisor wired to a scripted engine process.

use std::time::Duration;

use gomoku_bridge::engine::{EngineSender, EngineSupervisor};
use gomoku_bridge::protocol::{Color, Mode, Position};
use gomoku_bridge::session::{
    session_queue, Intent, MoveRejection, Outcome, SessionController, SessionHandle,
    SessionRules, SessionRunner, Update,
};
use gomoku_bridge::stats::StatsStore;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Plays black instantly, then concedes to white after the first human move.
const CONCEDING_ENGINE: &str = r#"
while IFS= read -r line; do
  case "$line" in
    "SET_MODE PVE") echo AI_THINKING; echo "MOVED 7,7,1" ;;
    "MOVE "*) echo "MOVED ${line#MOVE },2"; echo AI_THINKING; echo "WINNER WHITE" ;;
  esac
done
"#;

/// Answers a human move slowly, so a restart can overtake the reply.
const SLOW_ENGINE: &str = r#"
while IFS= read -r line; do
  case "$line" in
    "SET_MODE PVE") echo "MOVED 7,7,1" ;;
    "MOVE "*) echo "MOVED ${line#MOVE },2"; sleep 0.3; echo "MOVED 1,1,1" ;;
  esac
done
"#;

/// Opens the game and then dies.
const CRASHING_ENGINE: &str = r#"
read -r line
echo "MOVED 7,7,1"
exit 1
"#;

struct Harness {
    supervisor: EngineSupervisor,
    handle: SessionHandle,
    updates: mpsc::UnboundedReceiver<Update>,
    task: JoinHandle<SessionController<EngineSender>>,
    dir: TempDir,
}

impl Harness {
    fn start(script: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = session_queue();
        let supervisor = EngineSupervisor::start_with_args("/bin/sh", ["-c", script], tx.clone())
            .expect("Failed to start scripted engine")
            .with_grace_period(Duration::from_millis(500));

        let store = StatsStore::open(dir.path().join("stats.json"));
        let controller =
            SessionController::new(supervisor.sender(), store, SessionRules::default());

        let (updates_tx, updates) = mpsc::unbounded_channel();
        let runner = SessionRunner::new(controller, tx, rx, updates_tx);
        let handle = runner.handle();
        let task = tokio::spawn(runner.run());

        Self {
            supervisor,
            handle,
            updates,
            task,
            dir,
        }
    }

    async fn wait_for(&mut self, wanted: impl Fn(&Update) -> bool) -> Update {
        loop {
            let update = tokio::time::timeout(Duration::from_secs(5), self.updates.recv())
                .await
                .expect("Timed out waiting for update")
                .expect("Update channel closed");
            if wanted(&update) {
                return update;
            }
        }
    }

    async fn finish(self) -> (SessionController<EngineSender>, TempDir) {
        self.handle.shutdown();
        let controller = self.task.await.expect("Runner panicked");
        tokio_test::assert_ok!(self.supervisor.stop().await);
        (controller, self.dir)
    }
}

fn is_stone(update: &Update) -> bool {
    matches!(update, Update::StonePlaced { .. })
}

#[tokio::test]
async fn pve_game_against_scripted_engine() {
    let mut harness = Harness::start(CONCEDING_ENGINE);

    harness.handle.post(Intent::Reset(Mode::Pve));
    let opening = harness.wait_for(is_stone).await;
    assert_eq!(
        opening,
        Update::StonePlaced {
            position: Position::new(7, 7).unwrap(),
            color: Color::Black
        }
    );

    harness.handle.post(Intent::Move { x: 3, y: 4 });
    let reply = harness.wait_for(is_stone).await;
    assert_eq!(
        reply,
        Update::StonePlaced {
            position: Position::new(3, 4).unwrap(),
            color: Color::White
        }
    );

    harness
        .wait_for(|u| {
            *u == Update::GameEnded {
                outcome: Outcome::Winner(Color::White),
            }
        })
        .await;
    let stats = harness
        .wait_for(|u| matches!(u, Update::StatsChanged(_)))
        .await;
    let Update::StatsChanged(record) = stats else {
        unreachable!()
    };
    assert_eq!(record.pve.win, 1);

    let (controller, dir) = harness.finish().await;
    assert_eq!(controller.session().board().stone_count(), 2);
    let saved = StatsStore::load(&dir.path().join("stats.json")).unwrap();
    assert_eq!(saved.pve.win, 1);
    assert_eq!(saved.pve.lose, 0);
}

#[tokio::test]
async fn restart_overtakes_a_slow_reply() {
    let mut harness = Harness::start(SLOW_ENGINE);

    harness.handle.post(Intent::Reset(Mode::Pve));
    harness.wait_for(is_stone).await;
    harness.handle.post(Intent::Move { x: 0, y: 0 });
    harness.wait_for(is_stone).await;

    // The engine is still sleeping on its reply to the old game.
    harness.handle.post(Intent::Reset(Mode::Pve));
    harness
        .wait_for(|u| matches!(u, Update::SessionStarted { generation: 2, .. }))
        .await;

    let opening = harness.wait_for(is_stone).await;
    assert_eq!(
        opening,
        Update::StonePlaced {
            position: Position::new(7, 7).unwrap(),
            color: Color::Black
        }
    );

    let (controller, _dir) = harness.finish().await;
    let board = controller.session().board();
    assert_eq!(board.stone_count(), 1);
    assert!(board.is_empty_at(Position::new(1, 1).unwrap()));
    assert_eq!(controller.counters().stale_events, 1);
}

#[tokio::test]
async fn crashed_engine_disconnects_the_session() {
    let mut harness = Harness::start(CRASHING_ENGINE);

    harness.handle.post(Intent::Reset(Mode::Pve));
    harness.wait_for(is_stone).await;
    harness
        .wait_for(|u| *u == Update::EngineDisconnected)
        .await;

    harness.handle.post(Intent::Move { x: 0, y: 0 });
    let rejected = harness
        .wait_for(|u| matches!(u, Update::MoveRejected { .. }))
        .await;
    assert_eq!(
        rejected,
        Update::MoveRejected {
            x: 0,
            y: 0,
            reason: MoveRejection::Disconnected
        }
    );

    let (controller, _dir) = harness.finish().await;
    assert!(!controller.is_connected());
    assert_eq!(controller.stats().pve.completed(), 0);
}
