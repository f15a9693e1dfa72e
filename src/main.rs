//! Pose Dodge headless runner
//!
//! Drives the engine at 60 Hz with a simulated player that dodges hazards
//! until a given round, then stands still until the run ends. Useful for
//! smoke-testing settings: `RUST_LOG=info pose-dodge [settings.json] [rounds]`.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pose_dodge::consts::FRAME_MS;
    use pose_dodge::error::CollaboratorFailure;
    use pose_dodge::pose::{PoseMailbox, PoseReport, PoseSource, hips_at};
    use pose_dodge::sim::{Cell, GameEvent, GamePhase};
    use pose_dodge::{Engine, EngineError, FrameSnapshot, Settings};

    /// Upper bound on simulated time
    const MAX_RUN_MS: f64 = 15.0 * 60.0 * 1000.0;

    /// Simulated player steering from the last published frame
    struct Autopilot {
        view: Rc<RefCell<Option<FrameSnapshot>>>,
        mailbox: Option<PoseMailbox>,
        dodge_until_round: u32,
        target: Cell,
    }

    impl Autopilot {
        fn choose(&mut self) -> Cell {
            let view = self.view.borrow();
            let Some(frame) = view.as_ref() else {
                return self.target;
            };
            if frame.phase != GamePhase::Running || frame.round > self.dodge_until_round {
                return self.target;
            }
            let threatened = |cell: Cell| frame.hazards.iter().any(|h| h.cell == cell);
            if threatened(self.target) {
                // Nearest free cell by grid distance
                let current = self.target;
                if let Some(free) = Cell::ALL
                    .iter()
                    .copied()
                    .filter(|c| !threatened(*c))
                    .min_by_key(|c| c.row.abs_diff(current.row) + c.col.abs_diff(current.col))
                {
                    self.target = free;
                }
            }
            self.target
        }
    }

    impl PoseSource for Autopilot {
        fn prime(&mut self, mailbox: PoseMailbox) -> Result<(), CollaboratorFailure> {
            self.mailbox = Some(mailbox);
            Ok(())
        }

        fn request(&mut self, _timestamp_ms: f64) -> Result<(), CollaboratorFailure> {
            let cell = self.choose();
            if let Some(mailbox) = &self.mailbox {
                mailbox.post(PoseReport::Body(hips_at(cell.center())));
            }
            Ok(())
        }

        fn release(&mut self) {
            self.mailbox = None;
        }
    }

    pub fn run() -> Result<(), EngineError> {
        let mut args = std::env::args().skip(1);
        let settings = match args.next() {
            Some(path) => Settings::from_path(path)?,
            None => Settings::default(),
        };
        let dodge_until_round = args.next().and_then(|n| n.parse().ok()).unwrap_or(5);

        let view = Rc::new(RefCell::new(None));
        let pilot = Autopilot {
            view: view.clone(),
            mailbox: None,
            dodge_until_round,
            target: Cell::new(1, 1),
        };
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut engine = Engine::new(settings, seed, Box::new(pilot))?;
        engine.subscribe(Box::new(move |frame: &FrameSnapshot| {
            for event in &frame.events {
                log::info!("[{}] {:?}", frame.clock, event);
            }
            *view.borrow_mut() = Some(frame.clone());
        }));
        engine.start()?;

        let mut now = 0.0;
        while now < MAX_RUN_MS {
            engine.tick(now)?;
            let over = engine
                .snapshot()
                .is_some_and(|f| f.events.iter().any(|e| matches!(e, GameEvent::GameOver { .. })));
            if over {
                break;
            }
            now += FRAME_MS;
        }

        if let Some(frame) = engine.snapshot() {
            log::info!(
                "Finished: phase {:?}, round {}, lives {}, time {}",
                frame.phase,
                frame.round,
                frame.lives,
                frame.clock
            );
        }
        if let Some(best) = engine.high_scores().top_score() {
            log::info!("Best run: round {} in {:.1}s", best.round, best.elapsed_ms / 1000.0);
        }
        engine.dispose();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pose Dodge (native) starting...");

    if let Err(err) = native::run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::init, this is just to satisfy the compiler
}
