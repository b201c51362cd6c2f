// FILE: crates/cli/src/session.rs
//! Simulated listening sessions driven through the progress engine

use anyhow::{Context, Result};
use clap::ArgMatches;
use earmark_config::{Config, PlayerConfig};
use earmark_core::{ItemId, PlaybackRate, ProgressStore, StaticIdentity, UserId, Volume};
use earmark_sync_engine::{
    Diagnostic, EngineConfig, EngineState, ProgressEngine, SimulatedTransport, WriterStatus,
};
use std::sync::Arc;
use std::time::Duration;

/// Wall time between simulated position ticks
const TICK_SECONDS: f64 = 1.0;

/// Parameters of one `listen` run
#[derive(Debug, Clone)]
pub struct ListenArgs {
    pub user: Option<UserId>,
    pub item: ItemId,
    pub duration: f64,
    pub seconds: f64,
    pub rate: Option<PlaybackRate>,
    /// Seconds to skip after resuming, negative to rewind
    pub skip: f64,
    pub realtime: bool,
}

impl ListenArgs {
    pub fn from_matches(matches: &ArgMatches, config: &Config) -> Result<Self> {
        let duration = *matches
            .get_one::<f64>("duration")
            .context("Duration is required")?;
        let seconds = *matches
            .get_one::<f64>("seconds")
            .context("Listening time is required")?;
        if !(duration.is_finite() && duration > 0.0) {
            anyhow::bail!("Duration must be a positive number of seconds");
        }
        if !(seconds.is_finite() && seconds >= 0.0) {
            anyhow::bail!("Listening time must not be negative");
        }

        let rate = matches
            .get_one::<f64>("rate")
            .map(|rate| offered_rate(*rate, &config.player))
            .transpose()?;
        let steps = matches.get_one::<i64>("skip").copied().unwrap_or(0);

        Ok(Self {
            user: crate::commands::resolve_user(matches, config)?,
            item: crate::commands::parse_item(matches)?,
            duration,
            seconds,
            rate,
            skip: steps as f64 * config.player.skip_seconds as f64,
            realtime: matches.get_flag("realtime"),
        })
    }
}

/// Accepts only the rates the player's speed control offers
pub fn offered_rate(rate: f64, player: &PlayerConfig) -> Result<PlaybackRate> {
    if !player.rate_options.contains(&rate) {
        let offered: Vec<String> = player.rate_options.iter().map(f64::to_string).collect();
        anyhow::bail!(
            "Playback rate {} is not offered (player.rate_options: {})",
            rate,
            offered.join(", ")
        );
    }
    PlaybackRate::new(rate)
        .map_err(anyhow::Error::msg)
        .context("Invalid playback rate")
}

/// Outcome of a listening session
#[derive(Debug)]
pub struct ListenReport {
    pub resumed_at: f64,
    pub position: f64,
    pub percent: f64,
    pub state: EngineState,
    pub diagnostics: Vec<Diagnostic>,
    /// `None` when the session had no user and nothing was saved
    pub writer: Option<WriterStatus>,
}

/// Translates the player settings into engine tuning
pub fn engine_config(player: &PlayerConfig) -> Result<EngineConfig> {
    let rate = PlaybackRate::new(player.default_rate)
        .map_err(anyhow::Error::msg)
        .context("Invalid player.default_rate")?;
    let volume = Volume::new(player.default_volume)
        .map_err(anyhow::Error::msg)
        .context("Invalid player.default_volume")?;

    Ok(EngineConfig::default()
        .with_debounce_window(Duration::from_millis(player.persist_debounce_ms))
        .with_commit_threshold(Duration::from_millis(player.commit_threshold_ms))
        .with_reconcile_timeout(Duration::from_millis(player.reconcile_timeout_ms))
        .with_default_rate(rate)
        .with_default_volume(volume))
}

/// Plays `args.seconds` of the simulated item, pauses and tears the session down
///
/// `on_percent` is called each time the whole-number progress percentage changes.
pub async fn run_session(
    store: Arc<dyn ProgressStore>,
    config: EngineConfig,
    args: &ListenArgs,
    mut on_percent: impl FnMut(u32) + Send + 'static,
) -> Result<ListenReport> {
    let identity = match args.user {
        Some(user) => StaticIdentity::signed_in(user),
        None => StaticIdentity::anonymous(),
    };

    let mut last_percent = None;
    let mut engine = ProgressEngine::for_identity(
        config,
        &identity,
        args.item,
        format!("simulated://{}", args.item),
        store,
        SimulatedTransport::new(args.duration),
    )
    .with_progress_callback(move |percent| {
        let whole = percent.floor() as u32;
        if last_percent != Some(whole) {
            last_percent = Some(whole);
            on_percent(whole);
        }
    });

    engine.start().await.context("Failed to start session")?;
    let metadata = engine.transport_mut().finish_loading();
    engine.handle_event(metadata)?;
    let resumed_at = engine.position();

    if let Some(rate) = args.rate {
        engine.set_rate(rate)?;
    }
    if args.skip != 0.0 {
        engine.skip(args.skip)?;
    }

    engine.play()?;
    let mut remaining = args.seconds;
    while remaining > 0.0 && engine.state() == EngineState::Playing {
        let step = remaining.min(TICK_SECONDS);
        if args.realtime {
            tokio::time::sleep(Duration::from_secs_f64(step)).await;
        }
        for event in engine.transport_mut().advance(step) {
            engine.handle_event(event)?;
        }
        remaining -= step;
    }

    if engine.state() == EngineState::Playing {
        engine.pause()?;
    }

    let position = engine.position();
    let percent = engine.progress_percent();
    let state = engine.state();
    let mut diagnostics = engine.diagnostics();
    let writer = engine.teardown().await;
    if let Some(failure) = writer.as_ref().and_then(|status| status.last_failure.clone()) {
        if !diagnostics.contains(&failure) {
            diagnostics.push(failure);
        }
    }

    Ok(ListenReport {
        resumed_at,
        position,
        percent,
        state,
        diagnostics,
        writer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use earmark_sync_engine::MemoryProgressStore;
    use std::sync::Mutex;

    fn args(user: Option<UserId>, item: ItemId, seconds: f64) -> ListenArgs {
        ListenArgs {
            user,
            item,
            duration: 100.0,
            seconds,
            rate: None,
            skip: 0.0,
            realtime: false,
        }
    }

    fn listen_matches(extra: &[&str]) -> clap::ArgMatches {
        let mut argv = vec![
            "earmark",
            "listen",
            "--item",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "--duration",
            "600",
            "--seconds",
            "30",
        ];
        argv.extend_from_slice(extra);
        let matches = crate::build_cli().try_get_matches_from(argv).unwrap();
        matches.subcommand_matches("listen").unwrap().clone()
    }

    #[test]
    fn test_rate_must_be_offered() {
        let player = PlayerConfig::default();
        assert_eq!(offered_rate(1.5, &player).unwrap().value(), 1.5);

        let err = offered_rate(1.1, &player).unwrap_err();
        assert!(err.to_string().contains("player.rate_options"));

        let custom = PlayerConfig {
            rate_options: vec![1.0, 1.1],
            ..Default::default()
        };
        assert!(offered_rate(1.1, &custom).is_ok());
    }

    #[test]
    fn test_listen_args_use_player_settings() {
        let mut config = Config::default();
        config.player.skip_seconds = 15;

        let args =
            ListenArgs::from_matches(&listen_matches(&["--rate", "1.25", "--skip", "-2"]), &config)
                .unwrap();
        assert_eq!(args.rate.map(|r| r.value()), Some(1.25));
        assert_eq!(args.skip, -30.0);

        let args = ListenArgs::from_matches(&listen_matches(&[]), &config).unwrap();
        assert_eq!(args.skip, 0.0);
        assert!(args.rate.is_none());

        let result = ListenArgs::from_matches(&listen_matches(&["--rate", "3"]), &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_engine_config_from_player_settings() {
        let player = PlayerConfig {
            persist_debounce_ms: 1500,
            commit_threshold_ms: 0,
            default_volume: 0.5,
            ..Default::default()
        };

        let config = engine_config(&player).unwrap();
        assert_eq!(config.debounce_window, Duration::from_millis(1500));
        assert_eq!(config.commit_threshold, Duration::ZERO);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(5));
        assert_eq!(config.default_volume.value(), 0.5);
    }

    #[test]
    fn test_engine_config_rejects_bad_rate() {
        let player = PlayerConfig {
            default_rate: 0.0,
            ..Default::default()
        };
        assert!(engine_config(&player).is_err());
    }

    #[tokio::test]
    async fn test_session_saves_and_resumes() {
        let store = Arc::new(MemoryProgressStore::new());
        let (user, item) = (UserId::new(), ItemId::new());

        let percents = Arc::new(Mutex::new(Vec::new()));
        let seen = percents.clone();
        let report = run_session(
            store.clone(),
            EngineConfig::default(),
            &args(Some(user), item, 25.0),
            move |p| seen.lock().unwrap().push(p),
        )
        .await
        .unwrap();

        assert_eq!(report.resumed_at, 0.0);
        assert_eq!(report.position, 25.0);
        assert_eq!(report.state, EngineState::Paused);
        assert!(report.diagnostics.is_empty());
        assert_eq!(percents.lock().unwrap().last(), Some(&25));

        let second = run_session(
            store.clone(),
            EngineConfig::default(),
            &args(Some(user), item, 10.0),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(second.resumed_at, 25.0);
        assert_eq!(second.position, 35.0);

        let record = store.get(user, item).unwrap().unwrap();
        assert_eq!(record.position_seconds, 35.0);
        assert_eq!(record.total_listen_time_seconds, 35.0);
    }

    #[tokio::test]
    async fn test_rewind_on_resume_replays_without_accruing() {
        let store = Arc::new(MemoryProgressStore::new());
        let (user, item) = (UserId::new(), ItemId::new());

        run_session(store.clone(), EngineConfig::default(), &args(Some(user), item, 25.0), |_| {})
            .await
            .unwrap();

        let mut replay = args(Some(user), item, 10.0);
        replay.skip = -10.0;
        let report = run_session(store.clone(), EngineConfig::default(), &replay, |_| {})
            .await
            .unwrap();

        assert_eq!(report.resumed_at, 25.0);
        assert_eq!(report.position, 25.0);
        let record = store.get(user, item).unwrap().unwrap();
        assert_eq!(record.position_seconds, 25.0);
        assert_eq!(record.total_listen_time_seconds, 25.0);
    }

    #[tokio::test]
    async fn test_session_runs_to_the_end() {
        let store = Arc::new(MemoryProgressStore::new());
        let (user, item) = (UserId::new(), ItemId::new());
        let mut listen = args(Some(user), item, 500.0);
        listen.rate = Some(PlaybackRate::new(2.0).unwrap());

        let report = run_session(store.clone(), EngineConfig::default(), &listen, |_| {})
            .await
            .unwrap();

        assert_eq!(report.state, EngineState::Ended);
        assert_eq!(report.percent, 100.0);
        let record = store.get(user, item).unwrap().unwrap();
        assert_eq!(record.position_seconds, 100.0);
        assert_eq!(record.playback_rate.value(), 2.0);
        assert!(!record.is_completed);
    }

    #[tokio::test]
    async fn test_anonymous_session_saves_nothing() {
        let store = Arc::new(MemoryProgressStore::new());
        let item = ItemId::new();

        let report = run_session(store.clone(), EngineConfig::default(), &args(None, item, 5.0), |_| {})
            .await
            .unwrap();

        assert_eq!(report.position, 5.0);
        assert!(report.writer.is_none());
        assert_eq!(store.upsert_count(), 0);
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_fatal() {
        let store = Arc::new(MemoryProgressStore::new());
        store.set_fail_upserts(true);
        let (user, item) = (UserId::new(), ItemId::new());

        let report = run_session(store.clone(), EngineConfig::default(), &args(Some(user), item, 5.0), |_| {})
            .await
            .unwrap();

        assert_eq!(report.position, 5.0);
        assert!(!report.diagnostics.is_empty());
        assert!(store.get(user, item).unwrap().is_none());
    }
}
