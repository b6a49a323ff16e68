mod common;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use bot_ops_console::api::Backend;
use bot_ops_console::config::Config;
use bot_ops_console::models::{Percent, RsiThresholds, Severity};
use bot_ops_console::pages::{AuditPage, BotControlPage, ConfigPage, PositionsPage};
use bot_ops_console::session::TokenStore;
use bot_ops_console::shell::{LineOutcome, Route, Shell};
use bot_ops_console::state::{AuthPhase, AuthStore, DashboardStore};

use common::{
    sample_audit_event, sample_bot_config, sample_control_bot, sample_position, MockBackend,
    MOCK_TOKEN,
};

fn temp_token_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ops_console_it_{}_{}", tag, std::process::id()))
}

fn mock() -> (Arc<MockBackend>, Arc<dyn Backend>) {
    let mock = Arc::new(MockBackend::new());
    let backend: Arc<dyn Backend> = mock.clone();
    (mock, backend)
}

#[tokio::test]
async fn login_persists_token_and_restores_optimistically() {
    let (_, backend) = mock();
    let path = temp_token_path("login");
    let tokens = Arc::new(TokenStore::load(&path));

    let auth = AuthStore::new(backend.clone(), tokens.clone());
    assert_eq!(auth.phase().await, AuthPhase::Anonymous);

    auth.login("operator", "hunter2").await.unwrap();
    assert_eq!(auth.phase().await, AuthPhase::Authenticated);
    assert_eq!(tokens.get().as_deref(), Some(MOCK_TOKEN));
    assert_eq!(auth.user().await.unwrap().username, "operator");

    // A fresh store over the same token file starts authenticated without a
    // round-trip.
    let restored_tokens = Arc::new(TokenStore::load(&path));
    let restored = AuthStore::new(backend, restored_tokens.clone());
    assert_eq!(restored.phase().await, AuthPhase::Authenticated);

    restored_tokens.clear();
}

#[tokio::test]
async fn login_failure_surfaces_backend_detail() {
    let (mock, backend) = mock();
    mock.with(|s| s.reject_login = true);
    let tokens = Arc::new(TokenStore::load(temp_token_path("badlogin")));

    let auth = AuthStore::new(backend, tokens.clone());
    assert!(auth.login("operator", "wrong").await.is_err());
    assert_eq!(
        auth.phase().await,
        AuthPhase::Error("Invalid credentials".to_string())
    );
    assert!(tokens.get().is_none());
}

#[tokio::test]
async fn rejected_session_check_drops_to_anonymous() {
    let (mock, backend) = mock();
    let path = temp_token_path("stale");
    let tokens = Arc::new(TokenStore::load(&path));
    tokens.set("stale-token");

    mock.with(|s| s.reject_me = true);
    let auth = AuthStore::new(backend, tokens.clone());
    assert_eq!(auth.phase().await, AuthPhase::Authenticated);

    auth.check_session().await;
    assert_eq!(auth.phase().await, AuthPhase::Anonymous);
    assert!(tokens.get().is_none());
}

#[tokio::test]
async fn failed_refresh_keeps_stale_data() {
    let (mock, backend) = mock();
    mock.with(|s| s.summary.total_balance = 1234.5);

    let store = DashboardStore::new(backend);
    store.fetch_summary().await;
    let data = store.snapshot().await;
    assert_eq!(data.summary.total_balance, 1234.5);
    assert!(data.last_error.is_none());

    mock.with(|s| s.fail_summary = true);
    store.fetch_summary().await;
    let data = store.snapshot().await;
    assert_eq!(data.summary.total_balance, 1234.5);
    assert_eq!(data.last_error.as_deref(), Some("summary unavailable"));
}

#[tokio::test]
async fn closing_a_position_removes_it_on_refetch() {
    let (mock, backend) = mock();
    mock.with(|s| {
        s.positions = vec![
            sample_position(1, "BTC/USDT"),
            sample_position(2, "ETH/USDT"),
            sample_position(3, "SOL/USDT"),
        ]
    });

    let cfg = Config::default();
    let store = Arc::new(DashboardStore::new(backend.clone()));
    let page = PositionsPage::new(&cfg, backend, store.clone());
    page.mount().await;
    assert_eq!(store.snapshot().await.positions.items.len(), 3);

    page.close_position(2, Some("manual_close_ui")).await;

    let data = store.snapshot().await;
    let ids: Vec<u64> = data.positions.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, [1, 3]);
    assert_eq!(
        mock.with(|s| s.closed.clone()),
        [(2, Some("manual_close_ui".to_string()))]
    );
}

#[tokio::test]
async fn save_reports_how_many_items_need_restart() {
    let (mock, backend) = mock();
    mock.with(|s| {
        s.bot_configs
            .insert("bot_estavel".to_string(), sample_bot_config("bot_estavel"));
        s.restart_flagged.insert("bot_estavel".to_string());
        s.global_restart = true;
    });

    let cfg = Config::default();
    let page = ConfigPage::new(&cfg, backend);
    page.mount().await;

    page.set_global(5.0, 1.0, 3.0).await;
    page.select_bot("bot_estavel").await;
    page.set_take_profit(2.0).await;
    page.save().await;

    let rendered = page.render().await;
    assert!(
        rendered.contains("2 item(s) scheduled for restart"),
        "unexpected render:\n{rendered}"
    );
    assert_eq!(
        mock.with(|s| s.bot_configs["bot_estavel"].take_profit.0),
        2.0
    );
}

#[tokio::test]
async fn config_toggle_rolls_back_on_failure() {
    let (mock, backend) = mock();
    mock.with(|s| {
        s.bot_configs
            .insert("bot_estavel".to_string(), sample_bot_config("bot_estavel"));
        s.reject_toggle = true;
    });

    let cfg = Config::default();
    let page = ConfigPage::new(&cfg, backend);
    page.mount().await;

    page.toggle_enabled("bot_estavel").await;
    let rendered = page.render().await;
    assert!(rendered.contains("toggle rejected"), "{rendered}");
    // The optimistic flip was undone.
    assert!(rendered.contains("bot_estavel"));
    assert!(rendered.contains("[on ]"), "{rendered}");
    assert!(mock.with(|s| s.bot_configs["bot_estavel"].enabled));
}

#[tokio::test]
async fn control_toggle_rolls_back_on_failure() {
    let (mock, backend) = mock();
    mock.with(|s| {
        s.control.bots = vec![sample_control_bot("scalper", true)];
        s.reject_toggle = true;
    });

    let cfg = Config::default();
    let page = BotControlPage::new(&cfg, backend);
    page.mount().await;

    page.toggle_bot("scalper").await;
    let overview = page.overview().await;
    assert!(overview.bots[0].enabled);
}

#[tokio::test]
async fn exclusive_bot_gates_specialized_toggles() {
    let (mock, backend) = mock();
    mock.with(|s| {
        s.control.bots = vec![sample_control_bot("scalper", false)];
        s.control.unico_bot = Some(bot_ops_console::models::UnicoBotStatus {
            enabled: true,
            name: "UnicoBot".to_string(),
            portfolio_size: 8,
            strategy: "rotational".to_string(),
        });
    });

    let cfg = Config::default();
    let page = BotControlPage::new(&cfg, backend);
    page.mount().await;

    page.toggle_bot("scalper").await;
    // The call never reached the backend.
    assert!(mock.with(|s| s.actions.iter().all(|a| !a.starts_with("toggle:"))));
    assert!(!page.overview().await.bots[0].enabled);
}

#[tokio::test]
async fn audit_filter_narrows_results() {
    let (mock, backend) = mock();
    mock.with(|s| {
        s.audit_events = vec![
            sample_audit_event("bot_restart", "ui", Severity::Info),
            sample_audit_event("emergency_stop", "ui", Severity::Critical),
            sample_audit_event("config_change", "scheduler", Severity::Warning),
        ]
    });

    let cfg = Config::default();
    let page = AuditPage::new(&cfg, backend);
    page.mount().await;

    page.set_filter(None, None, Some(Severity::Critical)).await;
    let rendered = page.render().await;
    assert!(rendered.contains("emergency_stop"), "{rendered}");
    assert!(!rendered.contains("bot_restart"), "{rendered}");

    page.export().await;
    assert!(mock.with(|s| s.actions.contains(&"export:*".to_string())));
}

#[tokio::test]
async fn route_guard_redirects_anonymous_to_login() {
    let (_, backend) = mock();
    let tokens = Arc::new(TokenStore::load(temp_token_path("guard")));
    tokens.clear();
    let auth = Arc::new(AuthStore::new(backend.clone(), tokens));
    let (_tx, rx) = watch::channel(0u64);

    let cfg = Config::default().shared();
    let mut shell = Shell::new(cfg, backend, auth.clone(), rx);

    assert_eq!(shell.try_navigate(Route::Positions).await, Route::Login);
    assert_eq!(shell.route(), Route::Login);

    auth.login("operator", "hunter2").await.unwrap();
    assert_eq!(shell.try_navigate(Route::Positions).await, Route::Positions);
}

#[tokio::test]
async fn health_probe_failure_reads_offline() {
    let (mock, backend) = mock();
    mock.with(|s| s.health_ok = false);
    let tokens = Arc::new(TokenStore::load(temp_token_path("health")));
    tokens.set("t");
    let auth = Arc::new(AuthStore::new(backend.clone(), tokens.clone()));
    let (_tx, rx) = watch::channel(0u64);

    let cfg = Config::default().shared();
    let mut shell = Shell::new(cfg, backend, auth, rx);
    shell.try_navigate(Route::Dashboard).await;

    // The monitor has not probed yet (first tick is one period out), so the
    // default state already reads offline.
    match shell.handle_line("health").await {
        bot_ops_console::shell::LineOutcome::Output(out) => {
            assert!(out.contains("OFFLINE"), "{out}")
        }
        _ => panic!("health should not quit"),
    }
    tokens.clear();
}

#[tokio::test]
async fn unauthorized_signal_drops_session_and_redirects() {
    let (_, backend) = mock();
    let tokens = Arc::new(TokenStore::load(temp_token_path("force401")));
    tokens.clear();
    let auth = Arc::new(AuthStore::new(backend.clone(), tokens));
    let (_tx, rx) = watch::channel(0u64);

    let cfg = Config::default().shared();
    let mut shell = Shell::new(cfg, backend, auth.clone(), rx);

    auth.login("operator", "hunter2").await.unwrap();
    assert_eq!(shell.try_navigate(Route::Positions).await, Route::Positions);

    let msg = shell.on_unauthorized().await;
    assert!(msg.contains("log in again"), "{msg}");
    assert_eq!(shell.route(), Route::Login);
    assert_eq!(auth.phase().await, AuthPhase::Anonymous);
}

#[tokio::test]
async fn rsi_schedule_rows_are_editable_from_the_shell() {
    let (mock, backend) = mock();
    mock.with(|s| {
        s.bot_configs
            .insert("bot_estavel".to_string(), sample_bot_config("bot_estavel"));
    });
    let tokens = Arc::new(TokenStore::load(temp_token_path("rsiset")));
    tokens.set("t");
    let auth = Arc::new(AuthStore::new(backend.clone(), tokens.clone()));
    let (_tx, rx) = watch::channel(0u64);

    let mut shell = Shell::new(Config::default().shared(), backend, auth, rx);
    assert_eq!(shell.try_navigate(Route::Config).await, Route::Config);

    let out = match shell.handle_line("rsi-set 60min 30 70").await {
        LineOutcome::Output(out) => out,
        LineOutcome::Quit => panic!("editing a schedule row must not quit"),
    };
    assert!(out.contains("rsi@60min: buy<30 sell>70"), "{out}");

    match shell.handle_line("save").await {
        LineOutcome::Output(out) => assert!(out.contains("Configuration saved"), "{out}"),
        LineOutcome::Quit => panic!("save must not quit"),
    }
    assert_eq!(
        mock.with(|s| s.bot_configs["bot_estavel"].dynamic_rsi.get("60min").copied()),
        Some(RsiThresholds {
            buy: Percent(30.0),
            sell: Percent(70.0)
        })
    );
    tokens.clear();
}
