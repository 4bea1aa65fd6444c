use chrono::{Duration as ChronoDuration, Local};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const GOALS: &str = r#"[
  { "title": "Always on", "startDate": "2024-01-07", "endDate": "2035-12-31", "defaultScore": 3 },
  { "title": "Done", "startDate": "2020-01-05", "endDate": "2020-02-29", "scores": { "2020-01-06": 8 } }
]"#;

#[derive(Debug, Deserialize)]
struct Tile {
    date: String,
    score: Option<u8>,
    state: String,
    clickable: bool,
}

#[derive(Debug, Deserialize)]
struct Week {
    days: Vec<Tile>,
    average_label: String,
}

#[derive(Debug, Deserialize)]
struct Stats {
    passed_days: u32,
    days_left: u32,
    countdown: String,
}

#[derive(Debug, Deserialize)]
struct CalendarView {
    id: usize,
    title: String,
    default_score: u8,
    display_start: String,
    weeks: Vec<Week>,
    stats: Stats,
}

#[derive(Debug, Deserialize)]
struct TileUpdate {
    tile: Tile,
    week_index: usize,
    week_average_label: String,
}

struct TestServer {
    base_url: String,
    data_path: PathBuf,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_path(kind: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("goal_calendar_http_{kind}_{}_{}.json", std::process::id(), nanos));
    path
}

fn today_key() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if client.get(format!("{base_url}/")).send().await.is_ok() {
            return;
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(goals: &str) -> TestServer {
    let port = pick_free_port();
    let goals_path = unique_path("goals");
    std::fs::write(&goals_path, goals).expect("write goal document");
    let data_path = unique_path("scores");

    let child = Command::new(env!("CARGO_BIN_EXE_goal_calendar"))
        .env("PORT", port.to_string())
        .env("GOALS_PATH", &goals_path)
        .env("APP_DATA_PATH", &data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_path,
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(GOALS).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn fetch_goal(client: &Client, server: &TestServer, id: usize) -> CalendarView {
    client
        .get(format!("{}/api/goals/{id}", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn find_tile<'a>(view: &'a CalendarView, date: &str) -> &'a Tile {
    view.weeks
        .iter()
        .flat_map(|week| week.days.iter())
        .find(|tile| tile.date == date)
        .expect("tile in calendar")
}

#[tokio::test]
async fn http_lists_whole_week_calendars() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let goals: Vec<CalendarView> = client
        .get(format!("{}/api/goals", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(goals.len(), 2);
    assert_eq!(goals[0].id, 0);
    assert_eq!(goals[0].title, "Always on");
    assert_eq!(goals[0].default_score, 3);
    assert_eq!(goals[0].display_start, "2024-01-07");
    for goal in &goals {
        assert!(goal.weeks.iter().all(|week| week.days.len() == 7));
    }

    let done = &goals[1];
    assert_eq!(done.stats.days_left, 0);
    assert_eq!(done.stats.countdown, "0d 0h 0m");
    assert_eq!(done.stats.passed_days, 56);
    assert_eq!(find_tile(done, "2020-01-06").score, Some(8));
    assert_eq!(find_tile(done, "2020-01-07").state, "default");
    assert_eq!(find_tile(done, "2020-01-07").score, Some(2));
    // (8 + 2 * 6) / 7
    assert_eq!(done.weeks[0].average_label, "2.9");
}

#[tokio::test]
async fn http_cycle_advances_today_and_persists() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let today = today_key();

    let before = fetch_goal(&client, &server, 0).await;
    let tile = find_tile(&before, &today);
    assert!(tile.clickable);
    let expected = if tile.state == "default" {
        before.default_score
    } else {
        (tile.score.expect("today has a score") + 1) % 11
    };

    let response = client
        .post(format!("{}/api/goals/0/days/{today}/cycle", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let update: TileUpdate = response.json().await.unwrap();

    assert_eq!(update.tile.score, Some(expected));
    assert_eq!(update.tile.state, "scored");
    let after = fetch_goal(&client, &server, 0).await;
    assert_eq!(find_tile(&after, &today).score, update.tile.score);
    assert_eq!(after.weeks[update.week_index].average_label, update.week_average_label);

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&server.data_path).unwrap()).unwrap();
    assert_eq!(
        saved["goals"]["Always on"][today.as_str()].as_u64(),
        update.tile.score.map(u64::from)
    );
}

#[tokio::test]
async fn http_rejects_future_and_invalid_requests() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let tomorrow = (Local::now().date_naive() + ChronoDuration::days(1))
        .format("%Y-%m-%d")
        .to_string();

    let future = client
        .post(format!("{}/api/goals/0/days/{tomorrow}/cycle", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(future.status(), StatusCode::CONFLICT);

    let bad_date = client
        .post(format!("{}/api/goals/0/days/2024-02-30/cycle", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_date.status(), StatusCode::BAD_REQUEST);

    let missing = client
        .get(format!("{}/api/goals/7", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let too_high = client
        .put(format!("{}/api/goals/0/days/{}", server.base_url, today_key()))
        .json(&serde_json::json!({ "score": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(too_high.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_set_and_reset_scores() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let today = today_key();

    let response = client
        .put(format!("{}/api/goals/0/days/{today}", server.base_url))
        .json(&serde_json::json!({ "score": 7 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let update: TileUpdate = response.json().await.unwrap();
    assert_eq!(update.tile.score, Some(7));

    let response = client
        .delete(format!("{}/api/goals/0/scores", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let after = fetch_goal(&client, &server, 0).await;
    let tile = find_tile(&after, &today);
    assert_eq!(tile.state, "default");
    assert_eq!(tile.score, Some(3));
}

#[tokio::test]
async fn http_index_renders_goal_cards() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let html = Client::new()
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(html.matches(r#"<article class="card""#).count(), 2);
    assert!(html.contains("Always on"));
    assert!(html.contains(r#"data-role="countdown""#));
}

#[tokio::test]
async fn http_broken_goal_document_shows_error() {
    let server = spawn_server(r#"[{ "title": "Bad", "endDate": "2025-12-31", "defaultScore": 12 }]"#).await;
    let client = Client::new();

    let html = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Goals could not be loaded"));
    assert!(html.contains("defaultScore"));

    let api = client
        .get(format!("{}/api/goals", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
}
