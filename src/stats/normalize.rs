// src/stats/normalize.rs
//
// The only place that knows the upstream's response shapes. None of them are documented,
// so every field is resolved through an ordered list of JSON pointers; supporting a new
// variant means adding a pointer to the relevant chain.
use serde_json::Value;
use crate::models::status::{StatusRecord, UNKNOWN};

const PLAYER_LIST: &[&str] = &["/raw/players", "/players"];
const MAX_PLAYERS: &[&str] = &["/raw/maxplayers", "/maxplayers", "/maxPlayers"];
const PLAYER_DETAIL: &[&str] = &["/playersDetail"];
const NAME: &[&str] = &["/name"];
const MAP: &[&str] = &["/map", "/raw/map"];
const VERSION: &[&str] = &["/version", "/raw/version"];
const CONNECT: &[&str] = &["/connect"];
const QUERY_PORT: &[&str] = &["/queryPort"];
const PING: &[&str] = &["/ping"];
const PASSWORD: &[&str] = &["/password"];

const ONLINE_NAME: &str = "Server";
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_NAMES: usize = 100;

/// Latency results merged into the record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Latency {
    pub shell_ping_ms: Option<f64>,
    pub tcp_ping_ms: Option<f64>,
}

/// CPU and uptime figures read from the performance document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Performance {
    pub cpu_avg_load: Option<f64>,
    pub cpu_avg_hz: Option<f64>,
    pub uptime_seconds: Option<u64>,
}

/// Builds the online record from the primary object, the optional performance document and
/// the probe results.
pub fn normalize(raw: Value, perf: Option<&Value>, latency: Latency) -> StatusRecord {
    let player_list = resolve_player_list(&raw);
    let players = u32::try_from(player_list.len()).unwrap_or(u32::MAX);
    let max_players = resolve(&raw, MAX_PLAYERS).map_or(0, coerce_count);
    let player_names = sanitize_names(player_names(&raw, player_list));

    let connect = resolve_str(&raw, CONNECT);
    let (connect_host, connect_port) = match connect.as_deref().map(|c| c.split_once(':')) {
        Some(Some((host, port))) => (Some(host.to_string()), Some(port.to_string())),
        Some(None) => (connect.clone(), None),
        None => (None, None),
    };
    let port = resolve(&raw, QUERY_PORT)
        .filter(|v| truthy(v) && coerce_number(v) != Some(0.0))
        .and_then(display_string)
        .or(connect_port);

    let perf = perf.map(interpret_performance).unwrap_or_default();

    StatusRecord {
        online: true,
        reason: None,
        name: resolve_str(&raw, NAME).unwrap_or_else(|| ONLINE_NAME.to_string()),
        map: resolve_str(&raw, MAP).unwrap_or_else(|| UNKNOWN.to_string()),
        password: resolve(&raw, PASSWORD).is_some_and(truthy),
        players,
        max_players,
        player_names,
        capacity_pct: capacity_pct(players, max_players),
        version: resolve_str(&raw, VERSION),
        ping: resolve(&raw, PING).and_then(coerce_number),
        host: connect_host.filter(|h| !h.is_empty()),
        port: port.filter(|p| !p.is_empty()),
        connect,
        uptime_seconds: perf.uptime_seconds,
        cpu_avg_load: perf.cpu_avg_load,
        cpu_avg_hz: perf.cpu_avg_hz,
        shell_ping_ms: latency.shell_ping_ms,
        tcp_ping_ms: latency.tcp_ping_ms,
        raw: Some(raw),
    }
}

/// Port the upstream reports for the server, used when none is configured for probing.
pub fn upstream_port(raw: &Value) -> Option<u16> {
    resolve(raw, QUERY_PORT)
        .and_then(coerce_number)
        .filter(|p| *p > 0.0)
        .or_else(|| {
            resolve_str(raw, CONNECT)
                .and_then(|c| c.split_once(':').and_then(|(_, p)| p.trim().parse().ok()))
        })
        .and_then(|p| u16::try_from(p as u64).ok())
        .filter(|p| *p != 0)
}

pub fn capacity_pct(players: u32, max_players: u32) -> f64 {
    if max_players == 0 {
        return 0.0;
    }
    (f64::from(players) / f64::from(max_players) * 100.0).min(100.0)
}

/// Walks the performance document. Its layout is a best guess: `doc[0][0]` holds aggregate
/// `load`/`avgHz`, and the last object anywhere in the top two levels with an `uptime` key
/// carries the uptime in seconds.
pub fn interpret_performance(doc: &Value) -> Performance {
    let Some(segments) = doc.as_array() else {
        return Performance::default();
    };

    let mut perf = Performance::default();
    if let Some(aggregate) = segments
        .first()
        .and_then(Value::as_array)
        .and_then(|inner| inner.first())
        .filter(|v| v.is_object())
    {
        perf.cpu_avg_load = aggregate.get("load").and_then(coerce_number);
        perf.cpu_avg_hz = aggregate.get("avgHz").and_then(coerce_number);
    }

    let candidates = segments.iter().flat_map(|segment| match segment {
        Value::Array(inner) => inner.iter().collect::<Vec<_>>(),
        other => vec![other],
    });
    if let Some(uptime) = candidates.filter_map(|v| v.get("uptime")).last() {
        perf.uptime_seconds = coerce_number(uptime)
            .filter(|secs| *secs >= 0.0)
            .map(|secs| secs as u64);
    }
    perf
}

fn resolve<'a>(raw: &'a Value, chain: &[&str]) -> Option<&'a Value> {
    chain
        .iter()
        .filter_map(|pointer| raw.pointer(pointer))
        .find(|v| !v.is_null())
}

fn resolve_str(raw: &Value, chain: &[&str]) -> Option<String> {
    chain
        .iter()
        .filter_map(|pointer| raw.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn resolve_player_list(raw: &Value) -> &[Value] {
    PLAYER_LIST
        .iter()
        .filter_map(|pointer| raw.pointer(pointer))
        .find_map(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn player_names<'a>(raw: &'a Value, player_list: &'a [Value]) -> Vec<&'a str> {
    let detail = PLAYER_DETAIL
        .iter()
        .filter_map(|pointer| raw.pointer(pointer))
        .find_map(Value::as_array);

    match detail {
        Some(details) => details
            .iter()
            .filter_map(|p| p.get("name"))
            .filter_map(Value::as_str)
            .collect(),
        None => player_list
            .iter()
            .filter_map(|p| match p {
                Value::String(name) => Some(name.as_str()),
                other => other.get("name").and_then(Value::as_str),
            })
            .collect(),
    }
}

fn sanitize_names(names: Vec<&str>) -> Vec<String> {
    names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty() && n.chars().count() <= MAX_NAME_LEN)
        .take(MAX_NAMES)
        .map(str::to_string)
        .collect()
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn coerce_count(value: &Value) -> u32 {
    coerce_number(value)
        .filter(|n| *n >= 0.0)
        .map_or(0, |n| n.min(f64::from(u32::MAX)) as u32)
}

fn display_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn online(raw: Value) -> StatusRecord {
        normalize(raw, None, Latency::default())
    }

    #[test]
    fn documented_example() {
        let record = online(json!({
            "name": "Foo",
            "players": [{"name": "A"}, {"name": "B"}],
            "maxplayers": 10
        }));
        assert!(record.online);
        assert_eq!(record.reason, None);
        assert_eq!(record.name, "Foo");
        assert_eq!(record.players, 2);
        assert_eq!(record.max_players, 10);
        assert_eq!(record.capacity_pct, 20.0);
        assert_eq!(record.player_names, vec!["A", "B"]);
        assert!(record.raw.is_some());
    }

    #[test]
    fn zero_max_players_means_zero_capacity() {
        for players in [0, 1, 64] {
            assert_eq!(capacity_pct(players, 0), 0.0);
        }
        let record = online(json!({"players": ["a", "b", "c"]}));
        assert_eq!(record.max_players, 0);
        assert_eq!(record.capacity_pct, 0.0);
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(capacity_pct(12, 10), 100.0);
        assert_eq!(capacity_pct(5, 10), 50.0);
    }

    #[test]
    fn nested_player_list_wins() {
        let record = online(json!({
            "players": [{"name": "outer"}],
            "raw": {"players": [{"name": "x"}, {"name": "y"}, {"name": "z"}], "maxplayers": 64},
            "maxplayers": 32
        }));
        assert_eq!(record.players, 3);
        assert_eq!(record.max_players, 64);
        assert_eq!(record.player_names, vec!["x", "y", "z"]);
    }

    #[test]
    fn non_list_players_fall_through() {
        let record = online(json!({
            "raw": {"players": 7},
            "players": ["a", "b"],
            "maxPlayers": "16"
        }));
        assert_eq!(record.players, 2);
        assert_eq!(record.max_players, 16);

        let record = online(json!({"players": {"count": 3}}));
        assert_eq!(record.players, 0);
        assert!(record.player_names.is_empty());
    }

    #[test]
    fn null_max_players_falls_back_and_garbage_is_zero() {
        let record = online(json!({"raw": {"maxplayers": null}, "maxplayers": 40}));
        assert_eq!(record.max_players, 40);
        let record = online(json!({"maxplayers": "lots"}));
        assert_eq!(record.max_players, 0);
        let record = online(json!({"maxplayers": -5}));
        assert_eq!(record.max_players, 0);
    }

    #[test]
    fn players_detail_is_preferred_for_names() {
        let record = online(json!({
            "players": [{"name": "ignored"}, {"name": "also"}],
            "playersDetail": [{"name": " Alice "}, {"name": ""}, {"id": 4}, {"name": "Bob"}]
        }));
        assert_eq!(record.players, 2);
        assert_eq!(record.player_names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn adversarial_names_are_capped() {
        let mut players: Vec<Value> = (0..500).map(|i| json!({"name": format!("p{}", i)})).collect();
        players.push(json!({"name": "x".repeat(33)}));
        players.insert(0, json!({"name": "   "}));
        players.insert(0, json!({"name": "y".repeat(1000)}));
        players.insert(0, json!(42));
        let total = players.len();
        let record = online(json!({"players": players, "maxplayers": 128}));

        assert_eq!(total, 504);
        assert_eq!(record.players as usize, total);
        assert_eq!(record.player_names.len(), MAX_NAMES);
        assert_eq!(record.player_names[0], "p0");
        assert!(record
            .player_names
            .iter()
            .all(|n| !n.trim().is_empty() && n.chars().count() <= MAX_NAME_LEN));
        assert_eq!(record.capacity_pct, 100.0);
    }

    #[test]
    fn name_of_exactly_32_chars_is_kept() {
        let name = "n".repeat(32);
        let record = online(json!({"players": [name.clone()]}));
        assert_eq!(record.player_names, vec![name]);
    }

    #[test]
    fn metadata_passthrough() {
        let record = online(json!({
            "name": "",
            "raw": {"map": "Everon", "version": "1.2.0.76"},
            "connect": "74.63.203.34:2001",
            "queryPort": 17777,
            "ping": 42,
            "password": true
        }));
        assert_eq!(record.name, "Server");
        assert_eq!(record.map, "Everon");
        assert_eq!(record.version.as_deref(), Some("1.2.0.76"));
        assert_eq!(record.host.as_deref(), Some("74.63.203.34"));
        assert_eq!(record.port.as_deref(), Some("17777"));
        assert_eq!(record.connect.as_deref(), Some("74.63.203.34:2001"));
        assert_eq!(record.ping, Some(42.0));
        assert!(record.password);
        assert_eq!(upstream_port(record.raw.as_ref().unwrap()), Some(17777));
    }

    #[test]
    fn port_comes_from_connect_without_query_port() {
        let raw = json!({"connect": "example.org:2302"});
        assert_eq!(upstream_port(&raw), Some(2302));
        let record = online(raw);
        assert_eq!(record.host.as_deref(), Some("example.org"));
        assert_eq!(record.port.as_deref(), Some("2302"));
        assert_eq!(record.map, "Unknown");
        assert!(!record.password);
    }

    #[test]
    fn zero_query_port_falls_back_to_connect() {
        for query_port in [json!(0), json!("0"), json!(""), json!(false)] {
            let raw = json!({"connect": "10.0.0.5:2001", "queryPort": query_port});
            assert_eq!(upstream_port(&raw), Some(2001));
            let record = online(raw);
            assert_eq!(record.port.as_deref(), Some("2001"), "queryPort {}", query_port);
        }
    }

    #[test]
    fn latency_is_merged() {
        let latency = Latency { shell_ping_ms: Some(3.5), tcp_ping_ms: None };
        let record = normalize(json!({}), None, latency);
        assert_eq!(record.shell_ping_ms, Some(3.5));
        assert_eq!(record.tcp_ping_ms, None);
    }

    #[test]
    fn performance_document_populates_cpu_and_last_uptime() {
        let doc = json!([
            [{"load": 37.5, "avgHz": "3400"}, {"core": 1}],
            [{"uptime": 10}],
            {"uptime": 20},
            [{"mem": 1}, {"uptime": 86461, "updhms": "1d 0h 1m"}],
            "trailer"
        ]);
        let record = normalize(json!({"name": "Foo"}), Some(&doc), Latency::default());
        assert!(record.online);
        assert_eq!(record.cpu_avg_load, Some(37.5));
        assert_eq!(record.cpu_avg_hz, Some(3400.0));
        assert_eq!(record.uptime_seconds, Some(86461));
    }

    #[test]
    fn unexpected_performance_shapes_leave_fields_unset() {
        for doc in [
            json!({"uptime": 5}),
            json!("nope"),
            json!([]),
            json!([[1, 2], ["x"], {"uptime": "soon"}]),
            json!([[{"load": null}]]),
            json!([[{"uptime": -3}]]),
        ] {
            let perf = interpret_performance(&doc);
            assert_eq!(perf, Performance::default(), "doc {}", doc);
        }
    }
}
