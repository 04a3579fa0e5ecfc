//! End-to-end tests: a real server on an OS-assigned port, driven by plain
//! `tokio-tungstenite` clients speaking JSON.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use partyroom::prelude::*;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(5);

/// A test client that numbers its requests and keeps pushed events that
/// arrive ahead of the reply it is waiting for.
struct Client {
    ws: ClientWs,
    next_ack: u64,
    backlog: VecDeque<Value>,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        Self {
            ws,
            next_ack: 1,
            backlog: VecDeque::new(),
        }
    }

    async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("client send");
    }

    async fn read_frame(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("frame before timeout")
                .expect("stream open")
                .expect("frame ok");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).expect("json frame");
            }
        }
    }

    /// Sends `event` and returns the `response` of the matching reply.
    async fn request(&mut self, event: Value) -> Value {
        let ack = self.next_ack;
        self.next_ack += 1;
        let frame = json!({ "ack": ack, "event": event });
        self.send_raw(&frame.to_string()).await;
        self.reply(ack).await
    }

    async fn reply(&mut self, ack: u64) -> Value {
        loop {
            let frame = self.read_frame().await;
            if frame["ack"] == json!(ack) {
                return frame["response"].clone();
            }
            self.backlog.push_back(frame);
        }
    }

    /// Returns the data of the next pushed event named `kind`, skipping
    /// any other events.
    async fn event(&mut self, kind: &str) -> Value {
        while let Some(frame) = self.backlog.pop_front() {
            if frame["type"] == kind {
                return frame["data"].clone();
            }
        }
        loop {
            let frame = self.read_frame().await;
            if frame["type"] == kind {
                return frame["data"].clone();
            }
        }
    }
}

async fn start_server(builder: PartyServerBuilder) -> String {
    let server = builder.bind("127.0.0.1:0").build().await.expect("bind");
    let addr = server.local_addr().expect("local addr").to_string();
    tokio::spawn(server.run());
    addr
}

fn create(nickname: &str, mode: &str, max: usize) -> Value {
    json!({
        "type": "room:create",
        "data": { "nickname": nickname, "gameMode": mode, "maxPlayers": max }
    })
}

fn join(code: &Value, nickname: &str) -> Value {
    json!({ "type": "room:join", "data": { "code": code, "nickname": nickname } })
}

/// Three clients seated in one room; the first is host.
async fn seated_room(addr: &str, mode: &str) -> (Vec<Client>, Value, Vec<Value>) {
    let mut host = Client::connect(addr).await;
    let created = host.request(create("ana", mode, 6)).await;
    let code = created["code"].clone();
    let room_id = created["room"]["id"].clone();
    let mut ids = vec![created["self"]["playerId"].clone()];

    let mut clients = vec![host];
    for nickname in ["bo", "cy"] {
        let mut client = Client::connect(addr).await;
        let joined = client.request(join(&code, nickname)).await;
        assert_eq!(joined["room"]["code"], code);
        ids.push(joined["self"]["playerId"].clone());
        clients.push(client);
    }
    (clients, room_id, ids)
}

fn start(room_id: &Value, mode: &str) -> Value {
    json!({ "type": "game:start", "data": { "roomId": room_id, "mode": mode } })
}

fn vote(room_id: &Value, voter: &Value, target: &Value) -> Value {
    json!({
        "type": "game:vote",
        "data": { "roomId": room_id, "voterId": voter, "targetId": target }
    })
}

// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_active_rooms() {
    let addr = start_server(PartyServer::builder()).await;
    let mut client = Client::connect(&addr).await;

    let health = client.request(json!({ "type": "health" })).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["activeRooms"], 0);

    client.request(create("ana", "custom-liar", 4)).await;
    let health = client.request(json!({ "type": "health" })).await;
    assert_eq!(health["activeRooms"], 1);
}

#[tokio::test]
async fn test_create_room_returns_code_and_self() {
    let addr = start_server(PartyServer::builder()).await;
    let mut client = Client::connect(&addr).await;

    let created = client.request(create("ana", "active-mafia", 5)).await;
    let code = created["code"].as_str().expect("code string");
    assert_eq!(code.len(), 6);
    assert_eq!(created["room"]["state"], "waiting");
    assert_eq!(created["room"]["host"], created["self"]["playerId"]);
    assert_eq!(created["self"]["rejoinToken"].as_str().map(str::len), Some(32));
}

#[tokio::test]
async fn test_join_unknown_code_returns_not_found() {
    let addr = start_server(PartyServer::builder()).await;
    let mut client = Client::connect(&addr).await;

    let response = client.request(join(&json!("ZZZZZZ"), "bo")).await;
    assert_eq!(response["code"], "not-found");
    assert!(response["error"].is_string());
}

#[tokio::test]
async fn test_malformed_request_with_ack_returns_bad_request() {
    let addr = start_server(PartyServer::builder()).await;
    let mut client = Client::connect(&addr).await;

    client
        .send_raw(r#"{"ack": 7, "event": {"type": "room:teleport"}}"#)
        .await;
    let response = client.reply(7).await;
    assert_eq!(response["code"], "bad-request");

    // The connection stays usable.
    let health = client.request(json!({ "type": "health" })).await;
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_join_broadcasts_state_to_room() {
    let addr = start_server(PartyServer::builder()).await;
    let (mut clients, _, _) = seated_room(&addr, "custom-liar").await;

    let host = &mut clients[0];
    loop {
        let view = host.event("room:state-update").await;
        if view["players"].as_array().map(Vec::len) == Some(3) {
            break;
        }
    }
}

#[tokio::test]
async fn test_start_liar_game_unicasts_words_and_masks_roles() {
    let addr = start_server(PartyServer::builder()).await;
    let (mut clients, room_id, _) = seated_room(&addr, "custom-liar").await;

    let ok = clients[0].request(start(&room_id, "classic")).await;
    assert_eq!(ok["success"], true);

    let mut without_word = 0;
    for client in &mut clients {
        let word = client.event("game:word").await;
        assert_eq!(word["mode"], "classic");
        if word["word"].is_null() {
            without_word += 1;
        }
        let phase = client.event("game:phase-change").await;
        assert_eq!(phase["phase"], "day");
    }
    assert_eq!(without_word, 1);

    let view = clients[1].event("room:state-update").await;
    for player in view["players"].as_array().expect("players") {
        assert_eq!(player["role"], "hidden");
    }
}

#[tokio::test]
async fn test_start_game_from_non_host_is_refused() {
    let addr = start_server(PartyServer::builder()).await;
    let (mut clients, room_id, _) = seated_room(&addr, "custom-liar").await;

    let response = clients[1].request(start(&room_id, "classic")).await;
    assert_eq!(response["code"], "invalid-state");
}

#[tokio::test]
async fn test_start_game_with_two_players_is_insufficient() {
    let addr = start_server(PartyServer::builder()).await;
    let mut host = Client::connect(&addr).await;
    let created = host.request(create("ana", "custom-liar", 4)).await;
    let mut guest = Client::connect(&addr).await;
    guest.request(join(&created["code"], "bo")).await;

    let response = host.request(start(&created["room"]["id"], "classic")).await;
    assert_eq!(response["code"], "insufficient-players");
}

#[tokio::test]
async fn test_mafia_start_sends_each_player_a_mission() {
    let addr = start_server(PartyServer::builder()).await;
    let (mut clients, room_id, ids) = seated_room(&addr, "active-mafia").await;

    clients[0].request(start(&room_id, "classic")).await;
    let mut mafia = 0;
    for (client, id) in clients.iter_mut().zip(&ids) {
        let assignment = client.event("game:mission-assign").await;
        assert_eq!(&assignment["playerId"], id);
        assert_eq!(assignment["mission"]["completed"], false);
        if assignment["role"] == "mafia" {
            mafia += 1;
        }
        let phase = client.event("game:phase-change").await;
        assert_eq!(phase["phase"], "night");
    }
    assert_eq!(mafia, 1);
}

#[tokio::test]
async fn test_unanimous_vote_on_liar_ends_in_citizen_win() {
    let logs = MemoryGameLogStore::default();
    let builder = PartyServer::builder().log_store(logs);
    let server = builder.bind("127.0.0.1:0").build().await.expect("bind");
    let addr = server.local_addr().expect("local addr").to_string();
    let store = server.log_store();
    tokio::spawn(server.run());

    let (mut clients, room_id, ids) = seated_room(&addr, "custom-liar").await;
    clients[0].request(start(&room_id, "classic")).await;

    let mut liar = None;
    for (client, id) in clients.iter_mut().zip(&ids) {
        if client.event("game:word").await["word"].is_null() {
            liar = Some(id.clone());
        }
    }
    let liar = liar.expect("one liar");

    for (client, id) in clients.iter_mut().zip(&ids) {
        let ok = client.request(vote(&room_id, id, &liar)).await;
        assert_eq!(ok["success"], true);
    }

    for client in &mut clients {
        let end = client.event("game:end").await;
        assert_eq!(end["result"], "citizen-win");
    }

    let saved = store.recent(10).await.expect("recent logs");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].result, GameResult::CitizenWin);
}

#[tokio::test]
async fn test_rejoin_with_token_replays_private_word() {
    let addr = start_server(PartyServer::builder().require_rejoin_token(true))
        .await;
    let mut host = Client::connect(&addr).await;
    let created = host.request(create("ana", "custom-liar", 4)).await;
    let code = created["code"].clone();
    let room_id = created["room"]["id"].clone();

    let mut bo = Client::connect(&addr).await;
    let joined = bo.request(join(&code, "bo")).await;
    let token = joined["self"]["rejoinToken"].clone();
    let mut cy = Client::connect(&addr).await;
    cy.request(join(&code, "cy")).await;

    host.request(start(&room_id, "fool")).await;
    let original = bo.event("game:word").await;

    let mut reloaded = Client::connect(&addr).await;
    let rejoin = |token: Value| {
        json!({
            "type": "room:rejoin",
            "data": { "code": code, "nickname": "bo", "token": token }
        })
    };

    let refused = reloaded.request(rejoin(json!(null))).await;
    assert_eq!(refused["code"], "bad-request");

    let rejoined = reloaded.request(rejoin(token)).await;
    assert_eq!(rejoined["self"]["playerId"], joined["self"]["playerId"]);
    let replayed = reloaded.event("game:word").await;
    assert_eq!(replayed, original);
}

#[tokio::test]
async fn test_disconnect_removes_player_and_migrates_host() {
    let addr = start_server(PartyServer::builder()).await;
    let (mut clients, _, ids) = seated_room(&addr, "custom-liar").await;

    let host = clients.remove(0);
    drop(host);

    let guest = &mut clients[0];
    loop {
        let view = guest.event("room:state-update").await;
        if view["players"].as_array().map(Vec::len) == Some(2) {
            assert_eq!(view["host"], ids[1]);
            break;
        }
    }
}

#[tokio::test]
async fn test_leave_last_player_destroys_room() {
    let addr = start_server(PartyServer::builder()).await;
    let mut client = Client::connect(&addr).await;
    let created = client.request(create("ana", "custom-liar", 4)).await;

    let left = client
        .request(json!({
            "type": "room:leave",
            "data": { "roomId": created["room"]["id"] }
        }))
        .await;
    assert_eq!(left["success"], true);

    let rejoin = client.request(join(&created["code"], "bo")).await;
    assert_eq!(rejoin["code"], "not-found");
}

#[tokio::test]
async fn test_join_with_lowercase_code_finds_room() {
    let addr = start_server(PartyServer::builder()).await;
    let mut host = Client::connect(&addr).await;
    let created = host.request(create("ana", "custom-liar", 4)).await;
    let lower = created["code"].as_str().expect("code").to_ascii_lowercase();

    let mut guest = Client::connect(&addr).await;
    let joined = guest.request(join(&json!(lower), "bo")).await;
    assert_eq!(joined["room"]["id"], created["room"]["id"]);
}

#[tokio::test]
async fn test_rejoin_after_mid_game_disconnect_keeps_seat() {
    let addr = start_server(PartyServer::builder()).await;
    let (mut clients, room_id, ids) = seated_room(&addr, "custom-liar").await;
    clients[0].request(start(&room_id, "classic")).await;
    let mut words = Vec::new();
    for client in &mut clients {
        words.push(client.event("game:word").await);
    }

    let bo = clients.remove(1);
    drop(bo);
    let code = loop {
        let view = clients[0].event("room:state-update").await;
        if view["players"][1]["connected"] == false {
            assert_eq!(view["players"].as_array().map(Vec::len), Some(3));
            break view["code"].clone();
        }
    };

    let mut reloaded = Client::connect(&addr).await;
    let rejoined = reloaded
        .request(json!({
            "type": "room:rejoin",
            "data": { "code": code, "nickname": "bo" }
        }))
        .await;
    assert_eq!(rejoined["self"]["playerId"], ids[1]);
    assert_eq!(rejoined["room"]["players"][1]["connected"], true);
    assert_eq!(reloaded.event("game:word").await, words[1]);
}
