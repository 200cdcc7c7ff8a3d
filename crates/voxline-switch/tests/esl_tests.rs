// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event Socket client against an in-process fake switch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use voxline_core::types::OriginateRequest;
use voxline_core::{HealthStatus, PluginAdapter, SwitchControl, VoxlineError};
use voxline_switch::{EslClient, EslConfig, ExtensionStatus, check_availability};

/// Replies to a received command line; `None` leaves the command unanswered.
type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

struct FakeSwitch {
    port: u16,
    commands: Arc<Mutex<Vec<String>>>,
}

fn api_response(body: &str) -> String {
    format!(
        "Content-Type: api/response\nContent-Length: {}\n\n{}",
        body.len(),
        body
    )
}

fn command_reply(text: &str) -> String {
    format!("Content-Type: command/reply\nReply-Text: {text}\n\n")
}

async fn fake_switch(password: &'static str, responder: Responder) -> FakeSwitch {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let log = commands.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve(stream, password, responder.clone(), log.clone()));
        }
    });
    FakeSwitch { port, commands }
}

async fn serve(
    stream: TcpStream,
    password: &'static str,
    responder: Responder,
    log: Arc<Mutex<Vec<String>>>,
) {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    if write
        .write_all(b"Content-Type: auth/request\n\n")
        .await
        .is_err()
    {
        return;
    }
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let command = line.trim().to_string();
        if command.is_empty() {
            continue;
        }
        log.lock().unwrap().push(command.clone());
        let reply = if let Some(pw) = command.strip_prefix("auth ") {
            Some(if pw == password {
                command_reply("+OK accepted")
            } else {
                command_reply("-ERR invalid")
            })
        } else if command == "exit" {
            return;
        } else {
            responder(&command)
        };
        if let Some(reply) = reply
            && write.write_all(reply.as_bytes()).await.is_err()
        {
            return;
        }
    }
}

fn client(port: u16, password: &str) -> EslClient {
    EslClient::new(EslConfig {
        host: "127.0.0.1".into(),
        port,
        password: password.into(),
        command_timeout: Duration::from_millis(500),
        gateway: "default".into(),
        registration_profile: "internal".into(),
    })
}

fn pbx_responder() -> Responder {
    Arc::new(|command: &str| {
        let rest = command.strip_prefix("api ").or(command.strip_prefix("bgapi "))?;
        let body = if rest.starts_with("uuid_transfer good") {
            "+OK\n".to_string()
        } else if rest.starts_with("uuid_transfer") {
            "-ERR No such channel!\n".to_string()
        } else if rest.starts_with("uuid_broadcast") {
            "+OK Message sent\n".to_string()
        } else if rest == "sofia status profile internal reg 1001" {
            "Registrations:\nUser: 1001@acme\nStatus: Registered(UDP)(unknown) EXP(2026-01-01)\n"
                .to_uppercase()
        } else if rest == "sofia status profile internal reg 1002" {
            "Registrations:\nUSER: 1002@acme\nSTATUS: REGISTERED\n".to_string()
        } else if rest.starts_with("sofia status") {
            "Total items returned: 0\n".to_string()
        } else if rest == "show channels" {
            "uuid,direction,name,cid_num\nab12,inbound,sofia/internal/1002@acme,1002\n\n1 total.\n"
                .to_string()
        } else if rest.starts_with("originate") {
            return Some(
                "Content-Type: command/reply\nReply-Text: +OK Job-UUID: job-123\nJob-UUID: job-123\n\n"
                    .to_string(),
            );
        } else if rest == "status" {
            "UP 0 years, 0 days\n".to_string()
        } else {
            "-ERR unknown command\n".to_string()
        };
        Some(api_response(&body))
    })
}

#[tokio::test]
async fn transfer_ack_and_refusal() {
    let fake = fake_switch("ClueCon", pbx_responder()).await;
    let esl = client(fake.port, "ClueCon");

    assert!(esl.uuid_transfer("good-call", "1001", "default").await.unwrap().accepted);

    let refused = esl.uuid_transfer("gone-call", "1001", "default").await.unwrap();
    assert!(!refused.accepted);
    assert_eq!(refused.reply, "-ERR No such channel!");

    assert!(esl.uuid_broadcast("good-call", "ivr/hold.wav").await.unwrap().accepted);

    let commands = fake.commands.lock().unwrap().clone();
    assert_eq!(commands[0], "auth ClueCon");
    assert_eq!(commands[1], "api uuid_transfer good-call 1001 XML default");
    // One connection serves every command.
    assert_eq!(commands.iter().filter(|c| c.starts_with("auth")).count(), 1);
}

#[tokio::test]
async fn wrong_password_is_a_switch_error() {
    let fake = fake_switch("ClueCon", pbx_responder()).await;
    let esl = client(fake.port, "wrong");
    let err = esl.api("status").await.unwrap_err();
    assert!(matches!(err, VoxlineError::SwitchCommandFailed { ref command, .. } if command == "auth"));
}

#[tokio::test]
async fn availability_probe() {
    let fake = fake_switch("ClueCon", pbx_responder()).await;
    let esl = client(fake.port, "ClueCon");

    let free = check_availability(&esl, "1001").await;
    assert_eq!(free.status, ExtensionStatus::Available);
    assert!(free.available);

    let busy = check_availability(&esl, "1002").await;
    assert_eq!(busy.status, ExtensionStatus::InCall);

    let offline = check_availability(&esl, "1009").await;
    assert_eq!(offline.status, ExtensionStatus::Offline);
    assert!(!offline.available);
}

#[tokio::test]
async fn originate_uses_bgapi_and_reads_job_uuid() {
    let fake = fake_switch("ClueCon", pbx_responder()).await;
    let esl = client(fake.port, "ClueCon");
    let request = OriginateRequest {
        domain_uuid: "d-1".into(),
        domain_name: "acme".into(),
        extension: "1001".into(),
        client_number: "5518997752222".into(),
        caller_id_name: "Retorno".into(),
        call_timeout_secs: 30,
        ticket_id: None,
        callback_reason: None,
    };
    let outcome = esl.originate(&request).await.unwrap();
    assert!(outcome.accepted);
    assert_eq!(outcome.call_uuid.as_deref(), Some("job-123"));
    let commands = fake.commands.lock().unwrap().clone();
    assert!(commands[1].starts_with("bgapi originate {"));
}

#[tokio::test]
async fn unanswered_command_times_out_then_recovers() {
    let responder: Responder = Arc::new(|command: &str| {
        if command.contains("hang") {
            None
        } else {
            Some(api_response("+OK\n"))
        }
    });
    let fake = fake_switch("ClueCon", responder).await;
    let esl = client(fake.port, "ClueCon");

    let err = esl.api("hang").await.unwrap_err();
    assert!(matches!(err, VoxlineError::Timeout { .. }));

    // The stale connection was dropped; the next command re-authenticates.
    assert_eq!(esl.api("status").await.unwrap(), "+OK\n");
    let auths = fake
        .commands
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.starts_with("auth"))
        .count();
    assert_eq!(auths, 2);
}

#[tokio::test]
async fn unreachable_switch_reports_unhealthy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let esl = client(port, "ClueCon");
    assert!(matches!(
        esl.health_check().await.unwrap(),
        HealthStatus::Unhealthy(_)
    ));
    assert!(matches!(
        esl.is_registered("1001").await,
        Err(VoxlineError::SwitchCommandFailed { .. })
    ));
}

#[tokio::test]
async fn shutdown_sends_exit() {
    let fake = fake_switch("ClueCon", pbx_responder()).await;
    let esl = client(fake.port, "ClueCon");
    esl.api("status").await.unwrap();
    esl.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fake.commands.lock().unwrap().last().map(String::as_str), Some("exit"));
}
